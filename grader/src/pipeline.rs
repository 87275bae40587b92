//! Single-student grading tasks for `grader task`.
//!
//! Tasks are independent: the caller picks which one to run and in what order.
//! The usual workflow is download, unpack, (re)create the environment, then
//! open the code for review. Every task works inside the assignment's own
//! directory below the grading home, so several assignments of one student
//! never share submissions or code.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use canvas::{Assignment, GradingPlatform, Student};
use tracing::{info, instrument, warn};

use crate::core::naming::{assignment_dir_name, student_token, submission_file_name};
use crate::core::types::ItemOutcome;
use crate::environments::EnvironmentLifecycle;
use crate::error::GradingError;
use crate::io::conda::EnvironmentManager;
use crate::io::config::GradingConfig;
use crate::io::editor::EditorLauncher;
use crate::io::init::GradingPaths;
use crate::unpack::{unpack_student, unpack_submission};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Download,
    Unpack,
    CreateEnvironment,
    OpenForReview,
}

impl TaskKind {
    /// Canonical workflow order.
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Download,
        TaskKind::Unpack,
        TaskKind::CreateEnvironment,
        TaskKind::OpenForReview,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TaskKind::Download => "Download submission",
            TaskKind::Unpack => "Extract submission into grading folder",
            TaskKind::CreateEnvironment => "(Re)create the student's environment",
            TaskKind::OpenForReview => "Open the code in the editor",
        }
    }

    pub fn running_message(self) -> &'static str {
        match self {
            TaskKind::Download => "Downloading submission...",
            TaskKind::Unpack => "Extracting submission...",
            TaskKind::CreateEnvironment => "Creating environment and installing project...",
            TaskKind::OpenForReview => "Opening editor...",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            TaskKind::Download => "Submission downloaded",
            TaskKind::Unpack => "Submission extracted",
            TaskKind::CreateEnvironment => "Environment ready",
            TaskKind::OpenForReview => "Editor started",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            TaskKind::Download => "Download failed",
            TaskKind::Unpack => "Extraction failed",
            TaskKind::CreateEnvironment => "Environment setup failed",
            TaskKind::OpenForReview => "Could not start editor",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The (assignment, student) pair a task is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTarget {
    pub assignment: Assignment,
    pub student: Student,
}

impl TaskTarget {
    pub fn new(assignment: Assignment, student: Student) -> Self {
        Self {
            assignment,
            student,
        }
    }

    /// Local student identifier derived from the platform display name.
    pub fn student_token(&self) -> Result<String> {
        let token = student_token(&self.student.name);
        if token.is_empty() {
            return Err(anyhow!(
                "student {} ({:?}) has no usable local identifier",
                self.student.id,
                self.student.name
            ));
        }
        Ok(token)
    }

    /// Name of the assignment's directory below the grading home.
    pub fn assignment_dir(&self) -> String {
        assignment_dir_name(&self.assignment.name, self.assignment.id)
    }
}

/// Result of one task invocation, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub kind: TaskKind,
    pub success: bool,
    pub message: String,
}

pub struct TaskPipeline<'a, M: EnvironmentManager + ?Sized> {
    paths: &'a GradingPaths,
    config: &'a GradingConfig,
    manager: &'a M,
    platform: &'a dyn GradingPlatform,
    launcher: &'a dyn EditorLauncher,
}

impl<'a, M: EnvironmentManager + ?Sized> TaskPipeline<'a, M> {
    pub fn new(
        paths: &'a GradingPaths,
        config: &'a GradingConfig,
        manager: &'a M,
        platform: &'a dyn GradingPlatform,
        launcher: &'a dyn EditorLauncher,
    ) -> Self {
        Self {
            paths,
            config,
            manager,
            platform,
            launcher,
        }
    }

    /// Run `kind` for `target` and report the outcome. Never returns an error:
    /// failures become an unsuccessful report carrying the full error chain.
    #[instrument(skip_all, fields(task = ?kind, student = %target.student.name))]
    pub async fn execute(&self, kind: TaskKind, target: &TaskTarget) -> TaskReport {
        info!("{}", kind.running_message());
        let result = match kind {
            TaskKind::Download => self.download(target).await,
            TaskKind::Unpack => self.unpack(target),
            TaskKind::CreateEnvironment => self.recreate_environment(target),
            TaskKind::OpenForReview => self.open_for_review(target),
        };
        match result {
            Ok(detail) => TaskReport {
                kind,
                success: true,
                message: format!("{}: {detail}", kind.success_message()),
            },
            Err(err) => {
                warn!(error = %format!("{err:#}"), "task failed");
                TaskReport {
                    kind,
                    success: false,
                    message: format!("{}: {err:#}", kind.failure_message()),
                }
            }
        }
    }

    fn workspace(&self, target: &TaskTarget) -> GradingPaths {
        self.paths.for_assignment(self.config, &target.assignment_dir())
    }

    fn archive_path(paths: &GradingPaths, target: &TaskTarget, student: &str) -> PathBuf {
        paths
            .submissions_dir
            .join(submission_file_name(student, &target.assignment.name))
    }

    async fn download(&self, target: &TaskTarget) -> Result<String> {
        let student = target.student_token()?;
        let dest = Self::archive_path(&self.workspace(target), target, &student);
        let saved = self
            .platform
            .download_submission(&target.assignment, &target.student, &dest)
            .await
            .with_context(|| {
                format!(
                    "download {} for {}",
                    target.assignment.name, target.student.name
                )
            })?;
        Ok(format!("saved {}", saved.display()))
    }

    fn unpack(&self, target: &TaskTarget) -> Result<String> {
        let student = target.student_token()?;
        let paths = self.workspace(target);
        let archive = Self::archive_path(&paths, target, &student);
        // Archives placed by hand under another name are still picked up.
        let outcome = if archive.is_file() {
            unpack_submission(&paths, &archive, &student)?
        } else {
            unpack_student(&paths, &student)?
        };
        Ok(outcome.message().to_string())
    }

    fn recreate_environment(&self, target: &TaskTarget) -> Result<String> {
        let student = target.student_token()?;
        let paths = self.workspace(target);
        let lifecycle =
            EnvironmentLifecycle::new(self.manager, &self.config.environment, &paths.code_dir);
        let created = lifecycle.create(&student, true)?;
        let installed = lifecycle.install(&student)?;
        if let ItemOutcome::Skipped(reason) = installed {
            return Err(anyhow!("install skipped: {reason}"));
        }
        Ok(format!("{}; {}", created.message(), installed.message()))
    }

    fn open_for_review(&self, target: &TaskTarget) -> Result<String> {
        let student = target.student_token()?;
        let dir = self.workspace(target).student_dir(&student);
        if !dir.is_dir() {
            return Err(GradingError::NotFound {
                what: "student directory",
                path: dir,
            }
            .into());
        }
        self.launcher.open(&dir)?;
        Ok(format!("opened {}", dir.display()))
    }
}
