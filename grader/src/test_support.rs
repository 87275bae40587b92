//! Test-only helpers: scratch grading homes, zipped submissions and scripted
//! collaborators that record what the grader asked of them.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use canvas::{Assignment, CourseQuery, GradingPlatform, PlatformError, Student, SubmissionInfo};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use crate::error::GradingError;
use crate::io::conda::{EnvironmentManager, EnvironmentRecord};
use crate::io::config::{GradingConfig, write_config};
use crate::io::editor::EditorLauncher;
use crate::io::init::GradingPaths;
use crate::io::process::ToolOutput;
use crate::orchestrator::Orchestrator;

/// Write a zip archive at `path` containing `(name, contents)` entries.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create archive dir");
    }
    let file = File::create(path).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(contents.as_bytes()).expect("write zip entry");
    }
    zip.finish().expect("finish zip");
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a plain-text subscriber on this thread and return what it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = logs.0.lock().expect("log buffer").clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// A throwaway grading home with a default `grading.toml`.
pub struct TestHome {
    // Held for its Drop: removes the directory tree.
    _temp: TempDir,
    pub paths: GradingPaths,
    pub config: GradingConfig,
}

impl TestHome {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        // Canonical root so paths compare equal to canonicalized working directories.
        let root = fs::canonicalize(temp.path())?;
        let config = GradingConfig::default();
        let paths = GradingPaths::new(&root, &config);
        write_config(&paths.config_path, &config)?;
        fs::create_dir_all(&paths.code_dir)?;
        fs::create_dir_all(&paths.submissions_dir)?;
        Ok(Self {
            _temp: temp,
            paths,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.paths.home
    }

    /// Create `code/<student>/` directly, as if already unpacked.
    pub fn add_student(&self, student: &str) -> PathBuf {
        let dir = self.paths.student_dir(student);
        fs::create_dir_all(&dir).expect("create student dir");
        dir
    }

    /// Create a manifest at `code/<student>/<relative>` and return its path.
    pub fn add_manifest(&self, student: &str, relative: &str) -> PathBuf {
        let path = self.paths.student_dir(student).join(relative);
        fs::create_dir_all(path.parent().expect("manifest parent")).expect("create dirs");
        fs::write(&path, "[tool.poetry]\nname = \"pythondaq\"\n").expect("write manifest");
        path
    }

    /// Write `submissions/<file_name>` with the given entries.
    pub fn add_submission(&self, file_name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.paths.submissions_dir.join(file_name);
        write_zip(&path, entries);
        path
    }

    pub fn orchestrator<M: EnvironmentManager>(&self, manager: M) -> Orchestrator<M> {
        Orchestrator::new(self.paths.clone(), self.config.clone(), manager)
    }
}

/// One call observed by [`ScriptedManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCall {
    List,
    Create { name: String, runtime_version: String },
    Remove(String),
    RunIn {
        name: String,
        command: Vec<String>,
        workdir: PathBuf,
    },
}

/// In-memory environment manager with injectable failures.
#[derive(Debug, Default)]
pub struct ScriptedManager {
    environments: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<ManagerCall>>,
    fail_create: BTreeSet<String>,
    fail_remove: BTreeSet<String>,
    /// `(environment, program)` pairs whose `run_in` exits non-zero.
    fail_run: BTreeSet<(String, String)>,
}

impl ScriptedManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environments(self, names: &[&str]) -> Self {
        self.environments
            .borrow_mut()
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_string());
        self
    }

    pub fn failing_remove(mut self, name: &str) -> Self {
        self.fail_remove.insert(name.to_string());
        self
    }

    pub fn failing_run(mut self, name: &str, program: &str) -> Self {
        self.fail_run.insert((name.to_string(), program.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<ManagerCall> {
        self.calls.borrow().clone()
    }

    pub fn environments(&self) -> Vec<String> {
        self.environments.borrow().iter().cloned().collect()
    }

    /// Names passed to `create`, in call order.
    pub fn created(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ManagerCall::Create { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ManagerCall::Remove(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(environment, program)` of every `run_in`, in call order.
    pub fn runs(&self) -> Vec<(String, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ManagerCall::RunIn { name, command, .. } => {
                    Some((name.clone(), command.first().cloned().unwrap_or_default()))
                }
                _ => None,
            })
            .collect()
    }

    fn tool_error(tool: &str, output: &str) -> anyhow::Error {
        GradingError::ExternalTool {
            tool: tool.to_string(),
            exit_code: Some(1),
            output: output.to_string(),
        }
        .into()
    }
}

impl EnvironmentManager for ScriptedManager {
    fn list(&self) -> Result<Vec<EnvironmentRecord>> {
        self.calls.borrow_mut().push(ManagerCall::List);
        Ok(self
            .environments
            .borrow()
            .iter()
            .map(|name| EnvironmentRecord {
                name: name.clone(),
                parent_dir_name: "envs".to_string(),
            })
            .collect())
    }

    fn create(&self, name: &str, runtime_version: &str) -> Result<()> {
        self.calls.borrow_mut().push(ManagerCall::Create {
            name: name.to_string(),
            runtime_version: runtime_version.to_string(),
        });
        if self.fail_create.contains(name) {
            return Err(Self::tool_error(
                "conda create",
                &format!("CondaError: cannot create {name}: disk quota exceeded"),
            ));
        }
        self.environments.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(ManagerCall::Remove(name.to_string()));
        if self.fail_remove.contains(name) {
            return Err(Self::tool_error(
                "conda env remove",
                &format!("CondaEnvironmentError: {name} is in use"),
            ));
        }
        self.environments.borrow_mut().remove(name);
        Ok(())
    }

    fn run_in(&self, name: &str, command: &[String], workdir: &Path) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(ManagerCall::RunIn {
            name: name.to_string(),
            command: command.to_vec(),
            workdir: workdir.to_path_buf(),
        });
        if !self.environments.borrow().contains(name) {
            return Err(anyhow!("environment {name} does not exist"));
        }
        let program = command.first().cloned().unwrap_or_default();
        if self.fail_run.contains(&(name.to_string(), program.clone())) {
            return Ok(ToolOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: format!("{program}: dependency resolution failed for {name}"),
                timed_out: false,
            });
        }
        Ok(ToolOutput {
            exit_code: Some(0),
            stdout: format!("{program} ok"),
            stderr: String::new(),
            timed_out: false,
        })
    }

    fn activation(&self, name: &str) -> String {
        format!("conda activate {name}")
    }
}

/// Editor launcher that remembers which directories it was asked to open.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    opened: RefCell<Vec<PathBuf>>,
}

impl RecordingLauncher {
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }
}

impl EditorLauncher for RecordingLauncher {
    fn open(&self, dir: &Path) -> Result<()> {
        self.opened.borrow_mut().push(dir.to_path_buf());
        Ok(())
    }
}

/// Platform serving fixed records and writing a small zip on download.
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    pub assignments: Vec<Assignment>,
    pub students: Vec<Student>,
    /// Entries of the archive written by `download_submission`.
    pub archive_entries: Vec<(String, String)>,
    /// When set, downloads fail with this status code.
    pub download_status: Option<u16>,
    /// Submission records by student id; other students have none.
    pub submissions: Vec<(u64, SubmissionInfo)>,
}

impl FakePlatform {
    pub fn with_submission(entries: &[(&str, &str)]) -> Self {
        Self {
            archive_entries: entries
                .iter()
                .map(|(name, contents)| (name.to_string(), contents.to_string()))
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl GradingPlatform for FakePlatform {
    async fn list_assignments(&self, _query: &CourseQuery) -> Result<Vec<Assignment>, PlatformError> {
        Ok(self.assignments.clone())
    }

    async fn list_students(&self, _query: &CourseQuery) -> Result<Vec<Student>, PlatformError> {
        Ok(self.students.clone())
    }

    async fn download_submission(
        &self,
        assignment: &Assignment,
        student: &Student,
        dest: &Path,
    ) -> Result<PathBuf, PlatformError> {
        if let Some(status) = self.download_status {
            return Err(PlatformError::Status {
                url: format!(
                    "https://canvas.test/api/v1/courses/{}/assignments/{}/submissions/{}",
                    assignment.course_id, assignment.id, student.id
                ),
                status,
                body: "{\"errors\":[{\"message\":\"user not authorized\"}]}".to_string(),
            });
        }
        let entries: Vec<(&str, &str)> = self
            .archive_entries
            .iter()
            .map(|(name, contents)| (name.as_str(), contents.as_str()))
            .collect();
        write_zip(dest, &entries);
        Ok(dest.to_path_buf())
    }

    async fn get_submission(
        &self,
        _assignment: &Assignment,
        student: &Student,
    ) -> Result<SubmissionInfo, PlatformError> {
        self.submissions
            .iter()
            .find(|(id, _)| *id == student.id)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| PlatformError::NotFound {
                what: format!("submission of {}", student.name),
            })
    }
}

/// Assignment fixture.
pub fn assignment(id: u64, name: &str) -> Assignment {
    Assignment {
        id,
        name: name.to_string(),
        course_id: 42,
    }
}

/// Platform student fixture.
pub fn student(id: u64, name: &str) -> Student {
    Student {
        id,
        name: name.to_string(),
    }
}
