//! Roster traversal for `grader shell start|next`.
//!
//! The grader only computes where to go. The calling shell applies the printed
//! directives, so the grader's own process state never changes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::core::naming::NamingScheme;
use crate::core::session::{next_student, resolve_current_student};
use crate::error::GradingError;
use crate::io::manifest::find_manifest;

/// Where the shell should go next and which environment to activate there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTarget {
    pub student: String,
    pub directory: PathBuf,
    pub environment: String,
}

pub struct SessionNavigator<'a> {
    code_dir: &'a Path,
    naming: &'a NamingScheme,
}

impl<'a> SessionNavigator<'a> {
    pub fn new(code_dir: &'a Path, naming: &'a NamingScheme) -> Self {
        Self { code_dir, naming }
    }

    /// Target for the first student of `roster`.
    pub fn start(&self, roster: &[String]) -> Result<ShellTarget> {
        let first = roster.first().ok_or_else(|| GradingError::EmptyRoster {
            code_dir: self.code_dir.to_path_buf(),
        })?;
        self.target(first)
    }

    /// Target for the student after the one whose directory contains `cwd`.
    pub fn next(&self, roster: &[String], cwd: &Path) -> Result<ShellTarget> {
        let code_dir = canonical(self.code_dir);
        let cwd = canonical(cwd);
        let current = resolve_current_student(&cwd, &code_dir, roster)?;
        let next = next_student(roster, current)?;
        debug!(current, next, "advancing session");
        self.target(next)
    }

    fn target(&self, student: &str) -> Result<ShellTarget> {
        let student_dir = self.naming.student_dir(self.code_dir, student);
        let directory = match find_manifest(&student_dir, student, self.naming.manifest_name())? {
            Some(manifest) => manifest
                .parent()
                .map_or_else(|| student_dir.clone(), Path::to_path_buf),
            None => student_dir,
        };
        Ok(ShellTarget {
            student: student.to_string(),
            directory,
            environment: self.naming.environment_name(student),
        })
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Shell directives moving into `target` and activating its environment.
pub fn render_directives(target: &ShellTarget, activation: &str) -> String {
    let dir = target.directory.to_string_lossy();
    format!("cd {};\n{activation};\n", shell_words::quote(&dir))
}

/// Shell function that evaluates `grader shell` output in the calling shell.
pub const SHELL_HOOK: &str = r#"# Add to your shell profile: eval "$(grader shell hook)"
grade() {
    local directives
    if [ "$#" -eq 0 ]; then set -- next; fi
    directives="$(command grader shell "$@")" || return
    eval "$directives"
}
"#;
