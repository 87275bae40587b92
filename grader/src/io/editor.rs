//! Editor launcher for opening a student's code.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use tracing::info;

/// Abstraction over "open this directory for review".
pub trait EditorLauncher {
    /// Start the editor on `dir` and return without waiting for it.
    fn open(&self, dir: &Path) -> Result<()>;
}

/// Launcher that spawns the configured editor command, detached.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    command: Vec<String>,
}

impl CommandLauncher {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl EditorLauncher for CommandLauncher {
    fn open(&self, dir: &Path) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("editor command is empty"))?;
        info!(program, dir = %dir.display(), "opening editor");
        Command::new(program)
            .args(args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn editor {program}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_configured_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let launcher = CommandLauncher::new(vec!["true".to_string()]);
        launcher.open(temp.path()).expect("open");
    }

    #[test]
    fn missing_editor_reports_spawn_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let launcher = CommandLauncher::new(vec!["grader-missing-editor".to_string()]);
        let err = launcher.open(temp.path()).unwrap_err();
        assert!(err.to_string().contains("spawn editor grader-missing-editor"));
    }
}
