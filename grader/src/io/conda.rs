//! Environment-manager adapter.
//!
//! The [`EnvironmentManager`] trait decouples environment lifecycle logic from
//! the actual manager (currently `conda`). Tests use a scripted in-memory
//! manager that records calls without spawning processes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::config::EnvironmentConfig;
use super::process::{ToolOutput, run_tool};

/// One environment as reported by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
    pub name: String,
    /// Name of the directory that contains the environment (`envs` for named environments).
    pub parent_dir_name: String,
}

/// Abstraction over isolated-environment managers.
///
/// Every method is a blocking call against the manager's global state; callers
/// never run two of them concurrently.
pub trait EnvironmentManager {
    /// All environments currently known to the manager.
    fn list(&self) -> Result<Vec<EnvironmentRecord>>;

    /// Create (or replace) environment `name` pinned to `runtime_version`.
    fn create(&self, name: &str, runtime_version: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;

    /// Run `command` inside environment `name` with `workdir` as working directory.
    ///
    /// A non-zero exit is returned as output, not as an error.
    fn run_in(&self, name: &str, command: &[String], workdir: &Path) -> Result<ToolOutput>;

    /// Shell directive that activates environment `name` in the calling shell.
    fn activation(&self, name: &str) -> String;
}

/// Names of the named environments among `records`.
pub fn named_environments(records: &[EnvironmentRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|record| record.parent_dir_name == "envs")
        .map(|record| record.name.clone())
        .collect()
}

/// Manager that shells out to `conda`.
#[derive(Debug, Clone)]
pub struct CondaManager {
    executable: String,
    timeout: Duration,
    output_limit_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct EnvList {
    envs: Vec<PathBuf>,
}

impl CondaManager {
    pub fn new(executable: impl Into<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            output_limit_bytes,
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(
            config.manager.clone(),
            config.timeout(),
            config.output_limit_bytes,
        )
    }

    fn command(&self) -> Command {
        Command::new(&self.executable)
    }

    fn run_checked(&self, cmd: Command, label: &str) -> Result<ToolOutput> {
        let output = run_tool(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {label}"))?;
        Ok(output.check(label)?)
    }
}

impl EnvironmentManager for CondaManager {
    #[instrument(skip_all)]
    fn list(&self) -> Result<Vec<EnvironmentRecord>> {
        let mut cmd = self.command();
        cmd.args(["env", "list", "--json"]);
        let label = format!("{} env list", self.executable);
        let output = self.run_checked(cmd, &label)?;
        let records = parse_env_list(&output.stdout)?;
        debug!(count = records.len(), "listed environments");
        Ok(records)
    }

    #[instrument(skip_all, fields(name = %name))]
    fn create(&self, name: &str, runtime_version: &str) -> Result<()> {
        info!(name, runtime_version, "creating environment");
        let mut cmd = self.command();
        cmd.args(["create", "-n", name])
            .arg(format!("python={runtime_version}"))
            .arg("--yes");
        let label = format!("{} create", self.executable);
        self.run_checked(cmd, &label)?;
        Ok(())
    }

    #[instrument(skip_all, fields(name = %name))]
    fn remove(&self, name: &str) -> Result<()> {
        info!(name, "removing environment");
        let mut cmd = self.command();
        cmd.args(["env", "remove", "-n", name, "--yes"]);
        let label = format!("{} env remove", self.executable);
        self.run_checked(cmd, &label)?;
        Ok(())
    }

    #[instrument(skip_all, fields(name = %name, workdir = %workdir.display()))]
    fn run_in(&self, name: &str, command: &[String], workdir: &Path) -> Result<ToolOutput> {
        if command.is_empty() {
            return Err(anyhow!("empty command for environment {name}"));
        }
        debug!(?command, "running in environment");
        let mut cmd = self.command();
        cmd.args(["run", "-n", name])
            .args(command)
            .current_dir(workdir);
        run_tool(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {} in {name}", command.join(" ")))
    }

    fn activation(&self, name: &str) -> String {
        format!("{} activate {}", self.executable, name)
    }
}

/// Parse `conda env list --json` output into records.
pub fn parse_env_list(json: &str) -> Result<Vec<EnvironmentRecord>> {
    let list: EnvList = serde_json::from_str(json).context("parse environment list json")?;
    let records = list
        .envs
        .iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            let parent_dir_name = path
                .parent()
                .and_then(Path::file_name)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some(EnvironmentRecord {
                name,
                parent_dir_name,
            })
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;

    const ENV_LIST: &str = r#"{
  "envs": [
    "/opt/miniconda3",
    "/opt/miniconda3/envs/env_alice",
    "/opt/miniconda3/envs/scratch",
    "/home/grader/projects/.venv-like/env_bob"
  ]
}"#;

    #[test]
    fn parses_records_with_parent_directory() {
        let records = parse_env_list(ENV_LIST).expect("parse");
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[1],
            EnvironmentRecord {
                name: "env_alice".to_string(),
                parent_dir_name: "envs".to_string(),
            }
        );
    }

    #[test]
    fn only_named_environments_count() {
        let records = parse_env_list(ENV_LIST).expect("parse");
        let named = named_environments(&records);
        assert_eq!(
            named.into_iter().collect::<Vec<_>>(),
            vec!["env_alice".to_string(), "scratch".to_string()]
        );
    }

    #[test]
    fn rejects_malformed_output() {
        let err = parse_env_list("CondaError: something").unwrap_err();
        assert!(err.to_string().contains("parse environment list json"));
    }

    #[test]
    fn spans_carry_the_environment_name() {
        let manager = CondaManager::new("/nonexistent/conda", Duration::from_secs(5), 1024);
        let logs = capture_logs(|| {
            assert!(manager.create("env_alice", "3.9").is_err());
            assert!(manager.remove("env_bob").is_err());
            let command = vec!["python".to_string()];
            assert!(
                manager
                    .run_in("env_carol", &command, Path::new("/tmp"))
                    .is_err()
            );
        });
        assert!(logs.contains("create{name=env_alice}"), "{logs}");
        assert!(logs.contains("remove{name=env_bob}"), "{logs}");
        assert!(logs.contains("run_in{name=env_carol workdir=/tmp}"), "{logs}");
    }

    #[test]
    fn activation_uses_manager_executable() {
        let manager = CondaManager::new("conda", Duration::from_secs(1), 100);
        assert_eq!(manager.activation("env_alice"), "conda activate env_alice");
    }
}
