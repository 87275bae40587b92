//! Grading configuration stored in `grading.toml`.
//!
//! The file marks the grading home: it is discovered by walking up from the
//! working directory, and every relative path inside it is resolved against
//! the directory that contains it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use canvas::CourseQuery;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GradingError;

pub const CONFIG_FILE: &str = "grading.toml";

/// Grading configuration (TOML).
///
/// Edited by humans. Missing fields default to the values `grader init` writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GradingConfig {
    pub general: GeneralConfig,
    pub environment: EnvironmentConfig,
    pub editor: EditorConfig,
    pub canvas: CanvasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding one unpacked project per student.
    pub code_dir: PathBuf,
    /// Directory holding downloaded `<student>_*.zip` archives.
    pub submissions_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment manager executable.
    pub manager: String,
    /// Prefix shared by every environment this tool manages.
    pub prefix: String,
    /// Interpreter version new environments are pinned to.
    pub python: String,
    /// File name of the per-student project manifest.
    pub manifest: String,
    /// Dependency install command, run inside the environment next to the manifest.
    pub install: Vec<String>,
    /// Command that imports the installed packages once.
    pub warm_import: Vec<String>,
    /// Wall-clock limit for a single environment-manager invocation.
    pub timeout_secs: u64,
    /// Keep at most this many bytes of stdout/stderr per invocation.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor command; the student's directory is appended as last argument.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CanvasConfig {
    pub server: String,
    pub course_id: u64,
    pub assignment_group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Environment variable holding the API token.
    pub token_env: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            code_dir: PathBuf::from("code"),
            submissions_dir: PathBuf::from("submissions"),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            manager: "conda".to_string(),
            prefix: "env_".to_string(),
            python: "3.9".to_string(),
            manifest: "pyproject.toml".to_string(),
            install: vec!["poetry".to_string(), "install".to_string()],
            warm_import: vec![
                "python".to_string(),
                "-c".to_string(),
                "help('modules')".to_string(),
            ],
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: vec!["code".to_string()],
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            server: "https://canvas.example.edu".to_string(),
            course_id: 0,
            assignment_group: "ECPC".to_string(),
            groupset: None,
            group: None,
            token_env: "CANVAS_API_TOKEN".to_string(),
        }
    }
}

impl EnvironmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CanvasConfig {
    pub fn query(&self) -> CourseQuery {
        CourseQuery {
            course_id: self.course_id,
            assignment_group: self.assignment_group.clone(),
            groupset: self.groupset.clone(),
            group: self.group.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(anyhow!("canvas.server must be set"));
        }
        if self.course_id == 0 {
            return Err(anyhow!("canvas.course_id must be set"));
        }
        if self.token_env.trim().is_empty() {
            return Err(anyhow!("canvas.token_env must be set"));
        }
        Ok(())
    }
}

impl GradingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.general.code_dir.as_os_str().is_empty() {
            return Err(anyhow!("general.code_dir must be set"));
        }
        if self.general.submissions_dir.as_os_str().is_empty() {
            return Err(anyhow!("general.submissions_dir must be set"));
        }
        let env = &self.environment;
        if env.manager.trim().is_empty() {
            return Err(anyhow!("environment.manager must be set"));
        }
        // An empty prefix would claim every environment on the machine.
        if env.prefix.is_empty() {
            return Err(anyhow!("environment.prefix must be non-empty"));
        }
        if env.python.trim().is_empty() {
            return Err(anyhow!("environment.python must be set"));
        }
        if env.manifest.trim().is_empty() {
            return Err(anyhow!("environment.manifest must be set"));
        }
        if is_empty_command(&env.install) {
            return Err(anyhow!("environment.install must be a non-empty array"));
        }
        if is_empty_command(&env.warm_import) {
            return Err(anyhow!("environment.warm_import must be a non-empty array"));
        }
        if env.timeout_secs == 0 {
            return Err(anyhow!("environment.timeout_secs must be > 0"));
        }
        if env.output_limit_bytes == 0 {
            return Err(anyhow!("environment.output_limit_bytes must be > 0"));
        }
        if is_empty_command(&self.editor.command) {
            return Err(anyhow!("editor.command must be a non-empty array"));
        }
        Ok(())
    }
}

fn is_empty_command(command: &[String]) -> bool {
    command.first().is_none_or(|program| program.trim().is_empty())
}

/// Search `start` and its ancestors for `grading.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Locate and load the configuration governing `start`.
///
/// Returns the config file path together with the parsed config. A missing
/// file is a [`GradingError::ConfigNotFound`].
pub fn discover_config(start: &Path) -> Result<(PathBuf, GradingConfig)> {
    let path = find_config_file(start).ok_or_else(|| GradingError::ConfigNotFound {
        start: start.to_path_buf(),
    })?;
    debug!(path = %path.display(), "found configuration");
    let cfg = load_config(&path)?;
    Ok((path, cfg))
}

/// Load config from a TOML file.
pub fn load_config(path: &Path) -> Result<GradingConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GradingConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GradingConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        let cfg = GradingConfig::default();
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[general]\ncode_dir = \"projects\"\n\n[canvas]\ncourse_id = 42\ngroupset = \"Labs\"\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.general.code_dir, PathBuf::from("projects"));
        assert_eq!(cfg.general.submissions_dir, PathBuf::from("submissions"));
        assert_eq!(cfg.environment.prefix, "env_");
        assert_eq!(cfg.canvas.course_id, 42);
        assert_eq!(cfg.canvas.groupset.as_deref(), Some("Labs"));
        assert_eq!(cfg.canvas.group, None);
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[environment]\nprefix = \"\"\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("environment.prefix"));
    }

    #[test]
    fn discovery_walks_up_to_ancestors() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_config(&temp.path().join(CONFIG_FILE), &GradingConfig::default()).expect("write");
        let nested = temp.path().join("code").join("alice").join("src");
        fs::create_dir_all(&nested).expect("mkdir");

        let (path, _cfg) = discover_config(&nested).expect("discover");
        assert_eq!(path, temp.path().join(CONFIG_FILE));
    }

    #[test]
    fn missing_config_tells_user_to_init() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = discover_config(temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GradingError>(),
            Some(GradingError::ConfigNotFound { .. })
        ));
        assert!(err.to_string().contains("grader init"));
    }

    #[test]
    fn canvas_section_requires_course() {
        let cfg = CanvasConfig::default();
        assert!(cfg.validate().is_err());
        let cfg = CanvasConfig {
            course_id: 7,
            ..CanvasConfig::default()
        };
        cfg.validate().expect("valid");
        assert_eq!(cfg.query().course_id, 7);
    }
}
