//! Grading-home layout and `grader init` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::config::{CONFIG_FILE, GradingConfig, find_config_file, write_config};

/// Canonical paths of a grading home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingPaths {
    /// Directory containing `grading.toml`.
    pub home: PathBuf,
    pub config_path: PathBuf,
    pub code_dir: PathBuf,
    pub submissions_dir: PathBuf,
}

impl GradingPaths {
    pub fn new(home: impl Into<PathBuf>, config: &GradingConfig) -> Self {
        let home = home.into();
        Self {
            config_path: home.join(CONFIG_FILE),
            code_dir: home.join(&config.general.code_dir),
            submissions_dir: home.join(&config.general.submissions_dir),
            home,
        }
    }

    /// Paths for the grading home owning `config_path`.
    pub fn from_config_path(config_path: &Path, config: &GradingConfig) -> Result<Self> {
        let home = config_path
            .parent()
            .with_context(|| format!("config path missing parent {}", config_path.display()))?;
        Ok(Self::new(home, config))
    }

    /// Paths scoped to one assignment: `code_dir` and `submissions_dir` live
    /// under `<home>/<dir_name>/`, the configuration stays at the home.
    pub fn for_assignment(&self, config: &GradingConfig, dir_name: &str) -> Self {
        let scoped = Self::new(self.home.join(dir_name), config);
        Self {
            home: self.home.clone(),
            config_path: self.config_path.clone(),
            ..scoped
        }
    }

    pub fn student_dir(&self, student: &str) -> PathBuf {
        self.code_dir.join(student)
    }
}

/// Options for `init_grading`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing `grading.toml` in `root`.
    pub force: bool,
}

/// Outcome of `init_grading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A default configuration was written.
    Created(GradingPaths),
    /// A configuration already governs `root`; nothing was touched.
    Existing(PathBuf),
}

/// Write a default `grading.toml` into `root` and create its directories.
///
/// Without `force`, a configuration found in `root` or any ancestor is left
/// untouched.
pub fn init_grading(root: &Path, options: &InitOptions) -> Result<InitOutcome> {
    if !options.force
        && let Some(existing) = find_config_file(root)
    {
        info!(path = %existing.display(), "configuration already exists");
        return Ok(InitOutcome::Existing(existing));
    }

    let config = GradingConfig::default();
    let paths = GradingPaths::new(root, &config);
    write_config(&paths.config_path, &config)?;
    create_dir(&paths.code_dir)?;
    create_dir(&paths.submissions_dir)?;
    info!(path = %paths.config_path.display(), "wrote default configuration");
    Ok(InitOutcome::Created(paths))
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}
