//! Facade combining configuration, roster, environments, unpacking and
//! navigation into the operations the CLI exposes.

use std::path::Path;

use anyhow::{Result, bail};
use canvas::GradingPlatform;
use tracing::debug;

use crate::core::naming::{NamingScheme, slugify};
use crate::core::types::BatchReport;
use crate::environments::{EnvironmentLifecycle, StudentEnvironment};
use crate::io::conda::{CondaManager, EnvironmentManager};
use crate::io::config::{GradingConfig, discover_config};
use crate::io::editor::EditorLauncher;
use crate::io::init::GradingPaths;
use crate::io::roster::resolve_roster;
use crate::navigate::{SessionNavigator, ShellTarget, render_directives};
use crate::pipeline::TaskPipeline;
use crate::unpack::unpack_all;

/// Managed environments plus per-student presence, for `grader env list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentListing {
    pub managed: Vec<String>,
    pub students: Vec<StudentEnvironment>,
}

pub struct Orchestrator<M: EnvironmentManager> {
    paths: GradingPaths,
    config: GradingConfig,
    manager: M,
    naming: NamingScheme,
}

impl Orchestrator<CondaManager> {
    /// Load the configuration governing `start` and use the configured manager.
    pub fn discover(start: &Path) -> Result<Self> {
        let (config_path, config) = discover_config(start)?;
        let paths = GradingPaths::from_config_path(&config_path, &config)?;
        debug!(home = %paths.home.display(), "grading home");
        let manager = CondaManager::from_config(&config.environment);
        Ok(Self::new(paths, config, manager))
    }
}

impl<M: EnvironmentManager> Orchestrator<M> {
    pub fn new(paths: GradingPaths, config: GradingConfig, manager: M) -> Self {
        let naming = NamingScheme::new(
            config.environment.prefix.clone(),
            config.environment.manifest.clone(),
        );
        Self {
            paths,
            config,
            manager,
            naming,
        }
    }

    /// Work inside one assignment's directory, the layout `grader task` uses.
    /// Accepts the assignment name or the directory name itself.
    pub fn for_assignment(mut self, assignment: &str) -> Result<Self> {
        let dir = slugify(assignment);
        if dir.is_empty() {
            bail!("assignment {assignment:?} has no usable directory name");
        }
        self.paths = self.paths.for_assignment(&self.config, &dir);
        debug!(code = %self.paths.code_dir.display(), "assignment workspace");
        Ok(self)
    }

    pub fn paths(&self) -> &GradingPaths {
        &self.paths
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Students with a code directory, recomputed on every call.
    pub fn roster(&self) -> Result<Vec<String>> {
        resolve_roster(&self.paths.code_dir)
    }

    fn lifecycle(&self) -> EnvironmentLifecycle<'_, M> {
        EnvironmentLifecycle::new(&self.manager, &self.config.environment, &self.paths.code_dir)
    }

    pub fn list_environments(&self) -> Result<EnvironmentListing> {
        let roster = self.roster()?;
        let lifecycle = self.lifecycle();
        Ok(EnvironmentListing {
            managed: lifecycle.list()?,
            students: lifecycle.status(&roster)?,
        })
    }

    pub fn create_environments(&self, force: bool) -> Result<BatchReport> {
        let roster = self.roster()?;
        self.lifecycle().create_all(&roster, force)
    }

    pub fn remove_environments(&self) -> Result<BatchReport> {
        let roster = self.roster()?;
        self.lifecycle().remove_all(&roster)
    }

    pub fn install_environments(&self) -> Result<BatchReport> {
        let roster = self.roster()?;
        self.lifecycle().install_all(&roster)
    }

    pub fn unpack_submissions(&self) -> Result<BatchReport> {
        unpack_all(&self.paths)
    }

    pub fn start(&self) -> Result<ShellTarget> {
        let roster = self.roster()?;
        SessionNavigator::new(&self.paths.code_dir, &self.naming).start(&roster)
    }

    pub fn next(&self, cwd: &Path) -> Result<ShellTarget> {
        let roster = self.roster()?;
        SessionNavigator::new(&self.paths.code_dir, &self.naming).next(&roster, cwd)
    }

    /// `cd` and activation directives for `target`.
    pub fn directives(&self, target: &ShellTarget) -> String {
        render_directives(target, &self.manager.activation(&target.environment))
    }

    pub fn pipeline<'a>(
        &'a self,
        platform: &'a dyn GradingPlatform,
        launcher: &'a dyn EditorLauncher,
    ) -> TaskPipeline<'a, M> {
        TaskPipeline::new(&self.paths, &self.config, &self.manager, platform, launcher)
    }
}
