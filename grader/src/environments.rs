//! Per-student environment lifecycle for `grader env`.
//!
//! Existence is always asked of the manager: once per single-student call and
//! once at the start of a batch. Nothing about environments is persisted.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::batch::{FailurePolicy, run_batch};
use crate::core::naming::NamingScheme;
use crate::core::types::{BatchReport, ItemOutcome};
use crate::error::GradingError;
use crate::io::conda::{EnvironmentManager, named_environments};
use crate::io::config::EnvironmentConfig;
use crate::io::manifest::find_manifest;

/// Environment status of one roster student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEnvironment {
    pub student: String,
    pub environment: String,
    pub exists: bool,
}

pub struct EnvironmentLifecycle<'a, M: EnvironmentManager + ?Sized> {
    manager: &'a M,
    config: &'a EnvironmentConfig,
    code_dir: &'a Path,
    naming: NamingScheme,
}

impl<'a, M: EnvironmentManager + ?Sized> EnvironmentLifecycle<'a, M> {
    pub fn new(manager: &'a M, config: &'a EnvironmentConfig, code_dir: &'a Path) -> Self {
        Self {
            manager,
            config,
            code_dir,
            naming: NamingScheme::new(config.prefix.clone(), config.manifest.clone()),
        }
    }

    pub fn naming(&self) -> &NamingScheme {
        &self.naming
    }

    fn existing(&self) -> Result<BTreeSet<String>> {
        let records = self.manager.list().context("list environments")?;
        Ok(named_environments(&records))
    }

    /// Managed environments known to the manager, sorted by name.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .existing()?
            .into_iter()
            .filter(|name| self.naming.is_managed(name))
            .collect())
    }

    /// Environment name and existence for every student in `roster`.
    pub fn status(&self, roster: &[String]) -> Result<Vec<StudentEnvironment>> {
        let existing = self.existing()?;
        Ok(roster
            .iter()
            .map(|student| {
                let environment = self.naming.environment_name(student);
                StudentEnvironment {
                    exists: existing.contains(&environment),
                    student: student.clone(),
                    environment,
                }
            })
            .collect())
    }

    /// Create the student's environment unless it exists; `force` recreates it.
    pub fn create(&self, student: &str, force: bool) -> Result<ItemOutcome> {
        let existing = self.existing()?;
        self.create_with(student, force, &existing)
    }

    /// Remove the student's environment if it exists.
    pub fn remove(&self, student: &str) -> Result<ItemOutcome> {
        let existing = self.existing()?;
        self.remove_with(student, &existing)
    }

    /// Install the student's project into their environment and import it once.
    pub fn install(&self, student: &str) -> Result<ItemOutcome> {
        let existing = self.existing()?;
        self.install_with(student, &existing)
    }

    /// Create environments for `roster`, stopping at the first failure.
    #[instrument(skip_all, fields(students = roster.len(), force = force))]
    pub fn create_all(&self, roster: &[String], force: bool) -> Result<BatchReport> {
        let existing = self.existing()?;
        Ok(run_batch(roster, FailurePolicy::FailFast, |student| {
            into_outcome(self.create_with(student, force, &existing))
        }))
    }

    #[instrument(skip_all, fields(students = roster.len()))]
    pub fn remove_all(&self, roster: &[String]) -> Result<BatchReport> {
        let existing = self.existing()?;
        Ok(run_batch(roster, FailurePolicy::ContinueOnError, |student| {
            into_outcome(self.remove_with(student, &existing))
        }))
    }

    #[instrument(skip_all, fields(students = roster.len()))]
    pub fn install_all(&self, roster: &[String]) -> Result<BatchReport> {
        let existing = self.existing()?;
        Ok(run_batch(roster, FailurePolicy::ContinueOnError, |student| {
            into_outcome(self.install_with(student, &existing))
        }))
    }

    fn create_with(
        &self,
        student: &str,
        force: bool,
        existing: &BTreeSet<String>,
    ) -> Result<ItemOutcome> {
        let name = self.naming.environment_name(student);
        if existing.contains(&name) && !force {
            debug!(name = %name, "environment exists");
            return Ok(ItemOutcome::Skipped(format!("{name} already exists")));
        }
        info!(name = %name, force, "creating environment");
        self.manager
            .create(&name, &self.config.python)
            .with_context(|| format!("create {name}"))?;
        Ok(ItemOutcome::Applied(format!(
            "created {name} (python {})",
            self.config.python
        )))
    }

    fn remove_with(&self, student: &str, existing: &BTreeSet<String>) -> Result<ItemOutcome> {
        let name = self.naming.environment_name(student);
        if !existing.contains(&name) {
            return Ok(ItemOutcome::Skipped(format!("{name} does not exist")));
        }
        self.manager
            .remove(&name)
            .with_context(|| format!("remove {name}"))?;
        Ok(ItemOutcome::Applied(format!("removed {name}")))
    }

    fn install_with(&self, student: &str, existing: &BTreeSet<String>) -> Result<ItemOutcome> {
        let name = self.naming.environment_name(student);
        if !existing.contains(&name) {
            return Ok(ItemOutcome::Skipped(format!(
                "{name} does not exist; run `grader env create` first"
            )));
        }

        let project_dir = self.project_dir(student)?;
        info!(name = %name, dir = %project_dir.display(), "installing project");
        self.manager
            .run_in(&name, &self.config.install, &project_dir)?
            .check(&self.config.install.join(" "))?;
        self.manager
            .run_in(&name, &self.config.warm_import, &project_dir)?
            .check(&self.config.warm_import.join(" "))?;
        Ok(ItemOutcome::Applied(format!(
            "installed {} into {name}",
            project_dir.display()
        )))
    }

    /// Directory holding the student's single manifest.
    fn project_dir(&self, student: &str) -> Result<PathBuf> {
        let student_dir = self.naming.student_dir(self.code_dir, student);
        let manifest = find_manifest(&student_dir, student, self.naming.manifest_name())?
            .ok_or_else(|| GradingError::NotFound {
                what: "manifest",
                path: self.naming.manifest_pattern(self.code_dir, student),
            })?;
        Ok(manifest
            .parent()
            .unwrap_or(student_dir.as_path())
            .to_path_buf())
    }
}

/// Fold a per-student result into a report outcome; errors keep their full chain.
fn into_outcome(result: Result<ItemOutcome>) -> ItemOutcome {
    result.unwrap_or_else(|err| ItemOutcome::Failed(format!("{err:#}")))
}
