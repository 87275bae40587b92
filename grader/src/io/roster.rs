//! Roster derived from the code directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::error::GradingError;

/// Students with a directory in `code_dir`, sorted and deduplicated.
///
/// Every immediate child directory is a student. Hidden entries are staging
/// areas of in-progress extractions and are never students.
pub fn resolve_roster(code_dir: &Path) -> Result<Vec<String>> {
    if !code_dir.is_dir() {
        return Err(GradingError::NotFound {
            what: "code directory",
            path: code_dir.to_path_buf(),
        }
        .into());
    }

    let mut students = BTreeSet::new();
    for entry in fs::read_dir(code_dir).with_context(|| format!("read {}", code_dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", code_dir.display()))?;
        if !entry.path().is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            warn!(path = %entry.path().display(), "skipping non-UTF-8 student directory");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        students.insert(name.to_string());
    }

    debug!(count = students.len(), "resolved roster");
    Ok(students.into_iter().collect())
}
