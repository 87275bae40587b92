//! Unpacking downloaded submissions into the code directory.
//!
//! A student's directory is only ever created by renaming a fully extracted
//! staging directory, so its existence means "unpacked" and re-runs skip it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::naming::student_from_archive;
use crate::core::types::{BatchReport, ItemOutcome};
use crate::error::GradingError;
use crate::io::archive::{extract_atomically, list_archives, student_archives};
use crate::io::init::GradingPaths;

/// Unpack every `<student>_*.zip` in the submissions directory.
///
/// Items are keyed by student, or by file name for unrecognized archives. A
/// failed archive is recorded and the remaining archives are still unpacked.
#[instrument(skip_all, fields(submissions = %paths.submissions_dir.display()))]
pub fn unpack_all(paths: &GradingPaths) -> Result<BatchReport> {
    fs::create_dir_all(&paths.code_dir)
        .with_context(|| format!("create directory {}", paths.code_dir.display()))?;

    let mut report = BatchReport::default();
    for archive in list_archives(&paths.submissions_dir)? {
        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(student) = student_from_archive(&file_name) else {
            warn!(archive = %file_name, "unrecognized submission name");
            report.push(
                file_name.as_str(),
                ItemOutcome::Skipped(format!(
                    "{file_name} does not start with a student token; skipped"
                )),
            );
            continue;
        };
        let outcome = unpack_archive(&archive, paths, student)
            .unwrap_or_else(|err| ItemOutcome::Failed(format!("{err:#}")));
        report.push(student, outcome);
    }
    Ok(report)
}

/// Unpack the single submission of `student`.
pub fn unpack_student(paths: &GradingPaths, student: &str) -> Result<ItemOutcome> {
    let mut matches = student_archives(&paths.submissions_dir, student)?;
    match matches.len() {
        0 => Err(GradingError::NotFound {
            what: "submission",
            path: paths.submissions_dir.join(format!("{student}_*.zip")),
        }
        .into()),
        1 => {
            let archive = matches.remove(0);
            unpack_archive(&archive, paths, student)
        }
        _ => Err(GradingError::AmbiguousSubmission {
            student: student.to_string(),
            matches,
        }
        .into()),
    }
}

/// Unpack the known `archive` of `student`.
pub fn unpack_submission(
    paths: &GradingPaths,
    archive: &Path,
    student: &str,
) -> Result<ItemOutcome> {
    if !archive.is_file() {
        return Err(GradingError::NotFound {
            what: "submission",
            path: archive.to_path_buf(),
        }
        .into());
    }
    unpack_archive(archive, paths, student)
}

fn unpack_archive(archive: &Path, paths: &GradingPaths, student: &str) -> Result<ItemOutcome> {
    let target = paths.student_dir(student);
    if target.exists() {
        return Ok(ItemOutcome::Skipped(format!(
            "{} already unpacked",
            target.display()
        )));
    }
    let written = extract_atomically(archive, &target)
        .with_context(|| format!("unpack {}", archive.display()))?;
    info!(student, written, "unpacked submission");
    Ok(ItemOutcome::Applied(format!(
        "unpacked {written} files into {}",
        target.display()
    )))
}
