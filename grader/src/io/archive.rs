//! Submission archives: discovery and extraction.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};
use zip::ZipArchive;

use crate::core::naming::student_from_archive;
use crate::error::GradingError;

/// All `*.zip` files directly inside `submissions_dir`, sorted by name.
pub fn list_archives(submissions_dir: &Path) -> Result<Vec<PathBuf>> {
    if !submissions_dir.is_dir() {
        return Err(GradingError::NotFound {
            what: "submissions directory",
            path: submissions_dir.to_path_buf(),
        }
        .into());
    }
    let mut archives = Vec::new();
    for entry in fs::read_dir(submissions_dir)
        .with_context(|| format!("read {}", submissions_dir.display()))?
    {
        let entry = entry.with_context(|| format!("read entry in {}", submissions_dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "zip") {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

/// Archives in `submissions_dir` whose leading token is exactly `student`.
pub fn student_archives(submissions_dir: &Path, student: &str) -> Result<Vec<PathBuf>> {
    let archives = list_archives(submissions_dir)?;
    Ok(archives
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(student_from_archive)
                == Some(student)
        })
        .collect())
}

/// Extract every entry of the zip at `archive` below `dest`.
///
/// Entries whose path would leave `dest` fail the whole extraction. Returns
/// the number of files written.
#[instrument(skip_all, fields(archive = %archive.display()))]
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut zip =
        ZipArchive::new(file).with_context(|| format!("read zip {}", archive.display()))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("read entry {i} of {}", archive.display()))?;
        let Some(relative) = entry.enclosed_name() else {
            bail!(
                "{} contains entry '{}' outside the extraction directory",
                archive.display(),
                entry.name()
            );
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .with_context(|| format!("create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let mut out =
            File::create(&out_path).with_context(|| format!("create {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("write {}", out_path.display()))?;
        written += 1;
    }

    debug!(written, "archive extracted");
    Ok(written)
}

/// Extract `archive` into `target`, which must not exist yet.
///
/// Extraction happens in a hidden staging directory next to `target` and is
/// renamed into place only after every entry was written, so `target` either
/// does not exist or holds the complete archive.
pub fn extract_atomically(archive: &Path, target: &Path) -> Result<usize> {
    let parent = target
        .parent()
        .with_context(|| format!("extraction target missing parent {}", target.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let staging = tempfile::Builder::new()
        .prefix(".unpack-")
        .tempdir_in(parent)
        .with_context(|| format!("create staging directory in {}", parent.display()))?;
    let written = extract_zip(archive, staging.path())?;
    fs::rename(staging.path(), target).with_context(|| {
        format!(
            "move extracted files from {} to {}",
            staging.path().display(),
            target.display()
        )
    })?;
    Ok(written)
}
