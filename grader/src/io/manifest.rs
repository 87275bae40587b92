//! Per-student manifest lookup.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::GradingError;

/// Find the single manifest named `manifest_name` below `student_dir`.
///
/// Returns `Ok(None)` when there is none and [`GradingError::AmbiguousManifest`]
/// when there are several. Hidden directories (`.git`, `.venv`, ...) are not
/// searched.
pub fn find_manifest(
    student_dir: &Path,
    student: &str,
    manifest_name: &str,
) -> Result<Option<PathBuf>> {
    if !student_dir.is_dir() {
        return Err(GradingError::NotFound {
            what: "student directory",
            path: student_dir.to_path_buf(),
        }
        .into());
    }

    let walker = WalkDir::new(student_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    let mut matches = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", student_dir.display()))?;
        if entry.file_type().is_file() && entry.file_name() == OsStr::new(manifest_name) {
            matches.push(entry.into_path());
        }
    }

    debug!(student, count = matches.len(), "manifest search finished");
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(GradingError::AmbiguousManifest {
            student: student.to_string(),
            matches,
        }
        .into()),
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "[tool.poetry]\n").expect("write");
    }

    #[test]
    fn finds_nested_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest = temp.path().join("alice/pythondaq/pyproject.toml");
        touch(&manifest);

        let found = find_manifest(&temp.path().join("alice"), "alice", "pyproject.toml")
            .expect("find");
        assert_eq!(found, Some(manifest));
    }

    #[test]
    fn no_manifest_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("bob/src")).expect("mkdir");
        let found =
            find_manifest(&temp.path().join("bob"), "bob", "pyproject.toml").expect("find");
        assert_eq!(found, None);
    }

    #[test]
    fn several_manifests_are_ambiguous() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(&temp.path().join("carol/a/pyproject.toml"));
        touch(&temp.path().join("carol/b/pyproject.toml"));

        let err = find_manifest(&temp.path().join("carol"), "carol", "pyproject.toml")
            .unwrap_err();
        let Some(GradingError::AmbiguousManifest { matches, .. }) = err.downcast_ref::<GradingError>() else {
            panic!("expected ambiguous manifest, got {err:#}");
        };
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn hidden_directories_are_ignored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest = temp.path().join("dave/pyproject.toml");
        touch(&manifest);
        touch(&temp.path().join("dave/.venv/lib/pkg/pyproject.toml"));

        let found =
            find_manifest(&temp.path().join("dave"), "dave", "pyproject.toml").expect("find");
        assert_eq!(found, Some(manifest));
    }
}
