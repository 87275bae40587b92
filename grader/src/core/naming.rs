//! Deterministic names derived from student identifiers.
//!
//! Nothing here is stored: environment names, manifest locations and download
//! file names are recomputed from the student identifier every time they are
//! needed.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Leading student token of a submission archive name, e.g. `alice_pythondaq.zip`.
static SUBMISSION_NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(?P<name>[a-z0-9]+(?:-[a-z0-9]+)*)_").unwrap()
});

/// Maps students to environment names and manifest locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    prefix: String,
    manifest: String,
}

impl NamingScheme {
    pub fn new(prefix: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            manifest: manifest.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File name of the per-student project descriptor (e.g. `pyproject.toml`).
    pub fn manifest_name(&self) -> &str {
        &self.manifest
    }

    pub fn environment_name(&self, student: &str) -> String {
        format!("{}{}", self.prefix, student)
    }

    /// True if `name` belongs to the pool of environments this tool manages.
    pub fn is_managed(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix)
            .is_some_and(|student| !student.is_empty())
    }

    /// Inverse of [`NamingScheme::environment_name`] for managed names.
    pub fn student_for_environment<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(&self.prefix)
            .filter(|student| !student.is_empty())
    }

    pub fn student_dir(&self, code_dir: &Path, student: &str) -> PathBuf {
        code_dir.join(student)
    }

    /// Recursive search pattern for the student's manifest.
    pub fn manifest_pattern(&self, code_dir: &Path, student: &str) -> PathBuf {
        self.student_dir(code_dir, student)
            .join("**")
            .join(&self.manifest)
    }
}

/// Student token at the start of a submission archive name.
///
/// Returns `None` for names that do not follow the `<student>_...` convention.
pub fn student_from_archive(file_name: &str) -> Option<&str> {
    SUBMISSION_NAME
        .captures(file_name)
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

/// Lowercase ASCII slug: alphanumeric runs joined by single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Local student identifier for a platform display name.
pub fn student_token(display_name: &str) -> String {
    slugify(display_name)
}

/// Deterministic archive name for a downloaded submission.
pub fn submission_file_name(student: &str, assignment_name: &str) -> String {
    let assignment = slugify(assignment_name);
    if assignment.is_empty() {
        format!("{student}_submission.zip")
    } else {
        format!("{student}_{assignment}.zip")
    }
}

/// Directory holding one assignment's submissions and code, below the
/// grading home. Falls back to the platform id when the name has no slug.
pub fn assignment_dir_name(assignment_name: &str, assignment_id: u64) -> String {
    let slug = slugify(assignment_name);
    if slug.is_empty() {
        format!("assignment-{assignment_id}")
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> NamingScheme {
        NamingScheme::new("env_", "pyproject.toml")
    }

    #[test]
    fn environment_name_is_prefixed_student() {
        assert_eq!(scheme().environment_name("alice"), "env_alice");
        assert_eq!(
            scheme().environment_name("alice"),
            scheme().environment_name("alice")
        );
    }

    #[test]
    fn distinct_students_get_distinct_environments() {
        let students = ["alice", "bob", "alice2", "al", "ice"];
        let names: std::collections::BTreeSet<String> = students
            .iter()
            .map(|s| scheme().environment_name(s))
            .collect();
        assert_eq!(names.len(), students.len());
    }

    #[test]
    fn managed_names_require_prefix_and_student() {
        let naming = scheme();
        assert!(naming.is_managed("env_alice"));
        assert!(!naming.is_managed("env_"));
        assert!(!naming.is_managed("base"));
        assert!(!naming.is_managed("myenv_alice"));
        assert_eq!(naming.student_for_environment("env_bob"), Some("bob"));
        assert_eq!(naming.student_for_environment("other"), None);
    }

    #[test]
    fn manifest_pattern_searches_below_student_dir() {
        let pattern = scheme().manifest_pattern(Path::new("/grading/code"), "alice");
        assert_eq!(
            pattern,
            PathBuf::from("/grading/code/alice/**/pyproject.toml")
        );
    }

    #[test]
    fn archive_names_yield_leading_token() {
        assert_eq!(student_from_archive("alice_sub1.zip"), Some("alice"));
        assert_eq!(
            student_from_archive("john-doe_pythondaq.zip"),
            Some("john-doe")
        );
        assert_eq!(student_from_archive("bob_late_2.zip"), Some("bob"));
        assert_eq!(student_from_archive("Alice_sub1.zip"), None);
        assert_eq!(student_from_archive("nounderscore.zip"), None);
        assert_eq!(student_from_archive("_orphan.zip"), None);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Alice  van der Berg"), "alice-van-der-berg");
        assert_eq!(slugify("  --Bob-- "), "bob");
        assert_eq!(slugify("Week 3: DAQ!"), "week-3-daq");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn downloaded_archives_match_the_submission_pattern() {
        let student = student_token("Alice van der Berg");
        let file = submission_file_name(&student, "Pythondaq (final)");
        assert_eq!(file, "alice-van-der-berg_pythondaq-final.zip");
        assert_eq!(student_from_archive(&file), Some(student.as_str()));
    }

    #[test]
    fn assignment_directories_fall_back_to_the_id() {
        assert_eq!(assignment_dir_name("Week 1", 11), "week-1");
        assert_eq!(assignment_dir_name("???", 11), "assignment-11");
    }
}
