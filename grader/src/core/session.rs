//! Session cursor recovered from the working directory.
//!
//! There is no stored "current student": the grader's working directory below
//! the code directory *is* the cursor. These helpers turn that location into a
//! roster position and compute the next one.

use std::path::{Component, Path};

use crate::error::GradingError;

/// Recover the active student from `cwd`.
///
/// The student is the first path segment of `cwd` relative to `code_dir`, and
/// must be part of `roster`.
pub fn resolve_current_student<'a>(
    cwd: &Path,
    code_dir: &Path,
    roster: &'a [String],
) -> Result<&'a str, GradingError> {
    let relative = cwd
        .strip_prefix(code_dir)
        .map_err(|_| GradingError::NotInSession {
            reason: format!(
                "working directory {} is not inside the code directory {}",
                cwd.display(),
                code_dir.display()
            ),
        })?;

    let segment = match relative.components().next() {
        Some(Component::Normal(segment)) => segment.to_string_lossy(),
        _ => {
            return Err(GradingError::NotInSession {
                reason: format!(
                    "working directory is the code directory {}; enter a student's directory first",
                    code_dir.display()
                ),
            });
        }
    };

    roster
        .iter()
        .find(|student| student.as_str() == segment)
        .map(String::as_str)
        .ok_or_else(|| GradingError::NotInSession {
            reason: format!("'{segment}' is not a student in the roster"),
        })
}

/// Student after `current`, wrapping to the first after the last.
pub fn next_student<'a>(roster: &'a [String], current: &str) -> Result<&'a str, GradingError> {
    let idx = roster
        .iter()
        .position(|student| student == current)
        .ok_or_else(|| GradingError::NotInSession {
            reason: format!("'{current}' is not a student in the roster"),
        })?;
    Ok(roster[(idx + 1) % roster.len()].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_student_from_nested_directory() {
        let roster = roster(&["alice", "bob"]);
        let student = resolve_current_student(
            Path::new("/grading/code/bob/project/src"),
            Path::new("/grading/code"),
            &roster,
        )
        .expect("resolve");
        assert_eq!(student, "bob");
    }

    #[test]
    fn outside_code_dir_is_not_in_session() {
        let roster = roster(&["alice"]);
        let err = resolve_current_student(
            Path::new("/home/grader"),
            Path::new("/grading/code"),
            &roster,
        )
        .unwrap_err();
        assert!(matches!(err, GradingError::NotInSession { .. }));
    }

    #[test]
    fn code_dir_itself_is_not_in_session() {
        let roster = roster(&["alice"]);
        let err = resolve_current_student(
            Path::new("/grading/code"),
            Path::new("/grading/code"),
            &roster,
        )
        .unwrap_err();
        assert!(err.to_string().contains("enter a student's directory"));
    }

    #[test]
    fn unknown_directory_is_not_in_session() {
        let roster = roster(&["alice"]);
        let err = resolve_current_student(
            Path::new("/grading/code/mallory"),
            Path::new("/grading/code"),
            &roster,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'mallory'"));
    }

    #[test]
    fn next_wraps_around() {
        let roster = roster(&["alice", "bob", "carol"]);
        assert_eq!(next_student(&roster, "alice").expect("next"), "bob");
        assert_eq!(next_student(&roster, "carol").expect("next"), "alice");
    }

    #[test]
    fn next_visits_every_student_once_per_cycle() {
        let roster = roster(&["a", "b", "c", "d", "e"]);
        let mut current = roster[0].as_str();
        let mut seen = Vec::new();
        for _ in 0..roster.len() {
            current = next_student(&roster, current).expect("next");
            seen.push(current);
        }
        assert_eq!(current, "a");
        let mut visited = seen[..seen.len() - 1].to_vec();
        visited.sort_unstable();
        assert_eq!(visited, vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn single_student_roster_cycles_to_itself() {
        let roster = roster(&["solo"]);
        assert_eq!(next_student(&roster, "solo").expect("next"), "solo");
    }
}
