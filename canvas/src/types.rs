//! Platform records, deserialized straight from Canvas JSON.
//!
//! Canvas returns many more fields than these; unknown fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A graded assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    pub course_id: u64,
}

/// An enrolled student as known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: u64,
    pub name: String,
}

/// Which slice of a course to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseQuery {
    pub course_id: u64,
    /// Name of the assignment group holding the graded assignments.
    pub assignment_group: String,
    /// Group set (Canvas "group category") to narrow students down to.
    pub groupset: Option<String>,
    /// Group inside `groupset`. Only used when both are set.
    pub group: Option<String>,
}

/// Result of one roster fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformRoster {
    pub assignments: Vec<Assignment>,
    pub students: Vec<Student>,
}

impl PlatformRoster {
    pub fn assignment(&self, id: u64) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn student(&self, id: u64) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }
}

/// Lateness up to this many seconds is reported as only slightly late.
pub const GRACE_PERIOD_SECS: u64 = 15 * 60;

/// One comment on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionComment {
    #[serde(default)]
    pub author_id: Option<u64>,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub comment: String,
}

/// A student's submission for one assignment, as far as grading needs it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmissionInfo {
    /// Grade as entered by the grader (points, letter or pass/fail label).
    #[serde(default)]
    pub grade: Option<String>,
    /// Attempt number of the latest submission; `None` when nothing was handed in.
    #[serde(default)]
    pub attempt: Option<u32>,
    /// Seconds past the deadline; counts up after the deadline even without
    /// a submission.
    #[serde(default)]
    pub seconds_late: u64,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default, rename = "submission_comments")]
    pub comments: Vec<SubmissionComment>,
}

impl SubmissionInfo {
    pub fn status(&self) -> SubmissionStatus {
        match (self.attempt, self.seconds_late) {
            (None, 0) => SubmissionStatus::NotYetSubmitted,
            (None, _) => SubmissionStatus::Missing,
            (Some(_), 0) => SubmissionStatus::OnTime,
            (Some(_), seconds) if seconds < GRACE_PERIOD_SECS => {
                SubmissionStatus::SlightlyLate { seconds }
            }
            (Some(_), seconds) => SubmissionStatus::Late { seconds },
        }
    }

    /// Comments written by the student themselves versus everybody else.
    pub fn comment_counts(&self, student_name: &str) -> CommentCounts {
        let by_student = self
            .comments
            .iter()
            .filter(|c| c.author_name == student_name)
            .count();
        CommentCounts {
            by_student,
            by_others: self.comments.len() - by_student,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Nothing handed in and the deadline has not passed.
    NotYetSubmitted,
    /// Nothing handed in and the deadline has passed.
    Missing,
    OnTime,
    SlightlyLate { seconds: u64 },
    Late { seconds: u64 },
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::NotYetSubmitted => f.write_str("not yet submitted"),
            SubmissionStatus::Missing => f.write_str("not submitted"),
            SubmissionStatus::OnTime => f.write_str("on time"),
            SubmissionStatus::SlightlyLate { seconds } => {
                write!(f, "{} late", natural_duration(*seconds))
            }
            SubmissionStatus::Late { seconds } => {
                write!(f, "{} late, past the grace period", natural_duration(*seconds))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommentCounts {
    pub by_student: usize,
    pub by_others: usize,
}

impl fmt::Display for CommentCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.by_student, self.by_others) {
            (0, 0) => f.write_str("no comments"),
            (own, 0) => write!(f, "{own} by student"),
            (0, others) => write!(f, "+{others} by others"),
            (own, others) => write!(f, "{own} by student, +{others} by others"),
        }
    }
}

/// Largest whole unit of `seconds`, e.g. "3 minutes" or "a day".
fn natural_duration(seconds: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];
    let (size, unit) = UNITS
        .into_iter()
        .find(|(size, _)| seconds >= *size)
        .unwrap_or((1, "second"));
    match seconds / size {
        1 => format!("a {unit}"),
        count => format!("{count} {unit}s"),
    }
}
