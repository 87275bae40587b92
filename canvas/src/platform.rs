//! The seam between the grader and whatever hosts the course.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::{Assignment, CourseQuery, Student, SubmissionInfo};

/// Abstraction over grading-platform backends.
///
/// [`crate::CanvasClient`] talks to Canvas; tests use in-memory fakes.
#[async_trait]
pub trait GradingPlatform: Send + Sync {
    /// Assignments in the query's assignment group.
    async fn list_assignments(&self, query: &CourseQuery) -> Result<Vec<Assignment>, PlatformError>;

    /// Students of the course, narrowed to a group when the query names one.
    async fn list_students(&self, query: &CourseQuery) -> Result<Vec<Student>, PlatformError>;

    /// Fetch the student's latest submission for `assignment` and write it to `dest`.
    ///
    /// Returns the path of the written archive.
    async fn download_submission(
        &self,
        assignment: &Assignment,
        student: &Student,
        dest: &Path,
    ) -> Result<PathBuf, PlatformError>;

    /// Grade, attempt, lateness and comments of the student's submission.
    async fn get_submission(
        &self,
        assignment: &Assignment,
        student: &Student,
    ) -> Result<SubmissionInfo, PlatformError>;
}
