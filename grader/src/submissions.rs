//! Submission status of every student for `grader submissions`.

use canvas::{Assignment, GradingPlatform, Student, SubmissionInfo};
use tracing::{instrument, warn};

use crate::core::types::{BatchReport, ItemOutcome};

/// Status, grade and comment counts of one submission on a single line.
pub fn describe_submission(info: &SubmissionInfo, student_name: &str) -> String {
    let grade = info
        .grade
        .as_deref()
        .filter(|grade| !grade.is_empty())
        .unwrap_or("ungraded");
    format!(
        "{}; grade: {grade}; {}",
        info.status(),
        info.comment_counts(student_name)
    )
}

/// Query each student's submission in turn. A failed query is recorded for
/// that student and the remaining students are still queried.
#[instrument(skip_all, fields(assignment = %assignment.name, students = students.len()))]
pub async fn submission_overview(
    platform: &dyn GradingPlatform,
    assignment: &Assignment,
    students: &[Student],
) -> BatchReport {
    let mut report = BatchReport::default();
    for student in students {
        let outcome = match platform.get_submission(assignment, student).await {
            Ok(info) => ItemOutcome::Applied(describe_submission(&info, &student.name)),
            Err(err) => {
                let err = anyhow::Error::new(err);
                warn!(
                    student = %student.name,
                    error = %format!("{err:#}"),
                    "submission query failed"
                );
                ItemOutcome::Failed(format!("{err:#}"))
            }
        };
        report.push(student.name.as_str(), outcome);
    }
    report
}
