//! Batch error policies.
//!
//! Roster-wide operations differ only in what a failure means for the rest of
//! the roster: environment creation failures are systemic (quota, disk, broken
//! manager) and stop the batch, removal and install failures are per student
//! and are recorded before moving on.

use super::types::{BatchReport, ItemOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failed item; later items are never attempted.
    FailFast,
    /// Record the failure and continue with the next item.
    ContinueOnError,
}

/// Apply `step` to every student in order under `policy`.
pub fn run_batch<S, F>(students: &[S], policy: FailurePolicy, mut step: F) -> BatchReport
where
    S: AsRef<str>,
    F: FnMut(&str) -> ItemOutcome,
{
    let mut report = BatchReport::default();
    for student in students {
        let student = student.as_ref();
        let outcome = step(student);
        let failed = outcome.is_failure();
        report.push(student, outcome);
        if failed && policy == FailurePolicy::FailFast {
            report.halted = true;
            break;
        }
    }
    report
}
