//! Typed failures the grader distinguishes.
//!
//! Functions return `anyhow::Result`; these variants are raised where a caller
//! needs to tell failures apart (exit codes, per-student reports, tests) and are
//! recovered with `downcast_ref::<GradingError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// Non-zero exit (or timeout) of an external tool. `output` is the tool's
    /// captured diagnostics, verbatim.
    #[error("{tool} failed ({}): {output}", describe_exit(*exit_code))]
    ExternalTool {
        tool: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("not in a grading session: {reason}")]
    NotInSession { reason: String },

    #[error(
        "more than one manifest found for {student}: {}",
        join_paths(matches)
    )]
    AmbiguousManifest {
        student: String,
        matches: Vec<PathBuf>,
    },

    #[error(
        "more than one submission found for {student}: {}",
        join_paths(matches)
    )]
    AmbiguousSubmission {
        student: String,
        matches: Vec<PathBuf>,
    },

    #[error("no students found in {}", code_dir.display())]
    EmptyRoster { code_dir: PathBuf },

    #[error(
        "configuration file not found in {} or any parent directory; run `grader init` first",
        start.display()
    )]
    ConfigNotFound { start: PathBuf },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated without exit code".to_string(),
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
