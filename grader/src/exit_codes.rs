//! Stable exit codes for grader CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration, layout or usage, or another unexpected error.
pub const INVALID: i32 = 1;
/// `grader shell next` was invoked outside a student's directory.
pub const NOT_IN_SESSION: i32 = 2;
/// A batch finished with at least one failed student, or halted.
pub const BATCH_FAILED: i32 = 3;
/// `grader task` ran and the task reported failure.
pub const TASK_FAILED: i32 = 4;
