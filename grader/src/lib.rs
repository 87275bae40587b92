//! Per-student environment and task orchestration for grading programming
//! submissions.
//!
//! The grading home is a directory holding `grading.toml`, a code directory
//! with one unpacked project per student and a submissions directory with the
//! downloaded archives. Nothing else is stored: the roster, environment
//! existence and the current student are recovered from the filesystem and the
//! environment manager on every invocation.
//!
//! - **[`core`]**: Pure, deterministic logic (naming, session cursor, batch
//!   policies, report types). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, processes, environment
//!   manager, archives, editor). Behind traits where tests need fakes.
//!
//! Orchestration modules ([`environments`], [`unpack`], [`pipeline`],
//! [`navigate`]) coordinate the two, and [`orchestrator`] exposes them to the CLI.
//! [`submissions`] reports each student's submission status from the platform.

pub mod core;
pub mod environments;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod navigate;
pub mod orchestrator;
pub mod pipeline;
pub mod submissions;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod unpack;
