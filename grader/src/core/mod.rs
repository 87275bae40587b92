//! Deterministic, pure logic shared by the grader.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (student identifiers, paths as values) and return deterministic outputs
//! suitable for tests.

pub mod batch;
pub mod naming;
pub mod session;
pub mod types;
