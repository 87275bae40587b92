//! Grading-platform collaborator for the grader.
//!
//! Exposes the records the grader needs from the course platform
//! ([`Assignment`], [`Student`], [`SubmissionInfo`]), the [`GradingPlatform`]
//! seam used by the task pipeline, a Canvas REST implementation ([`CanvasClient`]) and the single
//! background roster fetch ([`spawn_roster_fetch`]) that keeps interactive
//! front ends responsive while assignments and students load.

pub mod client;
pub mod error;
pub mod platform;
pub mod roster;
pub mod types;

pub use client::CanvasClient;
pub use error::PlatformError;
pub use platform::GradingPlatform;
pub use roster::{RosterFetch, spawn_roster_fetch};
pub use types::{
    Assignment, CommentCounts, CourseQuery, PlatformRoster, Student, SubmissionComment,
    SubmissionInfo, SubmissionStatus,
};
