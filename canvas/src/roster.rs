//! Background roster fetch.
//!
//! Loading assignments and students is the only slow network step before a
//! grader can pick a student, so it runs as one spawned task. The task reports
//! exactly once through [`RosterFetch::join`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::PlatformError;
use crate::platform::GradingPlatform;
use crate::types::{CourseQuery, PlatformRoster};

/// Handle to an in-flight roster fetch.
#[derive(Debug)]
pub struct RosterFetch {
    handle: JoinHandle<Result<PlatformRoster, PlatformError>>,
}

/// Spawn the fetch on the current tokio runtime.
pub fn spawn_roster_fetch(platform: Arc<dyn GradingPlatform>, query: CourseQuery) -> RosterFetch {
    let handle = tokio::spawn(async move {
        debug!(course_id = query.course_id, "fetching assignments and students");
        let assignments = platform.list_assignments(&query).await?;
        let students = platform.list_students(&query).await?;
        Ok(PlatformRoster {
            assignments,
            students,
        })
    });
    RosterFetch { handle }
}

impl RosterFetch {
    /// Abort the fetch. A later [`RosterFetch::join`] yields [`PlatformError::Cancelled`].
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the single result of the fetch.
    pub async fn join(self) -> Result<PlatformRoster, PlatformError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(PlatformError::Cancelled),
            Err(err) => Err(PlatformError::Worker(err.to_string())),
        }
    }
}
