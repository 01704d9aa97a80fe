// crates/activity-feed-broker/src/queue.rs
// ============================================================================
// Module: Tokio Work Queue
// Description: WorkQueue backed by the Tokio blocking pool.
// Purpose: Run lazy text extraction off the caller's thread.
// Dependencies: activity-feed-core, tokio
// ============================================================================

//! ## Overview
//! [`TokioWorkQueue`] hands each task to `spawn_blocking` on a captured
//! runtime handle. Tasks are fire-and-forget; a task cancelled by runtime
//! shutdown is dropped without running, which lazy fields already tolerate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use activity_feed_core::WorkQueue;
use activity_feed_core::WorkQueueError;
use activity_feed_core::WorkTask;
use tokio::runtime::Handle;

// ============================================================================
// SECTION: Queue
// ============================================================================

/// Work queue that runs tasks on the Tokio blocking pool.
#[derive(Debug, Clone)]
pub struct TokioWorkQueue {
    /// Runtime the tasks are spawned onto.
    handle: Handle,
}

impl TokioWorkQueue {
    /// Creates a queue bound to `handle`.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
        }
    }

    /// Creates a queue bound to the runtime of the calling task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkQueueError::Rejected`] outside a Tokio runtime.
    pub fn current() -> Result<Self, WorkQueueError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| WorkQueueError::Rejected(err.to_string()))
    }
}

impl WorkQueue for TokioWorkQueue {
    fn execute(&self, task: WorkTask) -> Result<(), WorkQueueError> {
        drop(self.handle.spawn_blocking(task));
        Ok(())
    }
}
