// crates/activity-feed-broker/src/pump.rs
// ============================================================================
// Module: Event Pump
// Description: Channel-fed event loop driving a blocking event handler.
// Purpose: Deliver bus events to the dispatcher one at a time.
// Dependencies: activity-feed-core, tokio
// ============================================================================

//! ## Overview
//! [`EventPump`] owns a `tokio::sync::mpsc` channel and a worker task. Each
//! received event is handled on the blocking pool and awaited before the next
//! one is taken, so a single pump never runs two events concurrently. A panic
//! inside the handler is counted and does not stop the pump.
//! Invariants:
//! - Events are handled in submission order.
//! - `shutdown` returns only after every accepted event was handled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use activity_feed_core::ActivityEvent;
use activity_feed_core::EventHandler;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Event pump errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PumpError {
    /// The pump stopped accepting events.
    #[error("event pump closed")]
    Closed,
    /// The pump queue is full.
    #[error("event pump queue full")]
    Full,
    /// The worker task failed.
    #[error("event pump worker failed: {0}")]
    Worker(String),
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Totals reported when a pump shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Events handled to completion.
    pub handled: usize,
    /// Events whose handler panicked.
    pub panicked: usize,
}

// ============================================================================
// SECTION: Pump
// ============================================================================

/// Sender half of an [`EventPump`].
#[derive(Debug, Clone)]
pub struct EventSender {
    /// Channel into the pump worker.
    sender: mpsc::Sender<ActivityEvent>,
}

impl EventSender {
    /// Submits an event, waiting for queue capacity.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Closed`] when the pump has shut down.
    pub async fn submit(&self, event: ActivityEvent) -> Result<(), PumpError> {
        self.sender.send(event).await.map_err(|_| PumpError::Closed)
    }

    /// Submits an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Full`] or [`PumpError::Closed`].
    pub fn try_submit(&self, event: ActivityEvent) -> Result<(), PumpError> {
        self.sender.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PumpError::Full,
            mpsc::error::TrySendError::Closed(_) => PumpError::Closed,
        })
    }
}

/// Sequential event pump.
#[derive(Debug)]
pub struct EventPump {
    /// Sender kept by the pump itself; dropped on shutdown.
    sender: EventSender,
    /// Worker task draining the channel.
    worker: JoinHandle<PumpReport>,
}

impl EventPump {
    /// Starts a pump on the current Tokio runtime.
    ///
    /// A `capacity` of zero is raised to one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, matching [`tokio::spawn`].
    #[must_use]
    pub fn start<H>(handler: Arc<H>, capacity: usize) -> Self
    where
        H: EventHandler + ?Sized + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run(handler, receiver));
        Self {
            sender: EventSender {
                sender,
            },
            worker,
        }
    }

    /// Returns a sender for producers.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Submits an event, waiting for queue capacity.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Closed`] when the worker has stopped.
    pub async fn submit(&self, event: ActivityEvent) -> Result<(), PumpError> {
        self.sender.submit(event).await
    }

    /// Stops accepting events from this handle and waits for the queue to drain.
    ///
    /// Producers holding an [`EventSender`] keep the pump alive until they drop it.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Worker`] when the worker task failed.
    pub async fn shutdown(self) -> Result<PumpReport, PumpError> {
        let Self {
            sender,
            worker,
        } = self;
        drop(sender);
        worker.await.map_err(|err| PumpError::Worker(err.to_string()))
    }
}

/// Drains the channel, handling one event at a time.
async fn run<H>(handler: Arc<H>, mut receiver: mpsc::Receiver<ActivityEvent>) -> PumpReport
where
    H: EventHandler + ?Sized + 'static,
{
    let mut report = PumpReport::default();
    while let Some(event) = receiver.recv().await {
        let handler = Arc::clone(&handler);
        match tokio::task::spawn_blocking(move || handler.handle_event(&event)).await {
            Ok(()) => report.handled += 1,
            Err(_) => report.panicked += 1,
        }
    }
    report
}
