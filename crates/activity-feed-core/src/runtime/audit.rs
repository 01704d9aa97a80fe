// crates/activity-feed-core/src/runtime/audit.rs
// ============================================================================
// Module: Fan-Out Audit Logging
// Description: Structured audit events for activity fan-out.
// Purpose: Emit JSON-lines records for every logged fan-out transition.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The dispatcher never reports partial failure to its caller. Instead every
//! rejected event, absorbed lookup failure, and per-destination outcome is
//! written to a [`FanoutAuditSink`]. Sinks are plain trait objects so hosts
//! can route records to their own logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Classification of a fan-out audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutAuditKind {
    /// The event was dropped before any delivery was attempted.
    EventRejected,
    /// The activity was loaded and its destinations computed.
    ActivityResolved,
    /// The site ancestor walk failed; no site destination was used.
    SiteLookupFailed,
    /// The connection graph failed; no connection destinations were used.
    ConnectionsLookupFailed,
    /// A copy was delivered.
    DestinationDelivered,
    /// A connection recipient was not authorized.
    DestinationDenied,
    /// Delivery to one destination failed.
    DestinationFailed,
    /// Processing of the event finished.
    FanoutCompleted,
}

/// Fan-out audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanoutAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Record classification.
    pub kind: FanoutAuditKind,
    /// Activity location when known.
    pub activity_path: Option<String>,
    /// Destination feed root when the record concerns one destination.
    pub destination: Option<String>,
    /// Recipient user for connection destinations.
    pub recipient: Option<String>,
    /// Free-form detail (error text, counts, delivered path).
    pub detail: Option<String>,
}

impl FanoutAuditEvent {
    /// Creates a record of the given kind with a consistent timestamp.
    #[must_use]
    pub fn new(kind: FanoutAuditKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "activity_fanout",
            timestamp_ms,
            kind,
            activity_path: None,
            destination: None,
            recipient: None,
            detail: None,
        }
    }

    /// Sets the activity location.
    #[must_use]
    pub fn activity(mut self, path: impl Into<String>) -> Self {
        self.activity_path = Some(path.into());
        self
    }

    /// Sets the destination feed root.
    #[must_use]
    pub fn destination(mut self, root_path: impl Into<String>) -> Self {
        self.destination = Some(root_path.into());
        self
    }

    /// Sets the recipient user.
    #[must_use]
    pub fn recipient(mut self, user: impl Into<String>) -> Self {
        self.recipient = Some(user.into());
        self
    }

    /// Sets the detail text.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for fan-out records.
pub trait FanoutAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &FanoutAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl FanoutAuditSink for StderrAuditSink {
    fn record(&self, event: &FanoutAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl FanoutAuditSink for FileAuditSink {
    fn record(&self, event: &FanoutAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl FanoutAuditSink for NoopAuditSink {
    fn record(&self, _event: &FanoutAuditEvent) {}
}

/// Audit sink that keeps records in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Captured records in emission order.
    events: Mutex<Vec<FanoutAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every captured record.
    #[must_use]
    pub fn events(&self) -> Vec<FanoutAuditEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the captured records of one kind.
    #[must_use]
    pub fn events_of(&self, kind: FanoutAuditKind) -> Vec<FanoutAuditEvent> {
        self.events().into_iter().filter(|event| event.kind == kind).collect()
    }
}

impl FanoutAuditSink for MemoryAuditSink {
    fn record(&self, event: &FanoutAuditEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    }
}
