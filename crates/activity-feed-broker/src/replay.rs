// crates/activity-feed-broker/src/replay.rs
// ============================================================================
// Module: JSON-Lines Replay
// Description: Feeds recorded events to a handler from a line-oriented reader.
// Purpose: Rebuild feeds from an event log without a live bus.
// Dependencies: activity-feed-core, thiserror
// ============================================================================

//! ## Overview
//! Each non-blank line holds one JSON event. Lines that fail to decode are
//! reported with their 1-based line number and replay continues with the next
//! line. Only reader I/O failures abort a replay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;

use activity_feed_core::EventHandler;
use thiserror::Error;

use crate::event::EventDecodeError;
use crate::event::decode_event;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading the event log failed.
    #[error("replay io error at line {line}: {message}")]
    Io {
        /// Line being read when the error occurred.
        line: usize,
        /// Error description.
        message: String,
    },
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number.
    pub line: usize,
    /// Decode failure.
    pub error: EventDecodeError,
}

/// Totals for one replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Events passed to the handler.
    pub handled: usize,
    /// Blank lines skipped.
    pub blank: usize,
    /// Lines that failed to decode.
    pub rejected: Vec<RejectedLine>,
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// Replays every event in `reader` through `handler`, in order.
///
/// # Errors
///
/// Returns [`ReplayError::Io`] when the reader fails.
pub fn replay_events<R, H>(
    mut reader: R,
    handler: &H,
    max_event_bytes: usize,
) -> Result<ReplayReport, ReplayError>
where
    R: BufRead,
    H: EventHandler + ?Sized,
{
    let mut report = ReplayReport::default();
    let mut buffer = Vec::new();
    let mut line = 0_usize;
    loop {
        buffer.clear();
        line += 1;
        let read = reader.read_until(b'\n', &mut buffer).map_err(|err| ReplayError::Io {
            line,
            message: err.to_string(),
        })?;
        if read == 0 {
            break;
        }
        let trimmed = buffer.trim_ascii();
        if trimmed.is_empty() {
            report.blank += 1;
            continue;
        }
        match decode_event(trimmed, max_event_bytes) {
            Ok(event) => {
                handler.handle_event(&event);
                report.handled += 1;
            }
            Err(error) => report.rejected.push(RejectedLine {
                line,
                error,
            }),
        }
    }
    Ok(report)
}
