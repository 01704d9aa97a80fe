// crates/activity-feed-broker/src/event.rs
// ============================================================================
// Module: Event Decoding
// Description: Bounded JSON decoding of activity events.
// Purpose: Turn untrusted bus payloads into core activity events.
// Dependencies: activity-feed-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Events arrive as JSON objects `{ "topic": ..., "properties": { ... } }`.
//! Payloads above the configured byte cap are rejected before parsing, and
//! unknown top-level fields are ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use activity_feed_core::ActivityEvent;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum encoded event size in bytes.
pub const DEFAULT_MAX_EVENT_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Event decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    /// Payload exceeded the byte cap.
    #[error("event payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
    /// Payload was not a JSON object.
    #[error("event payload must be a json object")]
    NotAnObject,
    /// Payload did not match the event shape.
    #[error("malformed event payload: {0}")]
    Malformed(String),
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes one event from `bytes`.
///
/// # Errors
///
/// Returns [`EventDecodeError`] when the payload is oversized, not a JSON
/// object, or has ill-typed `topic`/`properties` fields.
pub fn decode_event(bytes: &[u8], max_bytes: usize) -> Result<ActivityEvent, EventDecodeError> {
    if bytes.len() > max_bytes {
        return Err(EventDecodeError::TooLarge {
            max_bytes,
            actual_bytes: bytes.len(),
        });
    }
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| EventDecodeError::Malformed(err.to_string()))?;
    if !value.is_object() {
        return Err(EventDecodeError::NotAnObject);
    }
    serde_json::from_value(value).map_err(|err| EventDecodeError::Malformed(err.to_string()))
}
