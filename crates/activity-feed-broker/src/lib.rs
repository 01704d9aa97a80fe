// crates/activity-feed-broker/src/lib.rs
// ============================================================================
// Module: Activity Feed Broker Library
// Description: Event-bus plumbing for the activity fan-out pipeline.
// Purpose: Decode bus events and drive an event handler from them.
// Dependencies: activity-feed-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! The broker decodes JSON events with a byte cap, pumps them through a
//! Tokio channel into an [`EventHandler`] one at a time, replays recorded
//! JSON-lines logs, and offers a Tokio-backed [`WorkQueue`] for lazy text
//! extraction.
//!
//! [`EventHandler`]: activity_feed_core::EventHandler
//! [`WorkQueue`]: activity_feed_core::WorkQueue

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod event;
pub mod pump;
pub mod queue;
pub mod replay;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use event::DEFAULT_MAX_EVENT_BYTES;
pub use event::EventDecodeError;
pub use event::decode_event;
pub use pump::EventPump;
pub use pump::EventSender;
pub use pump::PumpError;
pub use pump::PumpReport;
pub use queue::TokioWorkQueue;
pub use replay::RejectedLine;
pub use replay::ReplayError;
pub use replay::ReplayReport;
pub use replay::replay_events;
