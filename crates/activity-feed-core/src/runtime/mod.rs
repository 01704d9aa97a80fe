// crates/activity-feed-core/src/runtime/mod.rs
// ============================================================================
// Module: Activity Feed Runtime
// Description: Fan-out pipeline, lazy extraction, and reference collaborators.
// Purpose: Execute activity fan-out against explicit collaborators.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement recipient resolution, per-recipient
//! authorization, feed delivery, and the dispatcher state machine that ties
//! them together. The lazy extracted field and in-memory collaborators live
//! here as well.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod access;
pub mod audit;
pub mod dispatcher;
pub mod feed_store;
pub mod lazy;
pub mod resolver;
pub mod session;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessDecision;
pub use access::AccessError;
pub use access::AccessFilter;
pub use access::DenialReason;
pub use audit::FanoutAuditEvent;
pub use audit::FanoutAuditKind;
pub use audit::FanoutAuditSink;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use dispatcher::ActivityDispatcher;
pub use dispatcher::DestinationOutcome;
pub use dispatcher::DestinationReport;
pub use dispatcher::FanoutError;
pub use dispatcher::FanoutSettings;
pub use dispatcher::FanoutStage;
pub use dispatcher::FanoutSummary;
pub use feed_store::DeliveredCopy;
pub use feed_store::DeliveryError;
pub use feed_store::FeedStore;
pub use lazy::InMemoryBinarySource;
pub use lazy::InlineWorkQueue;
pub use lazy::LazyTextField;
pub use lazy::ThreadWorkQueue;
pub use lazy::Utf8TextExtractor;
pub use resolver::RecipientResolver;
pub use resolver::Resolution;
pub use resolver::ResolutionError;
pub use session::ScopedSession;
pub use store::InMemoryConnectionGraph;
pub use store::InMemoryContentRepository;
pub use store::InMemorySession;
pub use store::ResourceTypeSiteLookup;
