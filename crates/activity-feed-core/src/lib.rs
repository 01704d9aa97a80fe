// crates/activity-feed-core/src/lib.rs
// ============================================================================
// Module: Activity Feed Core Library
// Description: Public API surface for the activity fan-out core.
// Purpose: Expose core types, collaborator interfaces, and the runtime pipeline.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Activity feed core replicates one stored activity into the feeds of the
//! enclosing site and of the actor's accepted connections. Recipients are
//! authorized under their own identity and every copy lands on a sharded
//! path so feed containers never grow one oversized level.
//!
//! The core is backend-agnostic: the store, the site predicate, and the
//! connection graph are injected through [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BinarySource;
pub use interfaces::ConnectionGraph;
pub use interfaces::ContentRepository;
pub use interfaces::ContentSession;
pub use interfaces::EventHandler;
pub use interfaces::ExtractError;
pub use interfaces::GraphError;
pub use interfaces::SiblingPolicy;
pub use interfaces::SiteLookup;
pub use interfaces::StoreError;
pub use interfaces::StoreNode;
pub use interfaces::TextExtractor;
pub use interfaces::WorkQueue;
pub use interfaces::WorkQueueError;
pub use interfaces::WorkTask;
pub use runtime::AccessDecision;
pub use runtime::AccessFilter;
pub use runtime::ActivityDispatcher;
pub use runtime::DeliveryError;
pub use runtime::DenialReason;
pub use runtime::DestinationOutcome;
pub use runtime::FanoutAuditEvent;
pub use runtime::FanoutAuditKind;
pub use runtime::FanoutAuditSink;
pub use runtime::FanoutError;
pub use runtime::FanoutSettings;
pub use runtime::FanoutSummary;
pub use runtime::FeedStore;
pub use runtime::InMemoryConnectionGraph;
pub use runtime::InMemoryContentRepository;
pub use runtime::LazyTextField;
pub use runtime::RecipientResolver;
pub use runtime::ResourceTypeSiteLookup;
pub use runtime::ScopedSession;
