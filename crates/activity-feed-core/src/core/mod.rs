// crates/activity-feed-core/src/core/mod.rs
// ============================================================================
// Module: Activity Feed Core Types
// Description: Canonical data model and path sharding for activity fan-out.
// Purpose: Provide stable, serializable types shared by every crate in the workspace.
// Dependencies: serde, sha1, time
// ============================================================================

//! ## Overview
//! Core types define activity events and records, feed destinations, the
//! store layout conventions, the access model, and the pure path sharding
//! functions. Nothing in this module performs I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod access;
pub mod activity;
pub mod connections;
pub mod identifiers;
pub mod layout;
pub mod paths;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessRule;
pub use access::Principal;
pub use access::Privilege;
pub use access::resolve_access;
pub use activity::ACTIVITY_CREATED_TOPIC;
pub use activity::ACTIVITY_PATH_PROPERTY;
pub use activity::ActivityError;
pub use activity::ActivityEvent;
pub use activity::ActivityRecord;
pub use activity::Destination;
pub use activity::DestinationKind;
pub use activity::NodeProperties;
pub use connections::ConnectionState;
pub use identifiers::ADMIN_USER;
pub use identifiers::UserId;
pub use layout::ACTIVITY_FEED_NAME;
pub use layout::ACTIVITY_FEED_RESOURCE_TYPE;
pub use layout::ACTOR_PROPERTY;
pub use layout::FeedLayout;
pub use layout::PRIVATE_PREFIX;
pub use layout::RESOURCE_TYPE_PROPERTY;
pub use layout::SITE_RESOURCE_TYPE;
pub use layout::SOURCE_PROPERTY;
pub use paths::ROOT_PATH;
pub use paths::hashed_path;
pub use paths::identity_bucket;
pub use paths::normalize_path;
pub use paths::parent_path;
pub use paths::pool_bucket;
pub use paths::time_bucket;
