// crates/activity-feed-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Content Repository
// Description: Durable ContentRepository backend using SQLite WAL.
// Purpose: Persist activity feeds, access rules, and identities.
// Dependencies: activity-feed-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ContentRepository`] implementation
//! for the activity fan-out pipeline. Nodes are stored one row per path with
//! JSON properties, and copies of an activity subtree are written in a single
//! transaction. Storage inputs are untrusted and decoded fail-closed.
//!
//! [`ContentRepository`]: activity_feed_core::ContentRepository

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_PROPERTIES_BYTES;
pub use store::SqliteContentRepository;
pub use store::SqliteSession;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
