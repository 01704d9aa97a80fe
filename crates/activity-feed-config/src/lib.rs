// crates/activity-feed-config/src/lib.rs
// ============================================================================
// Module: Activity Feed Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for activity-feed.toml semantics.
// Dependencies: activity-feed-core, activity-feed-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `activity-feed-config` defines the configuration model for the activity
//! fan-out pipeline: feed naming, event intake limits, recipient privilege,
//! site detection, the content store backend, and the audit sink.
//!
//! Security posture: config inputs are untrusted and validated fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
