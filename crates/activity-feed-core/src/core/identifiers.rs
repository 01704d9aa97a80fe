// crates/activity-feed-core/src/core/identifiers.rs
// ============================================================================
// Module: Activity Feed Identifiers
// Description: Opaque identity types shared by the fan-out pipeline.
// Purpose: Keep user identities strongly typed across collaborator seams.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identities are opaque UTF-8 strings. No normalization is applied; the
//! sharder decides how an identity maps onto a store path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identity used by administrative sessions.
pub const ADMIN_USER: &str = "admin";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// User identifier known to the content repository and the connection graph.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the administrative identity.
    #[must_use]
    pub fn admin() -> Self {
        Self::new(ADMIN_USER)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when this is the administrative identity.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_USER
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
