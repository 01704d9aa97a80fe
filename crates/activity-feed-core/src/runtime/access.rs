// crates/activity-feed-core/src/runtime/access.rs
// ============================================================================
// Module: Access Filter
// Description: Per-recipient authorization under an impersonated identity.
// Purpose: Copy an activity only into feeds of users who may read it.
// Dependencies: crate::{core, interfaces, runtime::session}, thiserror
// ============================================================================

//! ## Overview
//! The filter impersonates the candidate recipient from the administrative
//! session and asks whether that recipient-scoped session holds the
//! configured privilege on the activity location.
//!
//! Invariants:
//! - The impersonated session is released before `authorize` returns, on
//!   every path including a failing privilege check.
//! - A refused impersonation is a denial for that recipient, never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::Privilege;
use crate::core::UserId;
use crate::interfaces::ContentSession;
use crate::interfaces::StoreError;
use crate::runtime::session::ScopedSession;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Why a recipient was not authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DenialReason {
    /// The recipient lacks the privilege on the activity location.
    MissingPrivilege,
    /// The recipient identity could not be impersonated.
    ImpersonationFailed(String),
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The recipient may receive the activity.
    Allowed,
    /// The recipient is skipped.
    Denied(DenialReason),
}

impl AccessDecision {
    /// Returns true for [`AccessDecision::Allowed`].
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Authorization failures that are neither allow nor deny.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The privilege check itself failed.
    #[error("privilege check for {user} failed: {source}")]
    PrivilegeCheck {
        /// Candidate recipient.
        user: String,
        /// Underlying store error.
        source: StoreError,
    },
}

// ============================================================================
// SECTION: Access Filter
// ============================================================================

/// Authorizes connection recipients against an activity location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessFilter {
    /// Privilege the recipient must hold.
    privilege: Privilege,
}

impl AccessFilter {
    /// Creates a filter checking `privilege`.
    #[must_use]
    pub const fn new(privilege: Privilege) -> Self {
        Self {
            privilege,
        }
    }

    /// Returns the privilege checked by this filter.
    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Decides whether `candidate` may receive the activity at `activity_path`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::PrivilegeCheck`] when the recipient-scoped
    /// privilege check fails.
    pub fn authorize<S: ContentSession>(
        &self,
        session: &S,
        candidate: &UserId,
        activity_path: &str,
    ) -> Result<AccessDecision, AccessError> {
        let scoped = match session.impersonate(candidate) {
            Ok(recipient_session) => ScopedSession::new(recipient_session),
            Err(err) => {
                return Ok(AccessDecision::Denied(DenialReason::ImpersonationFailed(
                    err.to_string(),
                )));
            }
        };
        let allowed = scoped.has_privilege(activity_path, self.privilege).map_err(|source| {
            AccessError::PrivilegeCheck {
                user: candidate.to_string(),
                source,
            }
        })?;
        scoped.release();
        if allowed {
            Ok(AccessDecision::Allowed)
        } else {
            Ok(AccessDecision::Denied(DenialReason::MissingPrivilege))
        }
    }
}
