// crates/activity-feed-core/src/runtime/session.rs
// ============================================================================
// Module: Scoped Sessions
// Description: Drop guard that releases a content session exactly once.
// Purpose: Make session leaks impossible on early returns and unwinds.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`ScopedSession`] owns a [`ContentSession`] and logs it out when dropped.
//! Explicit release through [`ScopedSession::release`] is also supported; the
//! drop is then a no-op because `logout` is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Deref;
use std::ops::DerefMut;

use crate::interfaces::ContentSession;

// ============================================================================
// SECTION: Scoped Session
// ============================================================================

/// Session guard that logs out on drop.
#[derive(Debug)]
pub struct ScopedSession<S: ContentSession> {
    /// Owned session.
    session: S,
}

impl<S: ContentSession> ScopedSession<S> {
    /// Takes ownership of a session.
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self {
            session,
        }
    }

    /// Logs the session out now.
    pub fn release(mut self) {
        self.session.logout();
    }
}

impl<S: ContentSession> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<S: ContentSession> DerefMut for ScopedSession<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl<S: ContentSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        self.session.logout();
    }
}
