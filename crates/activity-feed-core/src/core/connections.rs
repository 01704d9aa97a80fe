// crates/activity-feed-core/src/core/connections.rs
// ============================================================================
// Module: Activity Feed Connection States
// Description: Lifecycle states of an edge in the social connection graph.
// Purpose: Name the states so only accepted edges participate in fan-out.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A connection edge moves through invitation states. Fan-out only follows
//! edges in [`ConnectionState::Accepted`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Connection State
// ============================================================================

/// State of a directed connection edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// The owner asked the other party to connect.
    Requested,
    /// The other party asked the owner to connect.
    Pending,
    /// Both parties agreed.
    Accepted,
    /// The invitation was declined.
    Rejected,
    /// The invitation was ignored.
    Ignored,
    /// The owner blocked the other party.
    Blocked,
}

impl ConnectionState {
    /// Returns true when activities should flow across the edge.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}
