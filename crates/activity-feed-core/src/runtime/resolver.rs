// crates/activity-feed-core/src/runtime/resolver.rs
// ============================================================================
// Module: Recipient Resolver
// Description: Expands one activity into its feed destinations.
// Purpose: Walk the site ancestry and the connection graph independently.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! Resolution has two independent branches:
//! - Site branch: the activity node and its ancestors are tested against the
//!   [`SiteLookup`] until a site is found. The store root is never tested.
//! - Connection branch: every accepted connection of the actor yields one
//!   destination rooted at that user's private feed.
//!
//! A failure in one branch does not suppress the other; failures are
//! reported alongside the destinations and never abort resolution.
//! Destinations are not deduplicated across branches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ActivityRecord;
use crate::core::Destination;
use crate::core::FeedLayout;
use crate::core::ROOT_PATH;
use crate::core::UserId;
use crate::core::paths::ancestors;
use crate::interfaces::ConnectionGraph;
use crate::interfaces::ContentSession;
use crate::interfaces::GraphError;
use crate::interfaces::SiteLookup;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Absorbed failure of one resolution branch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Loading a node during the site ancestor walk failed.
    #[error("site lookup failed: {0}")]
    SiteLookup(StoreError),
    /// The connection graph could not be queried.
    #[error("connection lookup failed: {0}")]
    Connections(GraphError),
}

/// Destinations for one activity plus any branch failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Destinations in delivery order: site first, then connections in graph order.
    pub destinations: Vec<Destination>,
    /// Branch failures that were absorbed.
    pub failures: Vec<ResolutionError>,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Computes feed destinations for activities.
pub struct RecipientResolver<L, G> {
    /// Site predicate.
    sites: L,
    /// Social connection graph.
    connections: G,
    /// Feed naming conventions.
    layout: FeedLayout,
}

impl<L, G> RecipientResolver<L, G>
where
    L: SiteLookup,
    G: ConnectionGraph,
{
    /// Creates a resolver from explicit collaborators.
    #[must_use]
    pub const fn new(sites: L, connections: G, layout: FeedLayout) -> Self {
        Self {
            sites,
            connections,
            layout,
        }
    }

    /// Returns the feed layout used to derive destination roots.
    #[must_use]
    pub const fn layout(&self) -> &FeedLayout {
        &self.layout
    }

    /// Returns the site lookup collaborator.
    #[must_use]
    pub const fn sites(&self) -> &L {
        &self.sites
    }

    /// Returns the connection graph collaborator.
    #[must_use]
    pub const fn connections(&self) -> &G {
        &self.connections
    }

    /// Resolves every destination of `activity`.
    pub fn resolve<S: ContentSession>(&self, session: &S, activity: &ActivityRecord) -> Resolution {
        let mut resolution = Resolution::default();
        match self.find_site(session, activity.path()) {
            Ok(Some(site_path)) => {
                let root = self.layout.site_feed_path(&site_path);
                resolution.destinations.push(Destination::site(site_path, root));
            }
            Ok(None) => {}
            Err(err) => resolution.failures.push(ResolutionError::SiteLookup(err)),
        }
        match self.connection_destinations(activity.actor_id()) {
            Ok(mut destinations) => resolution.destinations.append(&mut destinations),
            Err(err) => resolution.failures.push(ResolutionError::Connections(err)),
        }
        resolution
    }

    /// Returns the nearest site enclosing `path` (inclusive), excluding the store root.
    ///
    /// Missing nodes along the walk are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a node load fails.
    pub fn find_site<S: ContentSession>(
        &self,
        session: &S,
        path: &str,
    ) -> Result<Option<String>, StoreError> {
        for candidate in ancestors(path) {
            if candidate == ROOT_PATH {
                break;
            }
            if let Some(node) = session.load(&candidate)?
                && self.sites.is_site(&node)
            {
                return Ok(Some(node.path));
            }
        }
        Ok(None)
    }

    /// Returns one private feed destination per accepted connection of `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the graph cannot be queried.
    pub fn connection_destinations(&self, actor: &UserId) -> Result<Vec<Destination>, GraphError> {
        let connections = self.connections.accepted_connections(actor)?;
        Ok(connections
            .into_iter()
            .map(|user| {
                let root = self.layout.private_feed_path(&user);
                Destination::connection(user, root)
            })
            .collect())
    }
}
