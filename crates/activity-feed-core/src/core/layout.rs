// crates/activity-feed-core/src/core/layout.rs
// ============================================================================
// Module: Activity Feed Layout
// Description: Well-known names and paths for feed containers.
// Purpose: Keep store layout conventions in one place for interop.
// Dependencies: serde, crate::core::{identifiers, paths}
// ============================================================================

//! ## Overview
//! [`FeedLayout`] holds the naming conventions that must match the store
//! layout exactly: the feed container name, the private namespace prefix, and
//! the property names stamped on feeds and delivered copies.
//!
//! Per-user feed roots are sharded through [`identity_bucket`], so the private
//! namespace never grows a single node with one child per user.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::UserId;
use crate::core::paths::hashed_path;
use crate::core::paths::identity_bucket;
use crate::core::paths::join_path;
use crate::core::paths::normalize_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the feed container below a site or a private namespace.
pub const ACTIVITY_FEED_NAME: &str = "activityFeed";
/// Prefix of every user's private namespace.
pub const PRIVATE_PREFIX: &str = "/_user/private";
/// Property carrying a node's resource type marker.
pub const RESOURCE_TYPE_PROPERTY: &str = "sling:resourceType";
/// Resource type marker stamped on newly created feed containers.
pub const ACTIVITY_FEED_RESOURCE_TYPE: &str = "sakai/activityFeed";
/// Resource type marker identifying site roots.
pub const SITE_RESOURCE_TYPE: &str = "sakai/site";
/// Activity property naming the acting user.
pub const ACTOR_PROPERTY: &str = "actor";
/// Property written on delivered copies pointing back at the original.
pub const SOURCE_PROPERTY: &str = "source";

// ============================================================================
// SECTION: Feed Layout
// ============================================================================

/// Store layout conventions for feed containers and delivered copies.
///
/// # Invariants
/// - `feed_name` is a single path segment.
/// - `private_prefix` is an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedLayout {
    /// Feed container name.
    pub feed_name: String,
    /// Private namespace prefix.
    pub private_prefix: String,
    /// Property holding the resource type marker.
    pub resource_type_property: String,
    /// Resource type marker for feed containers.
    pub feed_resource_type: String,
    /// Activity property naming the actor.
    pub actor_property: String,
    /// Back-reference property on delivered copies.
    pub source_property: String,
}

impl Default for FeedLayout {
    fn default() -> Self {
        Self {
            feed_name: ACTIVITY_FEED_NAME.to_string(),
            private_prefix: PRIVATE_PREFIX.to_string(),
            resource_type_property: RESOURCE_TYPE_PROPERTY.to_string(),
            feed_resource_type: ACTIVITY_FEED_RESOURCE_TYPE.to_string(),
            actor_property: ACTOR_PROPERTY.to_string(),
            source_property: SOURCE_PROPERTY.to_string(),
        }
    }
}

impl FeedLayout {
    /// Returns the feed root of a site: `site_path/feed_name`.
    #[must_use]
    pub fn site_feed_path(&self, site_path: &str) -> String {
        join_path(site_path, &self.feed_name)
    }

    /// Returns the root of a user's private namespace.
    #[must_use]
    pub fn private_path(&self, user: &UserId) -> String {
        normalize_path(&format!("{}{}", self.private_prefix, identity_bucket(user.as_str())))
    }

    /// Returns a user's private feed root.
    #[must_use]
    pub fn private_feed_path(&self, user: &UserId) -> String {
        join_path(&self.private_path(user), &self.feed_name)
    }

    /// Returns the sharded location of an activity copy below a feed root.
    #[must_use]
    pub fn delivery_path(&self, feed_root: &str, activity_name: &str) -> String {
        hashed_path(feed_root, activity_name, "")
    }
}
