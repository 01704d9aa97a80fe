// crates/activity-feed-core/src/core/activity.rs
// ============================================================================
// Module: Activity Feed Records
// Description: Activity events, activity records, and feed destinations.
// Purpose: Model the inputs and fan-out targets of the dispatcher.
// Dependencies: serde, serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! An [`ActivityEvent`] names where an activity lives. The dispatcher loads
//! the node at that location and turns it into an [`ActivityRecord`], which
//! is only constructible with a non-empty actor. Recipient resolution then
//! expands the record into [`Destination`] values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::UserId;
use crate::core::layout::FeedLayout;
use crate::core::paths::last_element;
use crate::core::paths::normalize_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event property naming the activity's store location.
pub const ACTIVITY_PATH_PROPERTY: &str = "activityItemPath";
/// Topic carried by activity-created events.
pub const ACTIVITY_CREATED_TOPIC: &str = "activity/created";

/// Property map attached to store nodes and events.
pub type NodeProperties = BTreeMap<String, Value>;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Notification that an activity was stored.
///
/// # Invariants
/// - Only the activity path property is interpreted; other properties are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Event topic.
    #[serde(default)]
    pub topic: String,
    /// Event properties.
    #[serde(default)]
    pub properties: NodeProperties,
}

impl ActivityEvent {
    /// Creates an event with no properties.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            properties: NodeProperties::new(),
        }
    }

    /// Creates an activity-created event for the given store location.
    #[must_use]
    pub fn for_activity(path: impl Into<String>) -> Self {
        Self::new(ACTIVITY_CREATED_TOPIC).with_property(ACTIVITY_PATH_PROPERTY, path.into())
    }

    /// Adds a property and returns the event.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns a string property, if present.
    #[must_use]
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Activity Records
// ============================================================================

/// Errors raised when a stored node is not a valid activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivityError {
    /// The actor property is missing, not a string, or empty.
    #[error("activity at {path} has no actor")]
    MissingActor {
        /// Activity location.
        path: String,
    },
}

/// One stored activity, read-only to the fan-out pipeline.
///
/// # Invariants
/// - `actor_id` is never empty.
/// - `path` is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    /// Activity location.
    path: String,
    /// Acting user.
    actor_id: UserId,
    /// Back-reference, present on delivered copies only.
    source: Option<String>,
    /// All stored properties.
    properties: NodeProperties,
}

impl ActivityRecord {
    /// Creates an activity record from its location and actor.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityError::MissingActor`] when `actor_id` is empty.
    pub fn new(path: &str, actor_id: UserId) -> Result<Self, ActivityError> {
        let path = normalize_path(path);
        if actor_id.is_empty() {
            return Err(ActivityError::MissingActor {
                path,
            });
        }
        Ok(Self {
            path,
            actor_id,
            source: None,
            properties: NodeProperties::new(),
        })
    }

    /// Builds a record from stored node properties using the layout's property names.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityError::MissingActor`] when the actor property is absent or empty.
    pub fn from_properties(
        path: &str,
        properties: NodeProperties,
        layout: &FeedLayout,
    ) -> Result<Self, ActivityError> {
        let actor = properties
            .get(&layout.actor_property)
            .and_then(Value::as_str)
            .map(UserId::new)
            .unwrap_or_else(|| UserId::new(""));
        let source =
            properties.get(&layout.source_property).and_then(Value::as_str).map(str::to_string);
        let mut record = Self::new(path, actor)?;
        record.source = source;
        record.properties = properties;
        Ok(record)
    }

    /// Returns the activity location.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the short name of the activity (last path segment).
    #[must_use]
    pub fn name(&self) -> String {
        last_element(&self.path)
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn actor_id(&self) -> &UserId {
        &self.actor_id
    }

    /// Returns the back-reference when this record is a delivered copy.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the stored properties.
    #[must_use]
    pub const fn properties(&self) -> &NodeProperties {
        &self.properties
    }
}

// ============================================================================
// SECTION: Destinations
// ============================================================================

/// Why a feed root was chosen as a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestinationKind {
    /// The site enclosing the activity.
    Site {
        /// Site root path.
        site_path: String,
    },
    /// An accepted connection of the actor.
    Connection {
        /// Connected user.
        user_id: UserId,
    },
}

/// Feed root that should receive a copy of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Destination kind.
    pub kind: DestinationKind,
    /// Feed container root path.
    pub root_path: String,
}

impl Destination {
    /// Creates a site destination.
    #[must_use]
    pub fn site(site_path: impl Into<String>, root_path: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::Site {
                site_path: site_path.into(),
            },
            root_path: root_path.into(),
        }
    }

    /// Creates a connection destination.
    #[must_use]
    pub fn connection(user_id: UserId, root_path: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::Connection {
                user_id,
            },
            root_path: root_path.into(),
        }
    }

    /// Returns the recipient user for connection destinations.
    #[must_use]
    pub const fn recipient(&self) -> Option<&UserId> {
        match &self.kind {
            DestinationKind::Site {
                ..
            } => None,
            DestinationKind::Connection {
                user_id,
            } => Some(user_id),
        }
    }

    /// Returns true for site destinations.
    #[must_use]
    pub const fn is_site(&self) -> bool {
        matches!(self.kind, DestinationKind::Site { .. })
    }
}
