// crates/activity-feed-core/src/runtime/feed_store.rs
// ============================================================================
// Module: Feed Store Adapter
// Description: Feed container creation and activity copy delivery.
// Purpose: Place one sharded copy of an activity below a feed root.
// Dependencies: crate::{core, interfaces}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Delivery follows a fixed persistence order:
//! 1. Get or create the feed root; a new root is stamped with the feed
//!    resource type and saved before anything is created below it.
//! 2. Get or create the parent of the sharded delivery path, saving when new.
//! 3. Copy the activity subtree onto the delivery path.
//! 4. Stamp the copy with the source back-reference and save.
//!
//! Delivery is not idempotent: repeating it yields a second copy (or a
//! conflict, depending on the store's same-name sibling policy). Staged
//! changes of a failed delivery are discarded so the session stays usable
//! for the next destination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::ActivityRecord;
use crate::core::FeedLayout;
use crate::core::normalize_path;
use crate::core::parent_path;
use crate::interfaces::ContentSession;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A delivered activity copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredCopy {
    /// Path of the copy.
    pub path: String,
    /// Original activity location stamped on the copy.
    pub source: String,
}

/// Delivery failures, by stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The feed container could not be ensured.
    #[error("feed container {path} unavailable: {source}")]
    Container {
        /// Feed root path.
        path: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// The parent of the delivery path could not be ensured.
    #[error("delivery parent {path} unavailable: {source}")]
    Parent {
        /// Parent path.
        path: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// The activity copy failed.
    #[error("copy {from} -> {to} failed: {source}")]
    Copy {
        /// Activity location.
        from: String,
        /// Requested delivery path.
        to: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// The source back-reference could not be written.
    #[error("source stamp on {path} failed: {source}")]
    Stamp {
        /// Copy path.
        path: String,
        /// Underlying store error.
        source: StoreError,
    },
}

// ============================================================================
// SECTION: Feed Store
// ============================================================================

/// Delivers activity copies into feed containers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedStore {
    /// Feed naming conventions.
    layout: FeedLayout,
}

impl FeedStore {
    /// Creates an adapter for the given layout.
    #[must_use]
    pub const fn new(layout: FeedLayout) -> Self {
        Self {
            layout,
        }
    }

    /// Returns the layout used for markers and delivery paths.
    #[must_use]
    pub const fn layout(&self) -> &FeedLayout {
        &self.layout
    }

    /// Ensures a feed container exists at `root_path`; returns true when created.
    ///
    /// A new container is marked and saved immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the container cannot be created or saved.
    pub fn ensure_container<S: ContentSession>(
        &self,
        session: &mut S,
        root_path: &str,
    ) -> Result<bool, StoreError> {
        let (node, created) = session.get_or_create(root_path)?;
        if created {
            session.set_property(
                &node.path,
                &self.layout.resource_type_property,
                Value::String(self.layout.feed_resource_type.clone()),
            )?;
            session.save()?;
        }
        Ok(created)
    }

    /// Delivers one copy of `activity` below the feed rooted at `root_path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] naming the stage that failed. Staged changes
    /// are discarded before returning.
    pub fn deliver<S: ContentSession>(
        &self,
        session: &mut S,
        activity: &ActivityRecord,
        root_path: &str,
    ) -> Result<DeliveredCopy, DeliveryError> {
        let result = self.deliver_in_order(session, activity, root_path);
        if result.is_err() {
            session.refresh();
        }
        result
    }

    /// Runs the delivery steps without cleanup.
    fn deliver_in_order<S: ContentSession>(
        &self,
        session: &mut S,
        activity: &ActivityRecord,
        root_path: &str,
    ) -> Result<DeliveredCopy, DeliveryError> {
        let root_path = normalize_path(root_path);
        self.ensure_container(session, &root_path).map_err(|source| DeliveryError::Container {
            path: root_path.clone(),
            source,
        })?;

        let target = self.layout.delivery_path(&root_path, &activity.name());
        let parent = parent_path(&target);
        let ensure_parent = |session: &mut S| -> Result<(), StoreError> {
            let (_, created) = session.get_or_create(&parent)?;
            if created {
                session.save()?;
            }
            Ok(())
        };
        ensure_parent(session).map_err(|source| DeliveryError::Parent {
            path: parent.clone(),
            source,
        })?;

        let copy_path = session.copy(activity.path(), &target).map_err(|source| {
            DeliveryError::Copy {
                from: activity.path().to_string(),
                to: target.clone(),
                source,
            }
        })?;

        let stamp = |session: &mut S| -> Result<(), StoreError> {
            session.set_property(
                &copy_path,
                &self.layout.source_property,
                Value::String(activity.path().to_string()),
            )?;
            session.save()
        };
        stamp(session).map_err(|source| DeliveryError::Stamp {
            path: copy_path.clone(),
            source,
        })?;

        Ok(DeliveredCopy {
            path: copy_path,
            source: activity.path().to_string(),
        })
    }
}
