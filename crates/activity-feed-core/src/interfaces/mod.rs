// crates/activity-feed-core/src/interfaces/mod.rs
// ============================================================================
// Module: Activity Feed Interfaces
// Description: Backend-agnostic collaborator contracts for the fan-out pipeline.
// Purpose: Define the store, graph, site, event, and work queue seams.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The fan-out pipeline never talks to a concrete backend. It is handed a
//! [`ContentRepository`], a [`SiteLookup`], and a [`ConnectionGraph`] at
//! construction time and drives them through the contracts below.
//!
//! Sessions are scoped resources. Callers own the obligation to call
//! [`ContentSession::logout`] exactly once on every exit path; the runtime
//! discharges it with [`crate::runtime::ScopedSession`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Read;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::ActivityEvent;
use crate::core::NodeProperties;
use crate::core::Privilege;
use crate::core::UserId;
use crate::core::paths::last_element;

// ============================================================================
// SECTION: Store Nodes
// ============================================================================

/// Snapshot of a store node as seen by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreNode {
    /// Normalized node path.
    pub path: String,
    /// Node properties.
    pub properties: NodeProperties,
}

impl StoreNode {
    /// Creates a node snapshot.
    #[must_use]
    pub fn new(path: impl Into<String>, properties: NodeProperties) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    /// Returns the node name (last path segment).
    #[must_use]
    pub fn name(&self) -> String {
        last_element(&self.path)
    }

    /// Returns a string property, if present.
    #[must_use]
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// How a store handles a copy onto an occupied path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPolicy {
    /// Create a same-name sibling (`name[2]`, `name[3]`, ...).
    #[default]
    Disambiguate,
    /// Fail with [`StoreError::Conflict`].
    Reject,
}

/// Returns the path of the `index`-th same-name sibling of `path`.
#[must_use]
pub fn same_name_sibling(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

// ============================================================================
// SECTION: Content Repository
// ============================================================================

/// Content repository errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A required node does not exist.
    #[error("store node not found: {0}")]
    NotFound(String),
    /// The target path is already occupied.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// The session lacks the privilege for the operation.
    #[error("store access denied: {0}")]
    AccessDenied(String),
    /// The identity cannot be impersonated (unknown or disabled).
    #[error("impersonation refused: {0}")]
    Impersonation(String),
    /// The session was already logged out.
    #[error("store session is closed")]
    SessionClosed,
    /// Backend I/O failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Backend reported invalid data.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Backend-specific failure.
    #[error("store error: {0}")]
    Store(String),
}

/// Entry point into a hierarchical content store.
pub trait ContentRepository: Send + Sync {
    /// Session type produced by this repository.
    type Session: ContentSession;

    /// Opens a session holding every privilege.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot open a session.
    fn login_administrative(&self) -> Result<Self::Session, StoreError>;
}

/// A session against a content repository.
///
/// Changes made through [`ContentSession::get_or_create`] and
/// [`ContentSession::set_property`] are staged until [`ContentSession::save`].
/// [`ContentSession::copy`] operates on persisted state and takes effect
/// immediately.
pub trait ContentSession: Sized {
    /// Returns the identity the session acts as.
    fn user_id(&self) -> &UserId;

    /// Returns false once the session has been logged out.
    fn is_live(&self) -> bool;

    /// Loads a node, including staged changes; `None` when absent or unreadable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn load(&self, path: &str) -> Result<Option<StoreNode>, StoreError>;

    /// Returns the node at `path`, staging it and any missing ancestors when absent.
    ///
    /// The flag is true when the node at `path` was created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails or the session may not write.
    fn get_or_create(&mut self, path: &str) -> Result<(StoreNode, bool), StoreError>;

    /// Copies the persisted subtree at `source` to `destination`.
    ///
    /// Returns the path actually created, which differs from `destination` when
    /// the store disambiguates same-name siblings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the destination is occupied and the
    /// store rejects same-name siblings, or [`StoreError::NotFound`] when the
    /// source or the destination parent is not persisted.
    fn copy(&mut self, source: &str, destination: &str) -> Result<String, StoreError>;

    /// Stages a property value on an existing node.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the node does not exist.
    fn set_property(&mut self, path: &str, key: &str, value: Value) -> Result<(), StoreError>;

    /// Persists every staged change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails; staged changes are kept.
    fn save(&mut self) -> Result<(), StoreError>;

    /// Discards every staged change.
    fn refresh(&mut self);

    /// Opens a session scoped to another identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Impersonation`] for unknown or disabled identities.
    fn impersonate(&self, user: &UserId) -> Result<Self, StoreError>;

    /// Returns true when this session holds `privilege` on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the check cannot be evaluated.
    fn has_privilege(&self, path: &str, privilege: Privilege) -> Result<bool, StoreError>;

    /// Releases the session. Calling it on a closed session is a no-op.
    fn logout(&mut self);
}

// ============================================================================
// SECTION: Site Lookup
// ============================================================================

/// Decides whether a store node is a site root.
pub trait SiteLookup: Send + Sync {
    /// Returns true when `node` is a site root.
    fn is_site(&self, node: &StoreNode) -> bool;
}

// ============================================================================
// SECTION: Connection Graph
// ============================================================================

/// Connection graph errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The graph backend could not be queried.
    #[error("connection graph unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the social connection graph.
pub trait ConnectionGraph: Send + Sync {
    /// Returns the users connected to `user` in the accepted state, in graph order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the graph cannot be queried.
    fn accepted_connections(&self, user: &UserId) -> Result<Vec<UserId>, GraphError>;
}

// ============================================================================
// SECTION: Event Handling
// ============================================================================

/// Consumer of activity events delivered by an event bus.
///
/// Handlers are fire-and-forget: failures are absorbed and logged by the
/// handler, never reported back to the bus.
pub trait EventHandler: Send + Sync {
    /// Handles one event to completion.
    fn handle_event(&self, event: &ActivityEvent);
}

// ============================================================================
// SECTION: Work Queue
// ============================================================================

/// Unit of work submitted to a [`WorkQueue`].
pub type WorkTask = Box<dyn FnOnce() + Send + 'static>;

/// Work queue errors.
#[derive(Debug, Error)]
pub enum WorkQueueError {
    /// The queue refused the task; the task has been dropped.
    #[error("work queue rejected task: {0}")]
    Rejected(String),
}

/// Executes tasks on workers owned by the host.
pub trait WorkQueue: Send + Sync {
    /// Submits a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`WorkQueueError::Rejected`] when the task cannot be scheduled.
    fn execute(&self, task: WorkTask) -> Result<(), WorkQueueError>;
}

// ============================================================================
// SECTION: Text Extraction
// ============================================================================

/// Text extraction errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading the binary content failed.
    #[error("extraction io error: {0}")]
    Io(#[from] io::Error),
    /// The extractor does not understand the content.
    #[error("unsupported content: {0}")]
    Unsupported(String),
}

/// Binary value consumed by a text extraction task.
pub trait BinarySource: Send {
    /// Opens a reader over the binary content.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the content is unreadable.
    fn open(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Short description used in failure reports.
    fn describe(&self) -> String;

    /// Releases the underlying resource.
    fn discard(&mut self);
}

/// Extracts plain text from binary content.
pub trait TextExtractor: Send + Sync {
    /// Extracts text from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when extraction fails.
    fn extract(&self, reader: &mut dyn Read) -> Result<String, ExtractError>;
}
