// crates/activity-feed-core/src/runtime/store.rs
// ============================================================================
// Module: Activity Feed In-Memory Store
// Description: In-memory content repository, connection graph, and site lookup.
// Purpose: Provide deterministic collaborators for tests and local demos.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`ContentRepository`],
//! [`ConnectionGraph`], and [`SiteLookup`]. They follow the same contracts as
//! durable backends, including staged writes, same-name sibling handling,
//! and access rule evaluation. They are not intended for production use.
//!
//! The repository counts live sessions so tests can assert that every
//! administrative and impersonated session was released.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;

use crate::core::AccessRule;
use crate::core::ConnectionState;
use crate::core::NodeProperties;
use crate::core::Principal;
use crate::core::Privilege;
use crate::core::RESOURCE_TYPE_PROPERTY;
use crate::core::ROOT_PATH;
use crate::core::SITE_RESOURCE_TYPE;
use crate::core::UserId;
use crate::core::normalize_path;
use crate::core::parent_path;
use crate::core::paths::ancestors;
use crate::core::paths::is_descendant_or_self;
use crate::core::resolve_access;
use crate::interfaces::ConnectionGraph;
use crate::interfaces::ContentRepository;
use crate::interfaces::ContentSession;
use crate::interfaces::GraphError;
use crate::interfaces::SiblingPolicy;
use crate::interfaces::SiteLookup;
use crate::interfaces::StoreError;
use crate::interfaces::StoreNode;
use crate::interfaces::same_name_sibling;

// ============================================================================
// SECTION: Repository State
// ============================================================================

/// Mutable repository state shared by every session.
#[derive(Debug)]
struct RepositoryState {
    /// Persisted nodes keyed by normalized path.
    nodes: BTreeMap<String, NodeProperties>,
    /// Access rules keyed by normalized path.
    rules: BTreeMap<String, Vec<AccessRule>>,
    /// Known identities and whether they are enabled.
    identities: BTreeMap<UserId, bool>,
    /// Number of sessions not yet logged out.
    open_sessions: usize,
    /// Copies into these subtrees fail with an I/O error.
    failing_copy_prefixes: Vec<String>,
    /// Privilege checks for these users fail.
    failing_privilege_users: BTreeSet<UserId>,
}

impl Default for RepositoryState {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_PATH.to_string(), NodeProperties::new());
        Self {
            nodes,
            rules: BTreeMap::new(),
            identities: BTreeMap::new(),
            open_sessions: 0,
            failing_copy_prefixes: Vec::new(),
            failing_privilege_users: BTreeSet::new(),
        }
    }
}

/// Locks shared state, mapping poisoning to a store error.
fn lock_state(state: &Mutex<RepositoryState>) -> Result<MutexGuard<'_, RepositoryState>, StoreError> {
    state.lock().map_err(|_| StoreError::Store("content repository mutex poisoned".to_string()))
}

// ============================================================================
// SECTION: In-Memory Repository
// ============================================================================

/// In-memory content repository for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryContentRepository {
    /// Shared state protected by a mutex.
    state: Arc<Mutex<RepositoryState>>,
    /// Copy collision handling.
    sibling_policy: SiblingPolicy,
}

impl InMemoryContentRepository {
    /// Creates an empty repository containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the same-name sibling policy.
    #[must_use]
    pub const fn with_sibling_policy(mut self, policy: SiblingPolicy) -> Self {
        self.sibling_policy = policy;
        self
    }

    /// Registers an enabled identity that may be impersonated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn register_identity(&self, user: &UserId) -> Result<(), StoreError> {
        lock_state(&self.state)?.identities.insert(user.clone(), true);
        Ok(())
    }

    /// Disables an identity; impersonating it then fails.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn disable_identity(&self, user: &UserId) -> Result<(), StoreError> {
        lock_state(&self.state)?.identities.insert(user.clone(), false);
        Ok(())
    }

    /// Persists a node and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn put_node(&self, path: &str, properties: NodeProperties) -> Result<(), StoreError> {
        let path = normalize_path(path);
        let mut state = lock_state(&self.state)?;
        for ancestor in ancestors(&parent_path(&path)) {
            state.nodes.entry(ancestor).or_default();
        }
        state.nodes.insert(path, properties);
        Ok(())
    }

    /// Attaches an access rule to a path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn add_rule(&self, path: &str, rule: AccessRule) -> Result<(), StoreError> {
        lock_state(&self.state)?.rules.entry(normalize_path(path)).or_default().push(rule);
        Ok(())
    }

    /// Grants `privilege` on `path` to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn grant(
        &self,
        path: &str,
        principal: Principal,
        privilege: Privilege,
    ) -> Result<(), StoreError> {
        self.add_rule(path, AccessRule::allow(principal, privilege))
    }

    /// Denies `privilege` on `path` to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn deny(
        &self,
        path: &str,
        principal: Principal,
        privilege: Privilege,
    ) -> Result<(), StoreError> {
        self.add_rule(path, AccessRule::deny(principal, privilege))
    }

    /// Makes every copy into the subtree at `prefix` fail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn fail_copies_under(&self, prefix: &str) -> Result<(), StoreError> {
        lock_state(&self.state)?.failing_copy_prefixes.push(normalize_path(prefix));
        Ok(())
    }

    /// Makes every privilege check performed as `user` fail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn fail_privilege_checks_for(&self, user: &UserId) -> Result<(), StoreError> {
        lock_state(&self.state)?.failing_privilege_users.insert(user.clone());
        Ok(())
    }

    /// Returns the persisted node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn node(&self, path: &str) -> Result<Option<StoreNode>, StoreError> {
        let path = normalize_path(path);
        let state = lock_state(&self.state)?;
        Ok(state.nodes.get(&path).map(|properties| StoreNode::new(path.clone(), properties.clone())))
    }

    /// Returns the paths of the persisted direct children of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let path = normalize_path(path);
        let state = lock_state(&self.state)?;
        Ok(state
            .nodes
            .keys()
            .filter(|candidate| **candidate != path && parent_path(candidate) == path)
            .cloned()
            .collect())
    }

    /// Returns the number of sessions not yet logged out.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state lock is poisoned.
    pub fn open_sessions(&self) -> Result<usize, StoreError> {
        Ok(lock_state(&self.state)?.open_sessions)
    }

    /// Opens a session for `user`, counting it as live.
    fn open_session(&self, user: UserId) -> Result<InMemorySession, StoreError> {
        lock_state(&self.state)?.open_sessions += 1;
        Ok(InMemorySession {
            state: Arc::clone(&self.state),
            user,
            staged: BTreeMap::new(),
            sibling_policy: self.sibling_policy,
            live: true,
        })
    }
}

impl ContentRepository for InMemoryContentRepository {
    type Session = InMemorySession;

    fn login_administrative(&self) -> Result<Self::Session, StoreError> {
        self.open_session(UserId::admin())
    }
}

// ============================================================================
// SECTION: In-Memory Session
// ============================================================================

/// Session against an [`InMemoryContentRepository`].
///
/// Dropping a session without calling `logout` leaves it counted as open.
#[derive(Debug)]
pub struct InMemorySession {
    /// Shared repository state.
    state: Arc<Mutex<RepositoryState>>,
    /// Session identity.
    user: UserId,
    /// Staged node writes keyed by normalized path.
    staged: BTreeMap<String, NodeProperties>,
    /// Copy collision handling.
    sibling_policy: SiblingPolicy,
    /// False once logged out.
    live: bool,
}

impl InMemorySession {
    /// Fails when the session was logged out.
    const fn ensure_live(&self) -> Result<(), StoreError> {
        if self.live { Ok(()) } else { Err(StoreError::SessionClosed) }
    }

    /// Evaluates `privilege` on `path` for this session's identity.
    fn allowed(
        &self,
        state: &RepositoryState,
        path: &str,
        privilege: Privilege,
    ) -> Result<bool, StoreError> {
        if state.failing_privilege_users.contains(&self.user) {
            return Err(StoreError::Store(format!("privilege evaluation failed for {}", self.user)));
        }
        if self.user.is_admin() {
            return Ok(true);
        }
        resolve_access(path, &self.user, privilege, |level| {
            Ok::<_, StoreError>(state.rules.get(level).cloned().unwrap_or_default())
        })
    }

    /// Returns true when `path` exists in staged or persisted state.
    fn exists(&self, state: &RepositoryState, path: &str) -> bool {
        self.staged.contains_key(path) || state.nodes.contains_key(path)
    }
}

impl ContentSession for InMemorySession {
    fn user_id(&self) -> &UserId {
        &self.user
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn load(&self, path: &str) -> Result<Option<StoreNode>, StoreError> {
        self.ensure_live()?;
        let path = normalize_path(path);
        let state = lock_state(&self.state)?;
        let Some(properties) = self.staged.get(&path).or_else(|| state.nodes.get(&path)).cloned()
        else {
            return Ok(None);
        };
        if !self.allowed(&state, &path, Privilege::Read)? {
            return Ok(None);
        }
        Ok(Some(StoreNode::new(path, properties)))
    }

    fn get_or_create(&mut self, path: &str) -> Result<(StoreNode, bool), StoreError> {
        self.ensure_live()?;
        let path = normalize_path(path);
        let state = lock_state(&self.state)?;
        if let Some(properties) = self.staged.get(&path).or_else(|| state.nodes.get(&path)) {
            return Ok((StoreNode::new(path, properties.clone()), false));
        }
        if !self.allowed(&state, &path, Privilege::Write)? {
            return Err(StoreError::AccessDenied(path));
        }
        let missing: Vec<String> =
            ancestors(&path).filter(|candidate| !self.exists(&state, candidate)).collect();
        drop(state);
        for candidate in missing {
            self.staged.insert(candidate, NodeProperties::new());
        }
        Ok((StoreNode::new(path, NodeProperties::new()), true))
    }

    fn copy(&mut self, source: &str, destination: &str) -> Result<String, StoreError> {
        self.ensure_live()?;
        let source = normalize_path(source);
        let destination = normalize_path(destination);
        let mut state = lock_state(&self.state)?;
        if !self.allowed(&state, &destination, Privilege::Write)? {
            return Err(StoreError::AccessDenied(destination));
        }
        if !state.nodes.contains_key(&source) {
            return Err(StoreError::NotFound(source));
        }
        let parent = parent_path(&destination);
        if !state.nodes.contains_key(&parent) {
            return Err(StoreError::NotFound(parent));
        }
        if state.failing_copy_prefixes.iter().any(|prefix| is_descendant_or_self(&destination, prefix))
        {
            return Err(StoreError::Io(format!("copy into {destination} failed")));
        }
        let target = if state.nodes.contains_key(&destination) {
            match self.sibling_policy {
                SiblingPolicy::Reject => return Err(StoreError::Conflict(destination)),
                SiblingPolicy::Disambiguate => (2 ..)
                    .map(|index| same_name_sibling(&destination, index))
                    .find(|candidate| !state.nodes.contains_key(candidate))
                    .ok_or_else(|| StoreError::Conflict(destination.clone()))?,
            }
        } else {
            destination
        };
        let subtree: Vec<(String, NodeProperties)> = state
            .nodes
            .iter()
            .filter(|(path, _)| is_descendant_or_self(path, &source))
            .map(|(path, properties)| {
                (format!("{target}{}", &path[source.len() ..]), properties.clone())
            })
            .collect();
        state.nodes.extend(subtree);
        Ok(target)
    }

    fn set_property(&mut self, path: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_live()?;
        let path = normalize_path(path);
        if !self.staged.contains_key(&path) {
            let state = lock_state(&self.state)?;
            let persisted =
                state.nodes.get(&path).cloned().ok_or_else(|| StoreError::NotFound(path.clone()))?;
            drop(state);
            self.staged.insert(path.clone(), persisted);
        }
        if let Some(properties) = self.staged.get_mut(&path) {
            properties.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.ensure_live()?;
        let mut state = lock_state(&self.state)?;
        state.nodes.append(&mut self.staged);
        Ok(())
    }

    fn refresh(&mut self) {
        self.staged.clear();
    }

    fn impersonate(&self, user: &UserId) -> Result<Self, StoreError> {
        self.ensure_live()?;
        let mut state = lock_state(&self.state)?;
        if !user.is_admin() && state.identities.get(user) != Some(&true) {
            return Err(StoreError::Impersonation(user.to_string()));
        }
        state.open_sessions += 1;
        Ok(Self {
            state: Arc::clone(&self.state),
            user: user.clone(),
            staged: BTreeMap::new(),
            sibling_policy: self.sibling_policy,
            live: true,
        })
    }

    fn has_privilege(&self, path: &str, privilege: Privilege) -> Result<bool, StoreError> {
        self.ensure_live()?;
        let state = lock_state(&self.state)?;
        self.allowed(&state, &normalize_path(path), privilege)
    }

    fn logout(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.staged.clear();
        if let Ok(mut state) = lock_state(&self.state) {
            state.open_sessions = state.open_sessions.saturating_sub(1);
        }
    }
}

// ============================================================================
// SECTION: Connection Graph
// ============================================================================

/// In-memory directed connection graph.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnectionGraph {
    /// Edges per owner in insertion order.
    edges: Arc<Mutex<BTreeMap<UserId, Vec<(UserId, ConnectionState)>>>>,
    /// When set, every query fails with this message.
    unavailable: Arc<Mutex<Option<String>>>,
}

impl InMemoryConnectionGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the state of the edge `owner -> other`, appending it when new.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the graph lock is poisoned.
    pub fn set_state(
        &self,
        owner: &UserId,
        other: &UserId,
        state: ConnectionState,
    ) -> Result<(), GraphError> {
        let mut edges = self
            .edges
            .lock()
            .map_err(|_| GraphError::Unavailable("connection graph mutex poisoned".to_string()))?;
        let owned = edges.entry(owner.clone()).or_default();
        match owned.iter_mut().find(|(user, _)| user == other) {
            Some(edge) => edge.1 = state,
            None => owned.push((other.clone(), state)),
        }
        Ok(())
    }

    /// Records an accepted connection in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the graph lock is poisoned.
    pub fn connect(&self, left: &UserId, right: &UserId) -> Result<(), GraphError> {
        self.set_state(left, right, ConnectionState::Accepted)?;
        self.set_state(right, left, ConnectionState::Accepted)
    }

    /// Makes every query fail (or succeed again with `None`).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when the graph lock is poisoned.
    pub fn set_unavailable(&self, reason: Option<String>) -> Result<(), GraphError> {
        *self
            .unavailable
            .lock()
            .map_err(|_| GraphError::Unavailable("connection graph mutex poisoned".to_string()))? =
            reason;
        Ok(())
    }
}

impl ConnectionGraph for InMemoryConnectionGraph {
    fn accepted_connections(&self, user: &UserId) -> Result<Vec<UserId>, GraphError> {
        if let Some(reason) = self
            .unavailable
            .lock()
            .map_err(|_| GraphError::Unavailable("connection graph mutex poisoned".to_string()))?
            .clone()
        {
            return Err(GraphError::Unavailable(reason));
        }
        let edges = self
            .edges
            .lock()
            .map_err(|_| GraphError::Unavailable("connection graph mutex poisoned".to_string()))?;
        let mut seen = BTreeSet::new();
        Ok(edges
            .get(user)
            .into_iter()
            .flatten()
            .filter(|(_, state)| state.is_accepted())
            .filter(|(other, _)| seen.insert(other.clone()))
            .map(|(other, _)| other.clone())
            .collect())
    }
}

// ============================================================================
// SECTION: Site Lookup
// ============================================================================

/// Treats nodes with a given resource type marker as sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeSiteLookup {
    /// Property holding the resource type marker.
    property: String,
    /// Marker value identifying site roots.
    resource_type: String,
}

impl ResourceTypeSiteLookup {
    /// Creates a lookup for an explicit property and marker.
    #[must_use]
    pub fn new(property: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            resource_type: resource_type.into(),
        }
    }
}

impl Default for ResourceTypeSiteLookup {
    fn default() -> Self {
        Self::new(RESOURCE_TYPE_PROPERTY, SITE_RESOURCE_TYPE)
    }
}

impl SiteLookup for ResourceTypeSiteLookup {
    fn is_site(&self, node: &StoreNode) -> bool {
        node.property_str(&self.property) == Some(self.resource_type.as_str())
    }
}
