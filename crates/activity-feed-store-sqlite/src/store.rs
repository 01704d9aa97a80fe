// crates/activity-feed-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Content Repository
// Description: Durable ContentRepository backed by SQLite WAL.
// Purpose: Persist feed nodes, access rules, and identities across restarts.
// Dependencies: activity-feed-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`ContentRepository`] using `SQLite`.
//! Nodes are stored one row per path with JSON-encoded properties. Sessions
//! stage writes in memory; `save` commits every staged node in one
//! transaction and `copy` duplicates a persisted subtree in one transaction.
//! Security posture: database contents are untrusted and decoded fail-closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use activity_feed_core::AccessRule;
use activity_feed_core::ContentRepository;
use activity_feed_core::ContentSession;
use activity_feed_core::NodeProperties;
use activity_feed_core::Principal;
use activity_feed_core::Privilege;
use activity_feed_core::ROOT_PATH;
use activity_feed_core::SiblingPolicy;
use activity_feed_core::StoreError;
use activity_feed_core::StoreNode;
use activity_feed_core::UserId;
use activity_feed_core::interfaces::same_name_sibling;
use activity_feed_core::normalize_path;
use activity_feed_core::parent_path;
use activity_feed_core::paths::ancestors;
use activity_feed_core::resolve_access;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum encoded size of one node's properties.
pub const MAX_PROPERTIES_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` content repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Handling of copies onto occupied paths.
    #[serde(default)]
    pub same_name_siblings: SiblingPolicy,
}

impl SqliteStoreConfig {
    /// Creates a config with defaults for everything but the path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            same_name_siblings: SiblingPolicy::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Node properties exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) => {
                Self::Store(format!("schema version mismatch: {message}"))
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "node properties exceed size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a `rusqlite` error into a store error.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Repository
// ============================================================================

/// `SQLite`-backed content repository with WAL support.
#[derive(Clone)]
pub struct SqliteContentRepository {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Number of sessions not yet logged out.
    open_sessions: Arc<AtomicUsize>,
}

impl SqliteContentRepository {
    /// Opens an `SQLite`-backed content repository.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the number of sessions not yet logged out.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Persists a node and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn put_node(&self, path: &str, properties: &NodeProperties) -> Result<(), SqliteStoreError> {
        let path = normalize_path(path);
        let encoded = encode_properties(properties)?;
        let mut guard = lock_connection(&self.connection)?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        for ancestor in ancestors(&parent_path(&path)) {
            tx.execute(
                "INSERT OR IGNORE INTO nodes (path, properties) VALUES (?1, '{}')",
                params![ancestor],
            )
            .map_err(|err| db_error(&err))?;
        }
        upsert_node(&tx, &path, &encoded)?;
        tx.commit().map_err(|err| db_error(&err))
    }

    /// Returns the persisted node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the read fails or the row is invalid.
    pub fn node(&self, path: &str) -> Result<Option<StoreNode>, SqliteStoreError> {
        let path = normalize_path(path);
        let guard = lock_connection(&self.connection)?;
        Ok(fetch_properties(&guard, &path)?.map(|properties| StoreNode::new(path, properties)))
    }

    /// Returns the paths of the persisted direct children of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the read fails.
    pub fn children(&self, path: &str) -> Result<Vec<String>, SqliteStoreError> {
        let path = normalize_path(path);
        let guard = lock_connection(&self.connection)?;
        let descendants = subtree_paths(&guard, &path)?;
        Ok(descendants
            .into_iter()
            .filter(|candidate| *candidate != path && parent_path(candidate) == path)
            .collect())
    }

    /// Registers or re-enables an identity that may be impersonated.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn register_identity(&self, user: &UserId) -> Result<(), SqliteStoreError> {
        self.set_identity(user, true)
    }

    /// Disables an identity; impersonating it then fails.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn disable_identity(&self, user: &UserId) -> Result<(), SqliteStoreError> {
        self.set_identity(user, false)
    }

    /// Attaches an access rule to a path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn add_rule(&self, path: &str, rule: &AccessRule) -> Result<(), SqliteStoreError> {
        let guard = lock_connection(&self.connection)?;
        guard
            .execute(
                "INSERT INTO access_rules (path, principal, privilege, allow) VALUES (?1, ?2, ?3, \
                 ?4)",
                params![
                    normalize_path(path),
                    rule.principal.storage_label(),
                    rule.privilege.as_str(),
                    rule.allow
                ],
            )
            .map_err(|err| db_error(&err))?;
        Ok(())
    }

    /// Grants `privilege` on `path` to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn grant(
        &self,
        path: &str,
        principal: Principal,
        privilege: Privilege,
    ) -> Result<(), SqliteStoreError> {
        self.add_rule(path, &AccessRule::allow(principal, privilege))
    }

    /// Denies `privilege` on `path` to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn deny(
        &self,
        path: &str,
        principal: Principal,
        privilege: Privilege,
    ) -> Result<(), SqliteStoreError> {
        self.add_rule(path, &AccessRule::deny(principal, privilege))
    }

    /// Upserts an identity row.
    fn set_identity(&self, user: &UserId, enabled: bool) -> Result<(), SqliteStoreError> {
        let guard = lock_connection(&self.connection)?;
        guard
            .execute(
                "INSERT INTO identities (user_id, enabled) VALUES (?1, ?2) ON CONFLICT(user_id) DO \
                 UPDATE SET enabled = excluded.enabled",
                params![user.as_str(), enabled],
            )
            .map_err(|err| db_error(&err))?;
        Ok(())
    }

    /// Opens a session for `user`, counting it as live.
    fn open_session(&self, user: UserId) -> SqliteSession {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        SqliteSession {
            connection: Arc::clone(&self.connection),
            open_sessions: Arc::clone(&self.open_sessions),
            user,
            staged: BTreeMap::new(),
            sibling_policy: self.config.same_name_siblings,
            live: true,
        }
    }
}

impl ContentRepository for SqliteContentRepository {
    type Session = SqliteSession;

    fn login_administrative(&self) -> Result<Self::Session, StoreError> {
        Ok(self.open_session(UserId::admin()))
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Session against a [`SqliteContentRepository`].
pub struct SqliteSession {
    /// Shared `SQLite` connection.
    connection: Arc<Mutex<Connection>>,
    /// Live session counter shared with the repository.
    open_sessions: Arc<AtomicUsize>,
    /// Session identity.
    user: UserId,
    /// Staged node writes keyed by normalized path.
    staged: BTreeMap<String, NodeProperties>,
    /// Copy collision handling.
    sibling_policy: SiblingPolicy,
    /// False once logged out.
    live: bool,
}

impl SqliteSession {
    /// Fails when the session was logged out.
    const fn ensure_live(&self) -> Result<(), StoreError> {
        if self.live { Ok(()) } else { Err(StoreError::SessionClosed) }
    }

    /// Evaluates `privilege` on `path` for this session's identity.
    fn allowed(
        &self,
        connection: &Connection,
        path: &str,
        privilege: Privilege,
    ) -> Result<bool, SqliteStoreError> {
        if self.user.is_admin() {
            return Ok(true);
        }
        resolve_access(path, &self.user, privilege, |level| rules_at(connection, level))
    }

    /// Returns staged or persisted properties for `path`.
    fn visible_properties(
        &self,
        connection: &Connection,
        path: &str,
    ) -> Result<Option<NodeProperties>, SqliteStoreError> {
        if let Some(properties) = self.staged.get(path) {
            return Ok(Some(properties.clone()));
        }
        fetch_properties(connection, path)
    }

    /// Copies the subtree at `source` inside one transaction.
    fn copy_subtree(
        &self,
        connection: &mut Connection,
        source: &str,
        destination: &str,
    ) -> Result<String, StoreError> {
        let tx = connection.transaction().map_err(|err| db_error(&err))?;
        if fetch_properties(&tx, source)?.is_none() {
            return Err(StoreError::NotFound(source.to_string()));
        }
        let parent = parent_path(destination);
        if fetch_properties(&tx, &parent)?.is_none() {
            return Err(StoreError::NotFound(parent));
        }
        let target = if fetch_properties(&tx, destination)?.is_some() {
            match self.sibling_policy {
                SiblingPolicy::Reject => return Err(StoreError::Conflict(destination.to_string())),
                SiblingPolicy::Disambiguate => free_sibling(&tx, destination)?,
            }
        } else {
            destination.to_string()
        };
        let rows = subtree_rows(&tx, source)?;
        for (path, encoded) in rows {
            let copied = format!("{target}{}", &path[source.len() ..]);
            tx.execute(
                "INSERT INTO nodes (path, properties) VALUES (?1, ?2)",
                params![copied, encoded],
            )
            .map_err(|err| db_error(&err))?;
        }
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(target)
    }
}

impl ContentSession for SqliteSession {
    fn user_id(&self) -> &UserId {
        &self.user
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn load(&self, path: &str) -> Result<Option<StoreNode>, StoreError> {
        self.ensure_live()?;
        let path = normalize_path(path);
        let guard = lock_connection(&self.connection)?;
        let Some(properties) = self.visible_properties(&guard, &path)? else {
            return Ok(None);
        };
        if !self.allowed(&guard, &path, Privilege::Read)? {
            return Ok(None);
        }
        Ok(Some(StoreNode::new(path, properties)))
    }

    fn get_or_create(&mut self, path: &str) -> Result<(StoreNode, bool), StoreError> {
        self.ensure_live()?;
        let path = normalize_path(path);
        let guard = lock_connection(&self.connection)?;
        if let Some(properties) = self.visible_properties(&guard, &path)? {
            return Ok((StoreNode::new(path, properties), false));
        }
        if !self.allowed(&guard, &path, Privilege::Write)? {
            return Err(StoreError::AccessDenied(path));
        }
        let mut missing = Vec::new();
        for candidate in ancestors(&path) {
            if self.visible_properties(&guard, &candidate)?.is_none() {
                missing.push(candidate);
            }
        }
        drop(guard);
        for candidate in missing {
            self.staged.insert(candidate, NodeProperties::new());
        }
        Ok((StoreNode::new(path, NodeProperties::new()), true))
    }

    fn copy(&mut self, source: &str, destination: &str) -> Result<String, StoreError> {
        self.ensure_live()?;
        let source = normalize_path(source);
        let destination = normalize_path(destination);
        let mut guard = lock_connection(&self.connection)?;
        if !self.allowed(&guard, &destination, Privilege::Write)? {
            return Err(StoreError::AccessDenied(destination));
        }
        self.copy_subtree(&mut guard, &source, &destination)
    }

    fn set_property(&mut self, path: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_live()?;
        let path = normalize_path(path);
        if !self.staged.contains_key(&path) {
            let guard = lock_connection(&self.connection)?;
            let persisted =
                fetch_properties(&guard, &path)?.ok_or_else(|| StoreError::NotFound(path.clone()))?;
            drop(guard);
            self.staged.insert(path.clone(), persisted);
        }
        if let Some(properties) = self.staged.get_mut(&path) {
            properties.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.ensure_live()?;
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut guard = lock_connection(&self.connection)?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        for (path, properties) in &self.staged {
            upsert_node(&tx, path, &encode_properties(properties)?)?;
        }
        tx.commit().map_err(|err| db_error(&err))?;
        drop(guard);
        self.staged.clear();
        Ok(())
    }

    fn refresh(&mut self) {
        self.staged.clear();
    }

    fn impersonate(&self, user: &UserId) -> Result<Self, StoreError> {
        self.ensure_live()?;
        if !user.is_admin() {
            let guard = lock_connection(&self.connection)?;
            let enabled: Option<bool> = guard
                .query_row(
                    "SELECT enabled FROM identities WHERE user_id = ?1",
                    params![user.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| db_error(&err))?;
            if enabled != Some(true) {
                return Err(StoreError::Impersonation(user.to_string()));
            }
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            connection: Arc::clone(&self.connection),
            open_sessions: Arc::clone(&self.open_sessions),
            user: user.clone(),
            staged: BTreeMap::new(),
            sibling_policy: self.sibling_policy,
            live: true,
        })
    }

    fn has_privilege(&self, path: &str, privilege: Privilege) -> Result<bool, StoreError> {
        self.ensure_live()?;
        let guard = lock_connection(&self.connection)?;
        Ok(self.allowed(&guard, &normalize_path(path), privilege)?)
    }

    fn logout(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.staged.clear();
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks the shared connection.
fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
    connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
}

/// Encodes node properties as JSON, enforcing the size limit.
fn encode_properties(properties: &NodeProperties) -> Result<String, SqliteStoreError> {
    let encoded = serde_json::to_string(properties)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if encoded.len() > MAX_PROPERTIES_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_PROPERTIES_BYTES,
            actual_bytes: encoded.len(),
        });
    }
    Ok(encoded)
}

/// Decodes node properties stored for `path`.
fn decode_properties(path: &str, encoded: &str) -> Result<NodeProperties, SqliteStoreError> {
    if encoded.len() > MAX_PROPERTIES_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_PROPERTIES_BYTES,
            actual_bytes: encoded.len(),
        });
    }
    serde_json::from_str(encoded)
        .map_err(|err| SqliteStoreError::Invalid(format!("properties for {path}: {err}")))
}

/// Reads the persisted properties of one node.
fn fetch_properties(
    connection: &Connection,
    path: &str,
) -> Result<Option<NodeProperties>, SqliteStoreError> {
    let encoded: Option<String> = connection
        .query_row("SELECT properties FROM nodes WHERE path = ?1", params![path], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    encoded.map(|encoded| decode_properties(path, &encoded)).transpose()
}

/// Inserts or replaces one node row.
fn upsert_node(tx: &Transaction<'_>, path: &str, encoded: &str) -> Result<(), SqliteStoreError> {
    tx.execute(
        "INSERT INTO nodes (path, properties) VALUES (?1, ?2) ON CONFLICT(path) DO UPDATE SET \
         properties = excluded.properties",
        params![path, encoded],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Returns `path` and every persisted descendant with raw properties.
fn subtree_rows(
    connection: &Connection,
    path: &str,
) -> Result<Vec<(String, String)>, SqliteStoreError> {
    let prefix = if path == ROOT_PATH { String::from(ROOT_PATH) } else { format!("{path}/") };
    let mut statement = connection
        .prepare(
            "SELECT path, properties FROM nodes WHERE path = ?1 OR substr(path, 1, length(?2)) = \
             ?2 ORDER BY path",
        )
        .map_err(|err| db_error(&err))?;
    let rows = statement
        .query_map(params![path, prefix], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|err| db_error(&err))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(|err| db_error(&err))
}

/// Returns `path` and every persisted descendant path.
fn subtree_paths(connection: &Connection, path: &str) -> Result<Vec<String>, SqliteStoreError> {
    Ok(subtree_rows(connection, path)?.into_iter().map(|(path, _)| path).collect())
}

/// Returns the first unoccupied same-name sibling of `path`.
fn free_sibling(connection: &Connection, path: &str) -> Result<String, SqliteStoreError> {
    let mut index = 2_usize;
    loop {
        let candidate = same_name_sibling(path, index);
        if fetch_properties(connection, &candidate)?.is_none() {
            return Ok(candidate);
        }
        index = index
            .checked_add(1)
            .ok_or_else(|| SqliteStoreError::Invalid(format!("no free sibling for {path}")))?;
    }
}

/// Reads the access rules attached to exactly `path`.
fn rules_at(connection: &Connection, path: &str) -> Result<Vec<AccessRule>, SqliteStoreError> {
    let mut statement = connection
        .prepare(
            "SELECT principal, privilege, allow FROM access_rules WHERE path = ?1 ORDER BY rowid",
        )
        .map_err(|err| db_error(&err))?;
    let rows = statement
        .query_map(params![path], |row| {
            let principal: String = row.get(0)?;
            let privilege: String = row.get(1)?;
            let allow: bool = row.get(2)?;
            Ok((principal, privilege, allow))
        })
        .map_err(|err| db_error(&err))?;
    let mut rules = Vec::new();
    for row in rows {
        let (principal, privilege, allow) = row.map_err(|err| db_error(&err))?;
        let principal = Principal::from_storage_label(&principal)
            .ok_or_else(|| SqliteStoreError::Invalid(format!("unknown principal: {principal}")))?;
        let privilege = Privilege::parse(&privilege)
            .ok_or_else(|| SqliteStoreError::Invalid(format!("unknown privilege: {privilege}")))?;
        rules.push(AccessRule {
            principal,
            privilege,
            allow,
        });
    }
    Ok(rules)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS nodes (
                    path TEXT PRIMARY KEY,
                    properties TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS access_rules (
                    path TEXT NOT NULL,
                    principal TEXT NOT NULL,
                    privilege TEXT NOT NULL,
                    allow INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_access_rules_path ON access_rules (path);
                CREATE TABLE IF NOT EXISTS identities (
                    user_id TEXT PRIMARY KEY,
                    enabled INTEGER NOT NULL
                );
                INSERT OR IGNORE INTO nodes (path, properties) VALUES ('/', '{}');",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
