// crates/activity-feed-config/src/config.rs
// ============================================================================
// Module: Activity Feed Configuration
// Description: Configuration loading and validation for the fan-out pipeline.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: activity-feed-core, activity-feed-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Parsed values convert into
//! the core [`FeedLayout`] and [`FanoutSettings`] types; the dispatcher never
//! reads configuration itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use activity_feed_core::FanoutAuditSink;
use activity_feed_core::FanoutSettings;
use activity_feed_core::FeedLayout;
use activity_feed_core::InMemoryContentRepository;
use activity_feed_core::Privilege;
use activity_feed_core::ResourceTypeSiteLookup;
use activity_feed_core::SITE_RESOURCE_TYPE;
use activity_feed_core::SiblingPolicy;
use activity_feed_core::runtime::FileAuditSink;
use activity_feed_core::runtime::NoopAuditSink;
use activity_feed_core::runtime::StderrAuditSink;
use activity_feed_store_sqlite::SqliteContentRepository;
use activity_feed_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "activity-feed.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ACTIVITY_FEED_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum encoded event size in bytes.
pub(crate) const DEFAULT_MAX_EVENT_BYTES: usize = 64 * 1024;
/// Largest accepted `events.max_event_bytes`.
pub(crate) const MAX_EVENT_BYTES_LIMIT: usize = 1024 * 1024;
/// Maximum length of a property or resource type name.
pub(crate) const MAX_NAME_LENGTH: usize = 255;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Activity fan-out configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityFeedConfig {
    /// Feed naming conventions.
    #[serde(default)]
    pub layout: FeedLayout,
    /// Event intake configuration.
    #[serde(default)]
    pub events: EventsConfig,
    /// Recipient authorization configuration.
    #[serde(default)]
    pub access: AccessConfig,
    /// Site detection configuration.
    #[serde(default)]
    pub sites: SitesConfig,
    /// Content store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ActivityFeedConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_layout(&self.layout)?;
        self.events.validate()?;
        self.sites.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns dispatcher settings derived from this configuration.
    #[must_use]
    pub fn fanout_settings(&self) -> FanoutSettings {
        FanoutSettings {
            layout: self.layout.clone(),
            activity_path_property: self.events.activity_path_property.clone(),
            privilege: self.access.privilege,
        }
    }

    /// Returns the site predicate derived from this configuration.
    #[must_use]
    pub fn site_lookup(&self) -> ResourceTypeSiteLookup {
        ResourceTypeSiteLookup::new(
            self.layout.resource_type_property.clone(),
            self.sites.resource_type.clone(),
        )
    }
}

/// Event intake configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Event property naming the activity location.
    #[serde(default = "default_activity_path_property")]
    pub activity_path_property: String,
    /// Maximum encoded event size in bytes.
    #[serde(default = "default_max_event_bytes")]
    pub max_event_bytes: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            activity_path_property: default_activity_path_property(),
            max_event_bytes: default_max_event_bytes(),
        }
    }
}

impl EventsConfig {
    /// Validates event intake configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("events.activity_path_property", &self.activity_path_property)?;
        if self.max_event_bytes == 0 || self.max_event_bytes > MAX_EVENT_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "events.max_event_bytes must be between 1 and {MAX_EVENT_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Recipient authorization configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Privilege a connection recipient must hold on the activity.
    #[serde(default)]
    pub privilege: Privilege,
}

/// Site detection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitesConfig {
    /// Resource type marking a site node.
    #[serde(default = "default_site_resource_type")]
    pub resource_type: String,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            resource_type: default_site_resource_type(),
        }
    }
}

impl SitesConfig {
    /// Validates site detection configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("sites.resource_type", &self.resource_type)
    }
}

/// Content store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Use the in-memory reference store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Content store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Copy collision handling for the memory backend.
    #[serde(default)]
    pub same_name_siblings: SiblingPolicy,
    /// `SQLite` settings when using the sqlite backend.
    #[serde(default)]
    pub sqlite: Option<SqliteStoreConfig>,
}

impl StoreConfig {
    /// Validates content store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            StoreBackend::Memory => {
                if self.sqlite.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set store.sqlite".to_string(),
                    ));
                }
                Ok(())
            }
            StoreBackend::Sqlite => {
                let sqlite = self.sqlite.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires store.sqlite".to_string())
                })?;
                validate_store_path(&sqlite.path)?;
                if sqlite.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store.sqlite.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Opens the configured content repository.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the sqlite store cannot be opened.
    pub fn open(&self) -> Result<ConfiguredRepository, ConfigError> {
        match (self.backend, &self.sqlite) {
            (StoreBackend::Memory, _) => Ok(ConfiguredRepository::Memory(
                InMemoryContentRepository::new().with_sibling_policy(self.same_name_siblings),
            )),
            (StoreBackend::Sqlite, Some(sqlite)) => SqliteContentRepository::new(sqlite.clone())
                .map(ConfiguredRepository::Sqlite)
                .map_err(|err| ConfigError::Store(err.to_string())),
            (StoreBackend::Sqlite, None) => {
                Err(ConfigError::Invalid("sqlite store requires store.sqlite".to_string()))
            }
        }
    }
}

/// Repository opened from [`StoreConfig`].
#[derive(Clone)]
pub enum ConfiguredRepository {
    /// In-memory reference store.
    Memory(InMemoryContentRepository),
    /// Durable `SQLite` store.
    Sqlite(SqliteContentRepository),
}

/// Audit sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit records.
    None,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires audit.path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn FanoutAuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::File, Some(path)) => FileAuditSink::new(path)
                .map(|sink| Arc::new(sink) as Arc<dyn FanoutAuditSink>)
                .map_err(|err| ConfigError::Io(err.to_string())),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires audit.path".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Configured store failed to open.
    #[error("config store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the default activity path event property.
fn default_activity_path_property() -> String {
    activity_feed_core::ACTIVITY_PATH_PROPERTY.to_string()
}

/// Returns the default maximum event size.
const fn default_max_event_bytes() -> usize {
    DEFAULT_MAX_EVENT_BYTES
}

/// Returns the default site resource type.
fn default_site_resource_type() -> String {
    SITE_RESOURCE_TYPE.to_string()
}

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the sqlite store path.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    validate_path_string("store.sqlite.path", &path.to_string_lossy())
}

/// Validates a property or resource type name.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates feed naming conventions.
fn validate_layout(layout: &FeedLayout) -> Result<(), ConfigError> {
    validate_name("layout.feed_name", &layout.feed_name)?;
    if layout.feed_name.contains('/') || layout.feed_name.contains('[') {
        return Err(ConfigError::Invalid("layout.feed_name must be a single segment".to_string()));
    }
    validate_name("layout.private_prefix", &layout.private_prefix)?;
    if !layout.private_prefix.starts_with('/') {
        return Err(ConfigError::Invalid("layout.private_prefix must be absolute".to_string()));
    }
    validate_name("layout.resource_type_property", &layout.resource_type_property)?;
    validate_name("layout.feed_resource_type", &layout.feed_resource_type)?;
    validate_name("layout.actor_property", &layout.actor_property)?;
    validate_name("layout.source_property", &layout.source_property)?;
    if layout.resource_type_property == layout.source_property {
        return Err(ConfigError::Invalid(
            "layout.source_property must differ from layout.resource_type_property".to_string(),
        ));
    }
    Ok(())
}
