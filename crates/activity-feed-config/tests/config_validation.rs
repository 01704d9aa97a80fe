//! Config loading and validation tests for activity-feed-config.
// crates/activity-feed-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate defaults, section constraints, and conversions.
// Purpose: Ensure configuration fails closed and maps onto core settings.
// =============================================================================

use std::path::PathBuf;

use activity_feed_config::ActivityFeedConfig;
use activity_feed_config::AuditSinkKind;
use activity_feed_config::ConfigError;
use activity_feed_config::ConfiguredRepository;
use activity_feed_config::StoreBackend;
use activity_feed_core::FanoutAuditEvent;
use activity_feed_core::FanoutAuditKind;
use activity_feed_core::Privilege;
use activity_feed_core::SiblingPolicy;
use activity_feed_core::SiteLookup;
use activity_feed_core::StoreNode;
use activity_feed_store_sqlite::SqliteStoreConfig;

type TestResult = Result<(), String>;

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn empty_config_uses_defaults() -> TestResult {
    let config = ActivityFeedConfig::from_toml_str("").map_err(|err| err.to_string())?;
    let settings = config.fanout_settings();
    if settings.layout.feed_name != "activityFeed"
        || settings.layout.private_prefix != "/_user/private"
        || settings.activity_path_property != "activityItemPath"
        || settings.privilege != Privilege::Read
    {
        return Err("unexpected layout or event defaults".to_string());
    }
    if config.events.max_event_bytes != 64 * 1024 {
        return Err("unexpected max_event_bytes default".to_string());
    }
    if config.store.backend != StoreBackend::Memory || config.audit.sink != AuditSinkKind::Stderr {
        return Err("unexpected backend defaults".to_string());
    }
    Ok(())
}

#[test]
fn sections_override_defaults() -> TestResult {
    let config = ActivityFeedConfig::from_toml_str(
        r#"
[layout]
feed_name = "feed"
source_property = "origin"

[events]
activity_path_property = "itemPath"
max_event_bytes = 1024

[access]
privilege = "write"

[sites]
resource_type = "example/site"

[store]
same_name_siblings = "reject"
"#,
    )
    .map_err(|err| err.to_string())?;
    let settings = config.fanout_settings();
    if settings.layout.feed_name != "feed"
        || settings.layout.source_property != "origin"
        || settings.layout.actor_property != "actor"
        || settings.activity_path_property != "itemPath"
        || settings.privilege != Privilege::Write
    {
        return Err("section overrides not applied".to_string());
    }
    if config.store.same_name_siblings != SiblingPolicy::Reject {
        return Err("sibling policy not applied".to_string());
    }
    let lookup = config.site_lookup();
    let site = StoreNode::new(
        "/s",
        [("sling:resourceType".to_string(), serde_json::json!("example/site"))].into(),
    );
    if !lookup.is_site(&site) {
        return Err("site lookup ignored sites.resource_type".to_string());
    }
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    assert_invalid(ActivityFeedConfig::from_toml_str("[events]\nunknown = 1\n"), "parse error")
}

#[test]
fn feed_name_must_be_single_segment() -> TestResult {
    assert_invalid(
        ActivityFeedConfig::from_toml_str("[layout]\nfeed_name = \"a/b\"\n"),
        "layout.feed_name must be a single segment",
    )
}

#[test]
fn private_prefix_must_be_absolute() -> TestResult {
    assert_invalid(
        ActivityFeedConfig::from_toml_str("[layout]\nprivate_prefix = \"_user\"\n"),
        "layout.private_prefix must be absolute",
    )
}

#[test]
fn max_event_bytes_is_bounded() -> TestResult {
    assert_invalid(
        ActivityFeedConfig::from_toml_str("[events]\nmax_event_bytes = 0\n"),
        "events.max_event_bytes must be between",
    )?;
    assert_invalid(
        ActivityFeedConfig::from_toml_str("[events]\nmax_event_bytes = 2000000\n"),
        "events.max_event_bytes must be between",
    )
}

#[test]
fn empty_site_resource_type_is_rejected() -> TestResult {
    assert_invalid(
        ActivityFeedConfig::from_toml_str("[sites]\nresource_type = \" \"\n"),
        "sites.resource_type must be non-empty",
    )
}

#[test]
fn sqlite_store_requires_section() -> TestResult {
    let mut config = ActivityFeedConfig::default();
    config.store.backend = StoreBackend::Sqlite;
    assert_invalid(config.validate(), "sqlite store requires store.sqlite")
}

#[test]
fn memory_store_rejects_sqlite_section() -> TestResult {
    let mut config = ActivityFeedConfig::default();
    config.store.sqlite = Some(SqliteStoreConfig::new("feeds.db"));
    assert_invalid(config.validate(), "memory store must not set store.sqlite")
}

#[test]
fn sqlite_store_rejects_zero_busy_timeout() -> TestResult {
    let mut config = ActivityFeedConfig::default();
    config.store.backend = StoreBackend::Sqlite;
    let mut sqlite = SqliteStoreConfig::new("feeds.db");
    sqlite.busy_timeout_ms = 0;
    config.store.sqlite = Some(sqlite);
    assert_invalid(config.validate(), "busy_timeout_ms must be greater than zero")
}

#[test]
fn file_audit_sink_requires_path() -> TestResult {
    let mut config = ActivityFeedConfig::default();
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "file audit sink requires audit.path")?;
    config.audit.sink = AuditSinkKind::None;
    config.audit.path = Some(PathBuf::from("audit.log"));
    assert_invalid(config.validate(), "audit.path is only valid for the file sink")
}

#[test]
fn missing_file_is_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(ActivityFeedConfig::load(Some(&path)), "config io error")
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    assert_invalid(ActivityFeedConfig::load(Some(&path)), "config file must be utf-8")
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    std::fs::write(&path, padding).map_err(|err| err.to_string())?;
    assert_invalid(ActivityFeedConfig::load(Some(&path)), "config file exceeds size limit")
}

#[test]
fn sqlite_store_and_file_audit_open_from_disk() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let db = dir.path().join("data").join("feeds.db");
    let audit = dir.path().join("fanout.log");
    let path = dir.path().join("activity-feed.toml");
    let text = format!(
        "[store]\nbackend = \"sqlite\"\n\n[store.sqlite]\npath = \"{}\"\njournal_mode = \
         \"delete\"\nsync_mode = \"normal\"\n\n[audit]\nsink = \"file\"\npath = \"{}\"\n",
        db.display(),
        audit.display()
    );
    std::fs::write(&path, text).map_err(|err| err.to_string())?;

    let config = ActivityFeedConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    match config.store.open().map_err(|err| err.to_string())? {
        ConfiguredRepository::Sqlite(repository) => {
            if repository.config().path != db {
                return Err("sqlite path not applied".to_string());
            }
        }
        ConfiguredRepository::Memory(_) => return Err("expected sqlite backend".to_string()),
    }
    if !db.exists() {
        return Err("sqlite database was not created".to_string());
    }
    let sink = config.audit.build_sink().map_err(|err| err.to_string())?;
    sink.record(&FanoutAuditEvent::new(FanoutAuditKind::FanoutCompleted).activity("/a"));
    let logged = std::fs::read_to_string(&audit).map_err(|err| err.to_string())?;
    if !logged.contains("fanout_completed") {
        return Err(format!("audit file missing record: {logged}"));
    }
    Ok(())
}
