// crates/activity-feed-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Content Repository Tests
// Description: Persistence, copy, access, and fan-out tests on SQLite.
// Purpose: Keep the durable store faithful to the session contract.
// Dependencies: activity-feed-core, activity-feed-store-sqlite, rusqlite, tempfile
// ============================================================================
//! ## Overview
//! Opens stores under temporary directories and checks what survives reopen.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::sync::Arc;

use activity_feed_core::ActivityDispatcher;
use activity_feed_core::ActivityEvent;
use activity_feed_core::ContentRepository;
use activity_feed_core::ContentSession;
use activity_feed_core::FanoutSettings;
use activity_feed_core::InMemoryConnectionGraph;
use activity_feed_core::NodeProperties;
use activity_feed_core::Principal;
use activity_feed_core::Privilege;
use activity_feed_core::ResourceTypeSiteLookup;
use activity_feed_core::SiblingPolicy;
use activity_feed_core::StoreError;
use activity_feed_core::UserId;
use activity_feed_core::runtime::MemoryAuditSink;
use activity_feed_store_sqlite::SqliteContentRepository;
use activity_feed_store_sqlite::SqliteStoreConfig;
use activity_feed_store_sqlite::SqliteStoreError;
use serde_json::json;

fn open(path: &Path) -> SqliteContentRepository {
    SqliteContentRepository::new(SqliteStoreConfig::new(path)).unwrap()
}

fn properties(pairs: &[(&str, &str)]) -> NodeProperties {
    pairs.iter().map(|(key, value)| ((*key).to_string(), json!(value))).collect()
}

#[test]
fn saved_nodes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("feeds.db");
    {
        let repository = open(&db);
        let mut session = repository.login_administrative().unwrap();
        session.get_or_create("/a/b").unwrap();
        session.set_property("/a/b", "title", json!("kept")).unwrap();
        session.save().unwrap();
        session.get_or_create("/a/unsaved").unwrap();
        session.logout();
        assert_eq!(repository.open_sessions(), 0);
    }

    let repository = open(&db);
    let node = repository.node("/a/b").unwrap().unwrap();
    assert_eq!(node.property_str("title"), Some("kept"));
    assert!(repository.node("/a").unwrap().is_some());
    assert!(repository.node("/a/unsaved").unwrap().is_none());
    assert!(repository.node("/").unwrap().is_some());
}

#[test]
fn copy_duplicates_subtree_and_disambiguates() {
    let dir = tempfile::tempdir().unwrap();
    let repository = open(&dir.path().join("feeds.db"));
    repository.put_node("/src/item", &properties(&[("verb", "posted")])).unwrap();
    repository.put_node("/src/item/child", &properties(&[("name", "c")])).unwrap();
    repository.put_node("/src/item-other", &NodeProperties::new()).unwrap();
    repository.put_node("/dst", &NodeProperties::new()).unwrap();
    let mut session = repository.login_administrative().unwrap();

    let first = session.copy("/src/item", "/dst/item").unwrap();
    let second = session.copy("/src/item", "/dst/item").unwrap();

    assert_eq!(first, "/dst/item");
    assert_eq!(second, "/dst/item[2]");
    assert_eq!(repository.node("/dst/item").unwrap().unwrap().property_str("verb"), Some("posted"));
    assert!(repository.node("/dst/item[2]/child").unwrap().is_some());
    assert_eq!(
        repository.children("/dst").unwrap(),
        vec!["/dst/item".to_string(), "/dst/item[2]".to_string()]
    );
    session.logout();
}

#[test]
fn rejecting_policy_reports_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("feeds.db"));
    config.same_name_siblings = SiblingPolicy::Reject;
    let repository = SqliteContentRepository::new(config).unwrap();
    repository.put_node("/src", &NodeProperties::new()).unwrap();
    repository.put_node("/dst/src", &NodeProperties::new()).unwrap();
    let mut session = repository.login_administrative().unwrap();

    let err = session.copy("/src", "/dst/src").unwrap_err();

    assert_eq!(err, StoreError::Conflict("/dst/src".to_string()));
    session.logout();
}

#[test]
fn copy_requires_persisted_source_and_parent() {
    let dir = tempfile::tempdir().unwrap();
    let repository = open(&dir.path().join("feeds.db"));
    repository.put_node("/src", &NodeProperties::new()).unwrap();
    let mut session = repository.login_administrative().unwrap();
    session.get_or_create("/staged").unwrap();

    assert_eq!(
        session.copy("/missing", "/staged/item").unwrap_err(),
        StoreError::NotFound("/missing".to_string())
    );
    assert_eq!(
        session.copy("/src", "/staged/item").unwrap_err(),
        StoreError::NotFound("/staged".to_string())
    );
    session.logout();
}

#[test]
fn access_rules_and_identities_gate_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let repository = open(&dir.path().join("feeds.db"));
    repository.put_node("/public/item", &NodeProperties::new()).unwrap();
    repository.put_node("/public/hidden", &NodeProperties::new()).unwrap();
    repository.grant("/public", Principal::Everyone, Privilege::Read).unwrap();
    repository.deny("/public/hidden", Principal::User(UserId::new("bob")), Privilege::Read).unwrap();
    repository.register_identity(&UserId::new("bob")).unwrap();
    repository.register_identity(&UserId::new("eve")).unwrap();
    repository.disable_identity(&UserId::new("eve")).unwrap();
    let mut admin = repository.login_administrative().unwrap();

    let mut bob = admin.impersonate(&UserId::new("bob")).unwrap();
    assert!(bob.load("/public/item").unwrap().is_some());
    assert!(bob.load("/public/hidden").unwrap().is_none());
    assert!(bob.has_privilege("/public", Privilege::Read).unwrap());
    assert!(!bob.has_privilege("/public", Privilege::Write).unwrap());
    assert_eq!(
        bob.get_or_create("/public/new").unwrap_err(),
        StoreError::AccessDenied("/public/new".to_string())
    );
    assert!(matches!(
        admin.impersonate(&UserId::new("eve")),
        Err(StoreError::Impersonation(_))
    ));
    assert!(matches!(
        admin.impersonate(&UserId::new("mallory")),
        Err(StoreError::Impersonation(_))
    ));
    assert_eq!(repository.open_sessions(), 2);

    bob.logout();
    bob.logout();
    admin.logout();
    assert_eq!(repository.open_sessions(), 0);
    assert_eq!(admin.load("/public/item").unwrap_err(), StoreError::SessionClosed);
}

#[test]
fn schema_version_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("feeds.db");
    drop(open(&db));
    let connection = rusqlite::Connection::open(&db).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);

    let result = SqliteContentRepository::new(SqliteStoreConfig::new(&db));

    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn directory_store_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let result = SqliteContentRepository::new(SqliteStoreConfig::new(dir.path()));

    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn corrupt_properties_fail_closed() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("feeds.db");
    let repository = open(&db);
    repository.put_node("/bad", &NodeProperties::new()).unwrap();
    let connection = rusqlite::Connection::open(&db).unwrap();
    connection.execute("UPDATE nodes SET properties = 'not json' WHERE path = '/bad'", []).unwrap();
    drop(connection);
    let session = repository.login_administrative().unwrap();

    assert!(matches!(session.load("/bad"), Err(StoreError::Invalid(_))));
}

#[test]
fn dispatcher_fans_out_into_sqlite_feeds() {
    let dir = tempfile::tempdir().unwrap();
    let repository = open(&dir.path().join("feeds.db"));
    repository.put_node("/sites/physics", &properties(&[("sling:resourceType", "sakai/site")])).unwrap();
    repository
        .put_node("/sites/physics/activity/act1", &properties(&[("actor", "alice")]))
        .unwrap();
    repository.register_identity(&UserId::new("bob")).unwrap();
    repository
        .grant("/sites/physics", Principal::User(UserId::new("bob")), Privilege::Read)
        .unwrap();
    let graph = InMemoryConnectionGraph::new();
    graph.connect(&UserId::new("alice"), &UserId::new("bob")).unwrap();
    let dispatcher = ActivityDispatcher::new(
        repository.clone(),
        ResourceTypeSiteLookup::default(),
        graph,
        FanoutSettings::default(),
    )
    .with_audit_sink(Arc::new(MemoryAuditSink::new()));

    let summary =
        dispatcher.process(&ActivityEvent::for_activity("/sites/physics/activity/act1")).unwrap();

    assert_eq!(
        summary.delivered_paths(),
        vec![
            "/sites/physics/activityFeed/14/80/act1",
            "/_user/private/48/18/bob/activityFeed/14/80/act1",
        ]
    );
    let copy = repository.node("/_user/private/48/18/bob/activityFeed/14/80/act1").unwrap().unwrap();
    assert_eq!(copy.property_str("source"), Some("/sites/physics/activity/act1"));
    assert_eq!(copy.property_str("actor"), Some("alice"));
    assert_eq!(repository.open_sessions(), 0);
}
