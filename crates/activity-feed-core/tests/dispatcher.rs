// crates/activity-feed-core/tests/dispatcher.rs
// ============================================================================
// Module: Activity Dispatcher Tests
// Description: End-to-end fan-out against the in-memory collaborators.
// Purpose: Validate validation, authorization, delivery, and failure isolation.
// Dependencies: activity-feed-core, serde_json
// ============================================================================
//! ## Overview
//! Drives the dispatcher through complete events and checks delivered copies,
//! audit records, and session release.
//!
//! Security posture: recipients must be authorized under their own identity.

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

use std::sync::Arc;

use activity_feed_core::ActivityDispatcher;
use activity_feed_core::ActivityEvent;
use activity_feed_core::DestinationOutcome;
use activity_feed_core::EventHandler;
use activity_feed_core::FanoutAuditKind;
use activity_feed_core::FanoutError;
use activity_feed_core::FanoutSettings;
use activity_feed_core::InMemoryConnectionGraph;
use activity_feed_core::InMemoryContentRepository;
use activity_feed_core::NodeProperties;
use activity_feed_core::Principal;
use activity_feed_core::Privilege;
use activity_feed_core::ResourceTypeSiteLookup;
use activity_feed_core::UserId;
use activity_feed_core::runtime::FanoutStage;
use activity_feed_core::runtime::MemoryAuditSink;
use serde_json::json;

const SITE: &str = "/sites/physics";
const ACTIVITY: &str = "/sites/physics/activity/2009/act1";
const SITE_COPY: &str = "/sites/physics/activityFeed/14/80/act1";
const BOB_COPY: &str = "/_user/private/48/18/bob/activityFeed/14/80/act1";
const CAROL_COPY: &str = "/_user/private/28/B9/carol/activityFeed/14/80/act1";

type Dispatcher =
    ActivityDispatcher<InMemoryContentRepository, ResourceTypeSiteLookup, InMemoryConnectionGraph>;

fn properties(pairs: &[(&str, &str)]) -> NodeProperties {
    pairs.iter().map(|(key, value)| ((*key).to_string(), json!(value))).collect()
}

struct Fixture {
    repository: InMemoryContentRepository,
    graph: InMemoryConnectionGraph,
    audit: Arc<MemoryAuditSink>,
    dispatcher: Dispatcher,
}

/// Site with an activity by alice; bob may read it, carol may not.
fn fixture(actor: &str) -> Fixture {
    let repository = InMemoryContentRepository::new();
    repository.put_node(SITE, properties(&[("sling:resourceType", "sakai/site")])).unwrap();
    repository
        .put_node(ACTIVITY, properties(&[("actor", actor), ("verb", "uploaded")]))
        .unwrap();
    repository.put_node(&format!("{ACTIVITY}/attachment"), properties(&[("name", "a.pdf")])).unwrap();
    for user in ["bob", "carol"] {
        repository.register_identity(&UserId::new(user)).unwrap();
    }
    repository.grant(SITE, Principal::User(UserId::new("bob")), Privilege::Read).unwrap();

    let graph = InMemoryConnectionGraph::new();
    graph.connect(&UserId::new("alice"), &UserId::new("bob")).unwrap();
    graph.connect(&UserId::new("alice"), &UserId::new("carol")).unwrap();

    let audit = Arc::new(MemoryAuditSink::new());
    let dispatcher = ActivityDispatcher::new(
        repository.clone(),
        ResourceTypeSiteLookup::default(),
        graph.clone(),
        FanoutSettings::default(),
    )
    .with_audit_sink(audit.clone());
    Fixture {
        repository,
        graph,
        audit,
        dispatcher,
    }
}

#[test]
fn site_and_authorized_connection_receive_copies() {
    let fx = fixture("alice");
    let summary = fx.dispatcher.process(&ActivityEvent::for_activity(ACTIVITY)).unwrap();

    assert_eq!(summary.reports.len(), 3);
    assert_eq!(summary.delivered(), 2);
    assert_eq!(summary.denied(), 1);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.delivered_paths(), vec![SITE_COPY, BOB_COPY]);

    let site_copy = fx.repository.node(SITE_COPY).unwrap().unwrap();
    assert_eq!(site_copy.property_str("source"), Some(ACTIVITY));
    assert_eq!(site_copy.property_str("verb"), Some("uploaded"));
    assert!(fx.repository.node(&format!("{BOB_COPY}/attachment")).unwrap().is_some());
    assert!(fx.repository.node(CAROL_COPY).unwrap().is_none());

    let feed = fx.repository.node("/_user/private/48/18/bob/activityFeed").unwrap().unwrap();
    assert_eq!(feed.property_str("sling:resourceType"), Some("sakai/activityFeed"));
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn empty_actor_is_a_validation_error_without_deliveries() {
    let fx = fixture("");
    let err = fx.dispatcher.process(&ActivityEvent::for_activity(ACTIVITY)).unwrap_err();

    assert_eq!(err, FanoutError::MissingActor(ACTIVITY.to_string()));
    assert!(err.is_validation());
    assert_eq!(err.stage(), FanoutStage::Validated);
    assert!(fx.repository.node("/sites/physics/activityFeed").unwrap().is_none());
    assert!(fx.audit.events_of(FanoutAuditKind::DestinationDelivered).is_empty());
    assert_eq!(fx.audit.events_of(FanoutAuditKind::EventRejected).len(), 1);
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn event_without_activity_path_is_dropped() {
    let fx = fixture("alice");
    let event = ActivityEvent::new("activity/created").with_property("unrelated", "value");
    let err = fx.dispatcher.process(&event).unwrap_err();

    assert_eq!(err, FanoutError::MissingActivityPath);
    assert_eq!(err.stage(), FanoutStage::Received);
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn missing_activity_is_a_validation_error() {
    let fx = fixture("alice");
    let err = fx.dispatcher.process(&ActivityEvent::for_activity("/sites/physics/nope")).unwrap_err();

    assert_eq!(err, FanoutError::ActivityNotFound("/sites/physics/nope".to_string()));
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn delivery_failure_does_not_abort_remaining_destinations() {
    let fx = fixture("alice");
    fx.repository.fail_copies_under("/sites/physics/activityFeed").unwrap();

    let summary = fx.dispatcher.process(&ActivityEvent::for_activity(ACTIVITY)).unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.delivered_paths(), vec![BOB_COPY]);
    assert!(matches!(summary.reports[0].outcome, DestinationOutcome::Failed { .. }));
    assert_eq!(fx.audit.events_of(FanoutAuditKind::DestinationFailed).len(), 1);
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn privilege_check_failure_is_isolated_to_one_recipient() {
    let fx = fixture("alice");
    fx.repository.fail_privilege_checks_for(&UserId::new("carol")).unwrap();

    let summary = fx.dispatcher.process(&ActivityEvent::for_activity(ACTIVITY)).unwrap();

    assert_eq!(summary.delivered(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn connection_graph_failure_still_delivers_to_site() {
    let fx = fixture("alice");
    fx.graph.set_unavailable(Some("graph offline".to_string())).unwrap();

    let summary = fx.dispatcher.process(&ActivityEvent::for_activity(ACTIVITY)).unwrap();

    assert_eq!(summary.delivered_paths(), vec![SITE_COPY]);
    assert_eq!(summary.resolution_failures.len(), 1);
    assert_eq!(fx.audit.events_of(FanoutAuditKind::ConnectionsLookupFailed).len(), 1);
}

#[test]
fn duplicate_events_produce_sibling_copies() {
    let fx = fixture("alice");
    fx.dispatcher.handle_event(&ActivityEvent::for_activity(ACTIVITY));
    fx.dispatcher.handle_event(&ActivityEvent::for_activity(ACTIVITY));

    assert!(fx.repository.node(SITE_COPY).unwrap().is_some());
    let sibling = fx.repository.node(&format!("{SITE_COPY}[2]")).unwrap().unwrap();
    assert_eq!(sibling.property_str("source"), Some(ACTIVITY));
    assert_eq!(fx.audit.events_of(FanoutAuditKind::FanoutCompleted).len(), 2);
    assert_eq!(fx.repository.open_sessions().unwrap(), 0);
}

#[test]
fn activity_outside_a_site_only_reaches_connections() {
    let fx = fixture("alice");
    fx.repository.put_node("/activities/act1", properties(&[("actor", "alice")])).unwrap();
    fx.repository.grant("/activities", Principal::Everyone, Privilege::Read).unwrap();

    let summary = fx.dispatcher.process(&ActivityEvent::for_activity("/activities/act1")).unwrap();

    assert_eq!(summary.delivered(), 2);
    assert!(summary.reports.iter().all(|report| !report.destination.is_site()));
}
