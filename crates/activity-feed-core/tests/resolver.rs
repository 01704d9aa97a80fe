// crates/activity-feed-core/tests/resolver.rs
// ============================================================================
// Module: Recipient Resolver Tests
// Description: Tests for site ancestry and connection destination expansion.
// Purpose: Ensure both branches fire independently and never deduplicate.
// Dependencies: activity-feed-core, serde_json
// ============================================================================
//! ## Overview
//! Covers site discovery bounds, connection ordering, and absorbed failures.

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

use activity_feed_core::ActivityRecord;
use activity_feed_core::ConnectionState;
use activity_feed_core::ContentRepository;
use activity_feed_core::Destination;
use activity_feed_core::FeedLayout;
use activity_feed_core::InMemoryConnectionGraph;
use activity_feed_core::InMemoryContentRepository;
use activity_feed_core::NodeProperties;
use activity_feed_core::RecipientResolver;
use activity_feed_core::ResourceTypeSiteLookup;
use activity_feed_core::ScopedSession;
use activity_feed_core::UserId;
use activity_feed_core::runtime::ResolutionError;
use serde_json::json;

fn site_properties() -> NodeProperties {
    NodeProperties::from([("sling:resourceType".to_string(), json!("sakai/site"))])
}

fn resolver(
    graph: &InMemoryConnectionGraph,
) -> RecipientResolver<ResourceTypeSiteLookup, InMemoryConnectionGraph> {
    RecipientResolver::new(ResourceTypeSiteLookup::default(), graph.clone(), FeedLayout::default())
}

fn alice_activity(path: &str) -> ActivityRecord {
    ActivityRecord::new(path, UserId::new("alice")).unwrap()
}

#[test]
fn nearest_site_wins() {
    let repository = InMemoryContentRepository::new();
    repository.put_node("/sites/outer", site_properties()).unwrap();
    repository.put_node("/sites/outer/groups/inner", site_properties()).unwrap();
    repository.put_node("/sites/outer/groups/inner/posts/act1", NodeProperties::new()).unwrap();
    let session = ScopedSession::new(repository.login_administrative().unwrap());

    let resolver = resolver(&InMemoryConnectionGraph::new());
    let site = resolver.find_site(&*session, "/sites/outer/groups/inner/posts/act1").unwrap();

    assert_eq!(site.as_deref(), Some("/sites/outer/groups/inner"));
}

#[test]
fn activity_node_itself_may_be_the_site() {
    let repository = InMemoryContentRepository::new();
    repository.put_node("/sites/self", site_properties()).unwrap();
    let session = ScopedSession::new(repository.login_administrative().unwrap());

    let site = resolver(&InMemoryConnectionGraph::new()).find_site(&*session, "/sites/self").unwrap();

    assert_eq!(site.as_deref(), Some("/sites/self"));
}

#[test]
fn root_is_never_a_site() {
    let repository = InMemoryContentRepository::new();
    repository.put_node("/", site_properties()).unwrap();
    repository.put_node("/loose/act1", NodeProperties::new()).unwrap();
    let session = ScopedSession::new(repository.login_administrative().unwrap());

    let site = resolver(&InMemoryConnectionGraph::new()).find_site(&*session, "/loose/act1").unwrap();

    assert_eq!(site, None);
}

#[test]
fn both_branches_fire_without_deduplication() {
    let repository = InMemoryContentRepository::new();
    repository.put_node("/sites/physics", site_properties()).unwrap();
    repository.put_node("/sites/physics/act1", NodeProperties::new()).unwrap();
    let graph = InMemoryConnectionGraph::new();
    graph.connect(&UserId::new("alice"), &UserId::new("bob")).unwrap();
    graph.connect(&UserId::new("alice"), &UserId::new("carol")).unwrap();
    let session = ScopedSession::new(repository.login_administrative().unwrap());

    let resolution = resolver(&graph).resolve(&*session, &alice_activity("/sites/physics/act1"));

    assert!(resolution.failures.is_empty());
    assert_eq!(
        resolution.destinations,
        vec![
            Destination::site("/sites/physics", "/sites/physics/activityFeed"),
            Destination::connection(
                UserId::new("bob"),
                "/_user/private/48/18/bob/activityFeed"
            ),
            Destination::connection(
                UserId::new("carol"),
                "/_user/private/28/B9/carol/activityFeed"
            ),
        ]
    );
}

#[test]
fn only_accepted_connections_are_destinations() {
    let graph = InMemoryConnectionGraph::new();
    let alice = UserId::new("alice");
    graph.set_state(&alice, &UserId::new("bob"), ConnectionState::Pending).unwrap();
    graph.set_state(&alice, &UserId::new("carol"), ConnectionState::Blocked).unwrap();
    graph.set_state(&alice, &UserId::new("dave"), ConnectionState::Accepted).unwrap();

    let destinations = resolver(&graph).connection_destinations(&alice).unwrap();

    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0].recipient(), Some(&UserId::new("dave")));
}

#[test]
fn empty_graph_yields_no_connection_destinations() {
    let destinations = resolver(&InMemoryConnectionGraph::new())
        .connection_destinations(&UserId::new("alice"))
        .unwrap();
    assert!(destinations.is_empty());
}

#[test]
fn graph_failure_is_reported_alongside_site_destination() {
    let repository = InMemoryContentRepository::new();
    repository.put_node("/sites/physics", site_properties()).unwrap();
    repository.put_node("/sites/physics/act1", NodeProperties::new()).unwrap();
    let graph = InMemoryConnectionGraph::new();
    graph.set_unavailable(Some("offline".to_string())).unwrap();
    let session = ScopedSession::new(repository.login_administrative().unwrap());

    let resolution = resolver(&graph).resolve(&*session, &alice_activity("/sites/physics/act1"));

    assert_eq!(resolution.destinations.len(), 1);
    assert!(resolution.destinations[0].is_site());
    assert!(matches!(resolution.failures.as_slice(), [ResolutionError::Connections(_)]));
}
