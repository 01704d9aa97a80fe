// crates/activity-feed-core/tests/paths.rs
// ============================================================================
// Module: Path Sharding Tests
// Description: Known-vector tests for bucket paths and path helpers.
// Purpose: Pin the on-store layout so feeds stay interoperable.
// Dependencies: activity-feed-core, time
// ============================================================================
//! ## Overview
//! Known-vector coverage for identity, time, and pool buckets, plus path
//! normalization and parent lookup edge cases.

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

use activity_feed_core::FeedLayout;
use activity_feed_core::UserId;
use activity_feed_core::hashed_path;
use activity_feed_core::identity_bucket;
use activity_feed_core::normalize_path;
use activity_feed_core::parent_path;
use activity_feed_core::paths::ancestors;
use activity_feed_core::paths::is_descendant_or_self;
use activity_feed_core::paths::last_element;
use activity_feed_core::paths::sanitize_identifier;
use activity_feed_core::pool_bucket;
use activity_feed_core::time_bucket;
use time::OffsetDateTime;
use time::macros::datetime;

#[test]
fn identity_bucket_matches_known_vectors() {
    assert_eq!(identity_bucket("Lorem"), "/22/C6/Lorem/");
    assert_eq!(identity_bucket("ipsum"), "/DA/3B/ipsum/");
    assert_eq!(identity_bucket("amet."), "/90/8B/amet_/");
}

#[test]
fn identity_bucket_falls_back_to_anonymous() {
    assert_eq!(identity_bucket(""), "/61/51/anon/");
    assert_eq!(identity_bucket(None::<&str>), "/61/51/anon/");
    assert_eq!(identity_bucket("anon"), "/61/51/anon/");
}

#[test]
fn identity_bucket_hashes_raw_identifier_before_sanitizing() {
    // "amet." and "amet_" share a token but not a hash.
    assert_ne!(identity_bucket("amet."), identity_bucket("amet_"));
    assert!(identity_bucket("amet_").ends_with("/amet_/"));
}

#[test]
fn sanitize_keeps_token_alphabet() {
    assert_eq!(sanitize_identifier("a.b c/d"), "a_b_c_d");
    assert_eq!(sanitize_identifier("Az09_"), "Az09_");
    assert_eq!(sanitize_identifier("jean-luc"), "jean_luc");
    assert_eq!(sanitize_identifier("é"), "_");
}

#[test]
fn time_bucket_uses_unpadded_month() {
    assert_eq!(time_bucket(datetime!(2009-03-07 12:00 UTC)), "2009/3/");
    assert_eq!(time_bucket(datetime!(2024-12-31 23:59 UTC)), "2024/12/");
}

#[test]
fn time_bucket_clamps_years_before_zero() {
    let at = OffsetDateTime::from_unix_timestamp(-70_000_000_000).unwrap();
    assert!(at.year() < 0);
    assert_eq!(time_bucket(at), format!("0000/{}/", u8::from(at.month())));
}

#[test]
fn pool_bucket_token_is_a_word_for_hyphenated_identifiers() {
    let pool = pool_bucket("jean-luc", datetime!(2024-03-01 0:00 UTC));
    assert!(pool.starts_with("2024/3//"));
    assert!(pool.ends_with("/jean_luc/"));
    assert_eq!(pool, format!("2024/3/{}", identity_bucket("jean-luc")));
}

#[test]
fn pool_bucket_ends_with_identity_bucket() {
    let pool = pool_bucket("Lorem", datetime!(2009-03-07 12:00 UTC));
    assert_eq!(pool, "2009/3//22/C6/Lorem/");
    assert!(pool.ends_with(&identity_bucket("Lorem")));
}

#[test]
fn normalize_path_cases() {
    assert_eq!(normalize_path("/a//b///c"), "/a/b/c");
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("a"), "/a");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("///"), "/");
    assert_eq!(normalize_path("/a/b/"), "/a/b");
}

#[test]
fn parent_path_cases() {
    assert_eq!(parent_path("/a/b/c/d"), "/a/b/c");
    assert_eq!(parent_path("/a/"), "/");
    assert_eq!(parent_path("/"), "/");
    assert_eq!(parent_path(""), "/");
}

#[test]
fn last_element_cases() {
    assert_eq!(last_element("/a/b/act1"), "act1");
    assert_eq!(last_element("/"), "");
}

#[test]
fn ancestors_walk_to_root() {
    let walked: Vec<String> = ancestors("/a/b/c").collect();
    assert_eq!(walked, vec!["/a/b/c", "/a/b", "/a", "/"]);
    let root: Vec<String> = ancestors("/").collect();
    assert_eq!(root, vec!["/"]);
}

#[test]
fn descendant_check_respects_segment_boundaries() {
    assert!(is_descendant_or_self("/a/b", "/a"));
    assert!(is_descendant_or_self("/a", "/a"));
    assert!(is_descendant_or_self("/anything", "/"));
    assert!(!is_descendant_or_self("/ab", "/a"));
    assert!(!is_descendant_or_self("/a/b[2]", "/a/b"));
}

#[test]
fn hashed_path_appends_bucket_and_suffix() {
    assert_eq!(hashed_path("/feed", "Lorem", ""), "/feed/22/C6/Lorem");
    assert_eq!(hashed_path("/feed/", "Lorem", "item"), "/feed/22/C6/Lorem/item");
}

#[test]
fn layout_builds_feed_paths() {
    let layout = FeedLayout::default();
    assert_eq!(layout.site_feed_path("/sites/physics"), "/sites/physics/activityFeed");
    assert_eq!(layout.private_path(&UserId::new("alice")), "/_user/private/52/2B/alice");
    assert_eq!(
        layout.private_feed_path(&UserId::new("alice")),
        "/_user/private/52/2B/alice/activityFeed"
    );
    assert_eq!(
        layout.delivery_path("/_user/private/52/2B/alice/activityFeed", "act1"),
        "/_user/private/52/2B/alice/activityFeed/14/80/act1"
    );
}
