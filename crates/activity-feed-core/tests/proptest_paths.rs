// crates/activity-feed-core/tests/proptest_paths.rs
// ============================================================================
// Module: Path Sharding Property Tests
// Description: Property-based checks for bucket paths and normalization.
// Purpose: Ensure the sharder is deterministic and total for arbitrary input.
// Dependencies: activity-feed-core, proptest, time
// ============================================================================
//! ## Overview
//! Property-based tests for the pure path functions: determinism, pattern
//! conformance, and idempotent normalization.

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

use activity_feed_core::identity_bucket;
use activity_feed_core::normalize_path;
use activity_feed_core::parent_path;
use activity_feed_core::pool_bucket;
use activity_feed_core::time_bucket;
use proptest::prelude::*;
use time::OffsetDateTime;

/// Returns true for a two-character uppercase hex segment.
fn is_hex_segment(segment: &str) -> bool {
    segment.len() == 2 && segment.chars().all(|ch| ch.is_ascii_digit() || ('A' ..= 'F').contains(&ch))
}

/// Returns true for a sanitized identifier token.
fn is_token(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Checks the `/XX/YY/token/` shape.
fn assert_identity_shape(bucket: &str) {
    let inner = bucket.strip_prefix('/').and_then(|rest| rest.strip_suffix('/')).unwrap();
    let parts: Vec<&str> = inner.split('/').collect();
    assert_eq!(parts.len(), 3, "bucket {bucket}");
    assert!(is_hex_segment(parts[0]), "bucket {bucket}");
    assert!(is_hex_segment(parts[1]), "bucket {bucket}");
    assert!(is_token(parts[2]), "bucket {bucket}");
}

/// Checks the `digits{4}/digits{1,2}/` shape.
fn assert_time_shape(bucket: &str) {
    let parts: Vec<&str> = bucket.split('/').collect();
    assert_eq!(parts.len(), 3, "bucket {bucket}");
    assert_eq!(parts[0].len(), 4);
    assert!(parts[0].chars().all(|ch| ch.is_ascii_digit()));
    assert!((1 ..= 2).contains(&parts[1].len()));
    assert!(parts[1].chars().all(|ch| ch.is_ascii_digit()));
    assert_eq!(parts[2], "");
}

proptest! {
    #[test]
    fn identity_bucket_is_deterministic_and_well_formed(identifier in ".{0,40}") {
        let first = identity_bucket(identifier.as_str());
        let second = identity_bucket(identifier.as_str());
        prop_assert_eq!(&first, &second);
        assert_identity_shape(&first);
    }

    #[test]
    fn dots_become_underscores(stem in "[a-z]{1,10}") {
        let bucket = identity_bucket(format!("{stem}.").as_str());
        let expected_suffix = format!("/{stem}_/");
        prop_assert!(bucket.ends_with(&expected_suffix));
    }

    #[test]
    fn time_and_pool_buckets_are_well_formed(
        seconds in -377_000_000_000_i64 .. 253_000_000_000_i64,
        identifier in ".{0,20}",
    ) {
        let at = OffsetDateTime::from_unix_timestamp(seconds).unwrap();
        let time = time_bucket(at);
        assert_time_shape(&time);
        let pool = pool_bucket(identifier.as_str(), at);
        prop_assert!(pool.starts_with(&time));
        prop_assert!(pool.ends_with(&identity_bucket(identifier.as_str())));
        assert_identity_shape(&pool[time.len() ..]);
    }

    #[test]
    fn normalize_is_idempotent(path in "[a-c/]{0,24}") {
        let once = normalize_path(&path);
        prop_assert_eq!(normalize_path(&once), once.clone());
        prop_assert!(once.starts_with('/'));
        prop_assert!(once == "/" || !once.ends_with('/'));
        prop_assert!(!once.contains("//"));
    }

    #[test]
    fn parent_is_a_normalized_prefix(path in "[a-c/]{0,24}") {
        let normalized = normalize_path(&path);
        let parent = parent_path(&path);
        prop_assert_eq!(normalize_path(&parent), parent.clone());
        prop_assert!(normalized.starts_with(&parent));
    }
}
