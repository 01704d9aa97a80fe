// crates/activity-feed-core/src/core/paths.rs
// ============================================================================
// Module: Activity Feed Path Sharding
// Description: Hashed bucket paths, time buckets, and path normalization.
// Purpose: Keep high fan-out containers from collapsing into one wide node.
// Dependencies: sha1, time
// ============================================================================

//! ## Overview
//! Every function in this module is pure and total. Degenerate input falls
//! back to a defined value instead of failing.
//!
//! Identity buckets hash the raw identifier with SHA-1 and use the first two
//! digest bytes as two uppercase hex segments, followed by a sanitized copy of
//! the identifier:
//!
//! ```text
//! identity_bucket("Lorem") == "/22/C6/Lorem/"
//! identity_bucket("")      == "/61/51/anon/"
//! ```
//!
//! Invariants:
//! - `normalize_path` is idempotent and always yields a leading separator.
//! - The parent of the root (and of the empty path) is the root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha1::Digest;
use sha1::Sha1;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path separator used by the content repository.
pub const SEPARATOR: char = '/';
/// Root path of the content repository.
pub const ROOT_PATH: &str = "/";
/// Identifier hashed in place of an empty or missing identifier.
pub const ANONYMOUS_IDENTIFIER: &str = "anon";
/// Replacement character for identifier characters outside the token alphabet.
const SANITIZED_REPLACEMENT: char = '_';
/// Largest year rendered in a calendar bucket.
const MAX_BUCKET_YEAR: i32 = 9999;
/// Uppercase hex alphabet for bucket segments.
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

// ============================================================================
// SECTION: Buckets
// ============================================================================

/// Returns the identity bucket for an identifier: `/XX/YY/token/`.
///
/// Empty and missing identifiers map to the anonymous bucket `/61/51/anon/`.
#[must_use]
pub fn identity_bucket<'a>(identifier: impl Into<Option<&'a str>>) -> String {
    let identifier = match identifier.into() {
        Some(value) if !value.is_empty() => value,
        _ => ANONYMOUS_IDENTIFIER,
    };
    let digest = Sha1::digest(identifier.as_bytes());
    let token = sanitize_identifier(identifier);
    let mut out = String::with_capacity(token.len() + 8);
    out.push(SEPARATOR);
    push_hex_byte(&mut out, digest[0]);
    out.push(SEPARATOR);
    push_hex_byte(&mut out, digest[1]);
    out.push(SEPARATOR);
    out.push_str(&token);
    out.push(SEPARATOR);
    out
}

/// Returns the calendar bucket `year/month/` for a timestamp (month unpadded).
///
/// Years are clamped to `0000..=9999` so the year segment is always four digits.
#[must_use]
pub fn time_bucket(at: OffsetDateTime) -> String {
    let year = at.year().clamp(0, MAX_BUCKET_YEAR);
    format!("{year:04}/{}/", u8::from(at.month()))
}

/// Returns the calendar bucket for the current UTC time.
#[must_use]
pub fn current_time_bucket() -> String {
    time_bucket(OffsetDateTime::now_utc())
}

/// Returns the pool bucket `year/month//XX/YY/token/` for an identifier.
///
/// The suffix after the calendar segments is exactly [`identity_bucket`].
#[must_use]
pub fn pool_bucket<'a>(identifier: impl Into<Option<&'a str>>, at: OffsetDateTime) -> String {
    let mut out = time_bucket(at);
    out.push_str(&identity_bucket(identifier));
    out
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
#[must_use]
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                SANITIZED_REPLACEMENT
            }
        })
        .collect()
}

/// Appends a byte as two uppercase hex characters.
fn push_hex_byte(out: &mut String, byte: u8) {
    out.push(char::from(HEX_UPPER[usize::from(byte >> 4)]));
    out.push(char::from(HEX_UPPER[usize::from(byte & 0x0f)]));
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Collapses separator runs, strips a trailing separator, and ensures a leading one.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split(SEPARATOR).filter(|segment| !segment.is_empty()) {
        out.push(SEPARATOR);
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push(SEPARATOR);
    }
    out
}

/// Returns the normalized path with its last segment removed.
#[must_use]
pub fn parent_path(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind(SEPARATOR) {
        Some(index) if index > 0 => normalized[.. index].to_string(),
        _ => ROOT_PATH.to_string(),
    }
}

/// Returns the last segment of the normalized path (empty for the root).
#[must_use]
pub fn last_element(path: &str) -> String {
    let normalized = normalize_path(path);
    normalized.rsplit(SEPARATOR).next().unwrap_or_default().to_string()
}

/// Joins a child segment onto a base path and normalizes the result.
#[must_use]
pub fn join_path(base: &str, child: &str) -> String {
    normalize_path(&format!("{base}{SEPARATOR}{child}"))
}

/// Returns the sharded location of `name` below `parent`, with `suffix` appended.
///
/// `hashed_path("/feed", "Lorem", "")` is `/feed/22/C6/Lorem`.
#[must_use]
pub fn hashed_path(parent: &str, name: &str, suffix: &str) -> String {
    normalize_path(&format!("{parent}{}{suffix}", identity_bucket(name)))
}

/// Returns true when `path` equals `ancestor` or lies below it.
#[must_use]
pub fn is_descendant_or_self(path: &str, ancestor: &str) -> bool {
    let path = normalize_path(path);
    let ancestor = normalize_path(ancestor);
    if ancestor == ROOT_PATH || path == ancestor {
        return true;
    }
    path.strip_prefix(&ancestor).is_some_and(|rest| rest.starts_with(SEPARATOR))
}

/// Iterates a path and each of its ancestors, ending with the root.
#[must_use]
pub fn ancestors(path: &str) -> Ancestors {
    Ancestors {
        next: Some(normalize_path(path)),
    }
}

/// Iterator returned by [`ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors {
    /// Next path to yield.
    next: Option<String>,
}

impl Iterator for Ancestors {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if current != ROOT_PATH {
            self.next = Some(parent_path(&current));
        }
        Some(current)
    }
}
