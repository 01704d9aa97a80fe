// crates/activity-feed-core/src/core/access.rs
// ============================================================================
// Module: Activity Feed Access Model
// Description: Privileges, principals, and access rule resolution.
// Purpose: Provide one access evaluation used by every reference store.
// Dependencies: serde, crate::core::{identifiers, paths}
// ============================================================================

//! ## Overview
//! Access rules are attached to store paths. Resolution walks from the target
//! path towards the root and the nearest level with a matching rule decides.
//! Within a level, rules naming the user win over `Everyone` rules, and a deny
//! wins over an allow of the same specificity. No matching rule means deny.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::UserId;
use crate::core::paths::ancestors;

// ============================================================================
// SECTION: Privileges
// ============================================================================

/// Privilege checked against a store path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// Read a node and its properties.
    #[default]
    Read,
    /// Create and modify nodes.
    Write,
    /// Every privilege.
    All,
}

impl Privilege {
    /// Returns the stable label for the privilege.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::All => "all",
        }
    }

    /// Parses a stable privilege label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Returns true when holding `self` grants `requested`.
    #[must_use]
    pub fn covers(self, requested: Self) -> bool {
        self == Self::All || self == requested
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Principal an access rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    /// A single user.
    User(UserId),
    /// Every identity.
    Everyone,
}

impl Principal {
    /// Returns the stable storage label (`user:<id>` or `everyone`).
    #[must_use]
    pub fn storage_label(&self) -> String {
        match self {
            Self::User(user) => format!("user:{user}"),
            Self::Everyone => "everyone".to_string(),
        }
    }

    /// Parses a storage label produced by [`Principal::storage_label`].
    #[must_use]
    pub fn from_storage_label(label: &str) -> Option<Self> {
        if label == "everyone" {
            return Some(Self::Everyone);
        }
        label.strip_prefix("user:").map(|id| Self::User(UserId::new(id)))
    }
}

/// Allow or deny rule attached to a store path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRule {
    /// Principal the rule applies to.
    pub principal: Principal,
    /// Privilege the rule grants or denies.
    pub privilege: Privilege,
    /// True for allow, false for deny.
    pub allow: bool,
}

impl AccessRule {
    /// Creates an allow rule.
    #[must_use]
    pub const fn allow(principal: Principal, privilege: Privilege) -> Self {
        Self {
            principal,
            privilege,
            allow: true,
        }
    }

    /// Creates a deny rule.
    #[must_use]
    pub const fn deny(principal: Principal, privilege: Privilege) -> Self {
        Self {
            principal,
            privilege,
            allow: false,
        }
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves whether `user` holds `privilege` on `path`.
///
/// `rules_at` returns the rules attached to exactly one path.
///
/// # Errors
///
/// Propagates the first error returned by `rules_at`.
pub fn resolve_access<E, F>(
    path: &str,
    user: &UserId,
    privilege: Privilege,
    mut rules_at: F,
) -> Result<bool, E>
where
    F: FnMut(&str) -> Result<Vec<AccessRule>, E>,
{
    for level in ancestors(path) {
        let rules = rules_at(&level)?;
        if let Some(decision) = decide_level(&rules, user, privilege) {
            return Ok(decision);
        }
    }
    Ok(false)
}

/// Decides access from the rules of a single level, if any rule applies.
fn decide_level(rules: &[AccessRule], user: &UserId, privilege: Privilege) -> Option<bool> {
    let user_principal = Principal::User(user.clone());
    decide_for(rules, &user_principal, privilege)
        .or_else(|| decide_for(rules, &Principal::Everyone, privilege))
}

/// Decides access for one principal; deny beats allow.
fn decide_for(rules: &[AccessRule], principal: &Principal, privilege: Privilege) -> Option<bool> {
    let mut decision = None;
    for rule in rules
        .iter()
        .filter(|rule| &rule.principal == principal && rule.privilege.covers(privilege))
    {
        if !rule.allow {
            return Some(false);
        }
        decision = Some(true);
    }
    decision
}
