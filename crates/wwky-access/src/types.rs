//! Strongly typed identifiers for the access model.
//!
//! # Purpose
//! Wraps the opaque role and policy ids handed out by the identity service so
//! they cannot be mixed up with each other or with arbitrary strings.
//!
//! # Key invariants
//! - The wrappers preserve the inner string exactly; no validation happens
//!   here. Ids are whatever the identity service mints (typically UUIDs).
use serde::{Deserialize, Serialize};

/// Role identifier wrapper.
///
/// A caller holds at most one role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Policy identifier wrapper.
///
/// Policies are named permission grants independent of the role; a caller
/// holds an unordered set of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved caller identity as the evaluator sees it.
///
/// Produced from the identity service's `/users/me` payload. An
/// unauthenticated caller is represented by the absence of an `Identity`,
/// not by an empty one; an authenticated caller with no role and no
/// policies is a valid, very unprivileged identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub role_id: Option<RoleId>,
    pub policy_ids: Vec<PolicyId>,
}

impl Identity {
    pub fn new(role_id: Option<RoleId>, policy_ids: Vec<PolicyId>) -> Self {
        Self {
            role_id,
            policy_ids,
        }
    }

    /// True when the identity holds the given policy.
    pub fn holds_policy(&self, policy: &PolicyId) -> bool {
        self.policy_ids.contains(policy)
    }
}
