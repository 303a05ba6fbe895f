//! Ordered path rule table.
//!
//! Rules restrict path families by prefix (or exact path) and name the roles
//! and policies that may pass. The table is immutable once built and consulted
//! on every request; only the first matching rule governs a path.
use crate::types::{PolicyId, RoleId};
use serde::{Deserialize, Serialize};

/// How a rule's path is compared against a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleMatch {
    /// `path.starts_with(rule.path)`.
    #[default]
    Prefix,
    /// Exact string equality.
    Exact,
}

/// One entry of the access table.
///
/// Empty `roles` or `policies` means that check passes for every caller,
/// including unauthenticated ones. A rule with both sets empty is an
/// explicit always-allow entry, which is how the deny landing page stays
/// reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRule {
    pub path: String,
    #[serde(default)]
    pub matching: RuleMatch,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub policies: Vec<PolicyId>,
}

impl AccessRule {
    pub fn prefix(path: impl Into<String>, roles: Vec<RoleId>, policies: Vec<PolicyId>) -> Self {
        Self {
            path: path.into(),
            matching: RuleMatch::Prefix,
            roles,
            policies,
        }
    }

    pub fn exact(path: impl Into<String>, roles: Vec<RoleId>, policies: Vec<PolicyId>) -> Self {
        Self {
            path: path.into(),
            matching: RuleMatch::Exact,
            roles,
            policies,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.matching {
            RuleMatch::Prefix => path.starts_with(&self.path),
            RuleMatch::Exact => path == self.path,
        }
    }
}

/// Ordered rule list with first-match lookup.
#[derive(Debug, Clone, Default)]
pub struct AccessRuleTable {
    rules: Vec<AccessRule>,
}

impl AccessRuleTable {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// First rule whose path matches, with its position for logging.
    pub fn find(&self, path: &str) -> Option<(usize, &AccessRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(path))
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
