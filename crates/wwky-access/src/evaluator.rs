//! Access decisions for a path and caller.
//!
//! The decision procedure is deliberately small: find the first matching rule,
//! then allow when the caller satisfies the rule's role check or its policy
//! check. A path with no matching rule is allowed; restriction is something a
//! rule opts a path into.
use crate::rules::{AccessRule, AccessRuleTable};
use crate::types::Identity;

/// Outcome of evaluating one request path.
///
/// The rule index is carried for audit logging; `Allow { rule: None }` means
/// no rule claimed the path at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow { rule: Option<usize> },
    Deny { rule: usize },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow { .. })
    }

    /// Index of the governing rule, if any rule matched.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            AccessDecision::Allow { rule } => *rule,
            AccessDecision::Deny { rule } => Some(*rule),
        }
    }
}

/// Evaluate `path` for a caller. `None` is an unauthenticated caller, which
/// also covers identities that failed to load.
pub fn evaluate(
    table: &AccessRuleTable,
    path: &str,
    identity: Option<&Identity>,
) -> AccessDecision {
    let Some((index, rule)) = table.find(path) else {
        return AccessDecision::Allow { rule: None };
    };
    if role_satisfied(rule, identity) || policy_satisfied(rule, identity) {
        AccessDecision::Allow { rule: Some(index) }
    } else {
        AccessDecision::Deny { rule: index }
    }
}

/// An empty role set constrains nothing. A non-empty set requires the caller
/// to be authenticated and hold one of the listed roles.
fn role_satisfied(rule: &AccessRule, identity: Option<&Identity>) -> bool {
    if rule.roles.is_empty() {
        return true;
    }
    let Some(identity) = identity else {
        return false;
    };
    identity
        .role_id
        .as_ref()
        .is_some_and(|role| rule.roles.contains(role))
}

fn policy_satisfied(rule: &AccessRule, identity: Option<&Identity>) -> bool {
    if rule.policies.is_empty() {
        return true;
    }
    let Some(identity) = identity else {
        return false;
    };
    rule.policies
        .iter()
        .any(|policy| identity.holds_policy(policy))
}
