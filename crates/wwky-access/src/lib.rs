//! Access-control primitives shared by the Watershed Watch portal services.
//!
//! # Purpose
//! Centralizes the route access model: strongly typed role/policy identifiers,
//! the ordered path rule table, and the allow/deny evaluator.
//!
//! # How it fits
//! The portal gateway resolves a caller identity from the identity service,
//! then asks [`evaluate`] whether the requested path is reachable for that
//! identity. Rules are ordered and the first match governs the decision.
//!
//! # Key invariants
//! - A path with no matching rule is allowed. The table only restricts the
//!   path families it explicitly lists.
//! - A matching rule allows when its role check or its policy check passes;
//!   an empty requirement set passes for everyone.
//!
//! # Examples
//! ```rust
//! use wwky_access::{AccessRule, AccessRuleTable, Identity, PolicyId, RoleId, evaluate};
//!
//! let table = AccessRuleTable::new(vec![AccessRule::prefix(
//!     "/portal/sample",
//!     vec![],
//!     vec![PolicyId::new("sampler")],
//! )]);
//! let caller = Identity::new(Some(RoleId::new("standard")), vec![PolicyId::new("sampler")]);
//! assert!(evaluate(&table, "/portal/sample/new", Some(&caller)).is_allowed());
//! assert!(evaluate(&table, "/about", None).is_allowed());
//! ```
//!
//! # Common pitfalls
//! - Rule order is significant. Put the more specific path first or it will
//!   never be consulted.
//! - An unresolved identifier in a rule never matches anyone; the affected
//!   branch silently becomes unsatisfiable rather than failing open.

mod evaluator;
mod rules;
mod types;

pub use evaluator::{AccessDecision, evaluate};
pub use rules::{AccessRule, AccessRuleTable, RuleMatch};
pub use types::{Identity, PolicyId, RoleId};
