//! Authentication and access control for the portal gateway.
//!
//! # Purpose and responsibility
//! Resolves caller identities against the CMS, caches them per session, and
//! gates every request against the route rule table. Split into:
//! - `identity`: the CMS `/users/me` client behind the [`identity::IdentityProvider`] trait
//! - `policy_store`: the per-session identity cache with single-flight fetches
//! - `gate`: the router-level middleware that allows or redirects requests
//!
//! # Key invariants and assumptions
//! - The gateway never mints or validates tokens itself; the CMS is the sole
//!   authority and the bearer token is forwarded to it verbatim.
//! - Identity failures degrade the caller to unauthenticated instead of
//!   failing the request.

pub mod gate;
pub mod identity;
pub mod policy_store;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

/// Extract the bearer token from the `Authorization` header.
///
/// # What it does
/// Returns the token following a `Bearer ` scheme prefix, or `None` when the
/// header is absent, malformed, or carries a different scheme.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
