//! Caller identity resolution against the CMS.
//!
//! # Purpose
//! Fetch the CMS `/users/me` record with the caller's bearer token and map
//! the role and policy grant rows into a [`wwky_access::Identity`].
//!
//! # Architectural role
//! This is the only place the gateway talks to the CMS about who a caller
//! is. Everything downstream (the policy store, the gate, the session API)
//! consumes the [`IdentityProvider`] trait, so tests and future identity
//! backends plug in without touching the cache or the gate.
//!
//! # Key invariants
//! - The caller's token is forwarded verbatim; the gateway holds no identity
//!   credentials of its own for this endpoint.
//! - A user without a role or without policy grants is still a valid
//!   identity. Only transport, status, and decode problems are errors.
//!
//! # Security boundary
//! Errors here mean "treat the caller as unauthenticated", never "fail the
//! request". The policy store enforces that downgrade and its retry rules.
use async_trait::async_trait;
use serde::Deserialize;
use wwky_access::{Identity, PolicyId, RoleId};

/// Failures while resolving a caller identity.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity request never produced a response.
    #[error("identity request failed")]
    IdentityFetch(#[source] reqwest::Error),
    /// The CMS answered with a non-success status, typically 401 for an
    /// expired or unknown token.
    #[error("identity service returned status {status}")]
    IdentityStatus { status: reqwest::StatusCode },
    /// The response body did not match the expected user envelope.
    #[error("identity payload could not be decoded")]
    IdentityDecode(#[source] reqwest::Error),
}

/// Source of caller identities, keyed by bearer token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the identity behind `token`.
    ///
    /// # Errors
    /// Returns [`AuthError`] when the upstream cannot be reached, rejects
    /// the token, or answers with an undecodable body.
    async fn fetch_identity(&self, token: &str) -> Result<Identity, AuthError>;
}

/// [`IdentityProvider`] backed by the CMS `/users/me` endpoint.
#[derive(Debug, Clone)]
pub struct CmsIdentityClient {
    client: reqwest::Client,
    base_url: String,
}

impl CmsIdentityClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }
}

#[async_trait]
impl IdentityProvider for CmsIdentityClient {
    async fn fetch_identity(&self, token: &str) -> Result<Identity, AuthError> {
        let url = format!("{}/users/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", "role.id,policies.*")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(AuthError::IdentityFetch)?;
        if !response.status().is_success() {
            return Err(AuthError::IdentityStatus {
                status: response.status(),
            });
        }
        let envelope: MeEnvelope = response.json().await.map_err(AuthError::IdentityDecode)?;
        Ok(envelope.data.into_identity())
    }
}

#[derive(Debug, Deserialize)]
struct MeEnvelope {
    data: MePayload,
}

/// The slice of the CMS user record the gateway cares about. `policies`
/// holds grant rows from the access junction table, where `policy` is the
/// granted policy id.
#[derive(Debug, Deserialize)]
struct MePayload {
    #[serde(default)]
    role: Option<MeRole>,
    #[serde(default)]
    policies: Vec<MePolicyGrant>,
}

#[derive(Debug, Deserialize)]
struct MeRole {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MePolicyGrant {
    #[serde(default)]
    policy: Option<String>,
}

impl MePayload {
    fn into_identity(self) -> Identity {
        let role_id = self.role.and_then(|role| role.id).map(RoleId::new);
        let policy_ids = self
            .policies
            .into_iter()
            .filter_map(|grant| grant.policy)
            .map(PolicyId::new)
            .collect();
        Identity::new(role_id, policy_ids)
    }
}
