//! Per-session identity cache.
//!
//! # Purpose
//! Remember the resolved identity for each session so the CMS is asked at
//! most once per session, with concurrent resolves for the same session
//! sharing a single in-flight fetch.
//!
//! # Key invariants
//! - Sessions are keyed by a SHA-256 digest of the bearer token; raw tokens
//!   never land in the map, logs, or metrics.
//! - A failed fetch is never cached. The caller is treated as
//!   unauthenticated for that request and the next resolve retries.
//! - `invalidate` and `refresh` are the only ways a cached identity leaves
//!   the store; there is no TTL.
//!
//! # Concurrency model
//! The session map is a `DashMap` of per-session `tokio::sync::OnceCell`
//! slots. The cell serializes initializers, so whichever resolve wins runs
//! the fetch and every waiter reads its value.
use crate::auth::identity::IdentityProvider;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::OnceCell;
use wwky_access::Identity;

/// Session-scoped identity cache over an [`IdentityProvider`].
pub struct PolicyStore {
    provider: Arc<dyn IdentityProvider>,
    sessions: DashMap<String, Arc<OnceCell<Arc<Identity>>>>,
}

impl PolicyStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            sessions: DashMap::new(),
        }
    }

    /// Resolve the identity for `token`, fetching it on first sight.
    ///
    /// # What it does
    /// Returns the cached identity when the session is known. Otherwise one
    /// fetch runs against the provider; concurrent callers for the same
    /// session await that fetch instead of issuing their own.
    ///
    /// `None` means the identity could not be resolved and the caller is
    /// unauthenticated for this request. The failure is not cached.
    pub async fn resolve(&self, token: &str) -> Option<Arc<Identity>> {
        let key = session_key(token);
        let cell = {
            let entry = self
                .sessions
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };
        metrics::gauge!("wwky_sessions_active").set(self.sessions.len() as f64);

        let fetched = cell
            .get_or_try_init(|| async {
                self.provider.fetch_identity(token).await.map(Arc::new)
            })
            .await;
        match fetched {
            Ok(identity) => Some(Arc::clone(identity)),
            Err(error) => {
                metrics::counter!("wwky_identity_fetch_failures_total").increment(1);
                tracing::warn!(error = %error, "identity fetch failed; treating caller as unauthenticated");
                None
            }
        }
    }

    /// Drop the cached identity for `token`. Returns whether one existed.
    pub fn invalidate(&self, token: &str) -> bool {
        let existed = self.sessions.remove(&session_key(token)).is_some();
        metrics::gauge!("wwky_sessions_active").set(self.sessions.len() as f64);
        existed
    }

    /// Discard the cached identity and resolve again.
    pub async fn refresh(&self, token: &str) -> Option<Arc<Identity>> {
        self.invalidate(token);
        self.resolve(token).await
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Cache key for a bearer token. Hashing keeps token material out of the
/// map and anything that might dump it.
fn session_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
