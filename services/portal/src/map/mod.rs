//! Map data loading and view state for the portal gateway.
//!
//! # Purpose and responsibility
//! Pulls sampling data from the flat feed and reference data from the CMS,
//! folds it with `wwky-mapdata`, and keeps the result in per-view state
//! that the map API serves. Split into:
//! - `cms`: Directus-style collection client for hubs, site details, and
//!   sample collections
//! - `feed`: the public flat sample feed client
//! - `fetch`: one aggregation pass across all enabled sources
//! - `view`: the registry of live map views and their refresh generations
//!
//! # Key invariants
//! - One source failing never fails a pass; it contributes an empty
//!   collection and an error message on the owning view.
//! - A pass only lands on a view if no newer refresh started after it.

pub mod cms;
pub mod feed;
pub mod fetch;
pub mod view;

/// Failure while loading one upstream source. Per-source and non-fatal:
/// the pass records the message and renders without that source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{source_name} request failed")]
    Http {
        source_name: &'static str,
        #[source]
        cause: reqwest::Error,
    },
    #[error("{source_name} request returned status {status}")]
    Status {
        source_name: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{source_name} payload could not be decoded")]
    Decode {
        source_name: &'static str,
        #[source]
        cause: reqwest::Error,
    },
}

impl FetchError {
    /// The short source label used in logs, metrics, and view error slots.
    pub fn source_name(&self) -> &'static str {
        match self {
            FetchError::Http { source_name, .. }
            | FetchError::Status { source_name, .. }
            | FetchError::Decode { source_name, .. } => source_name,
        }
    }
}
