//! Portal HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and shared helpers for resolving the view
//! a request addresses.
pub mod error;
pub mod map;
pub mod openapi;
pub mod session;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_not_found};
use crate::app::AppState;
use crate::map::view::MapView;

pub(crate) async fn with_view<R>(
    state: &AppState,
    view_id: &str,
    f: impl FnOnce(&MapView) -> R,
) -> Result<R, ApiError> {
    state
        .views
        .with_view(view_id, f)
        .await
        .ok_or_else(|| api_not_found("view not found"))
}

pub(crate) async fn with_view_mut<R>(
    state: &AppState,
    view_id: &str,
    f: impl FnOnce(&mut MapView) -> R,
) -> Result<R, ApiError> {
    state
        .views
        .with_view_mut(view_id, f)
        .await
        .ok_or_else(|| api_not_found("view not found"))
}
