//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Provides lightweight endpoints for service metadata and health checks.
//!
//! # Where it fits in the portal
//! Used by probes and the frontend to discover map defaults and confirm the
//! gateway is up without touching any upstream.
//!
//! # Key invariants and assumptions
//! - Health checks must be fast and side-effect free; they report which
//!   upstreams are configured, never whether they currently answer.
//! - System info is derived from in-memory configuration.
//!
//! # Security considerations
//! - These endpoints are read-only but still reveal deployment metadata.
use crate::api::types::{HealthStatus, MapDefaults, SystemInfo};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use wwky_mapdata::{KENTUCKY_CENTER, KENTUCKY_ZOOM};

#[utoipa::path(
    get,
    path = "/v1/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service identity and map defaults", body = SystemInfo)
    )
)]
/// Return gateway identity and the statewide map defaults.
///
/// # What it does
/// Exposes the service name, API version, and the Kentucky center/zoom the
/// frontend uses before any view exists.
///
/// # Errors
/// - Does not return errors.
pub(crate) async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    // Build the response from in-memory configuration (no I/O).
    Json(SystemInfo {
        service: state.service_name.clone(),
        api_version: state.api_version.clone(),
        map_defaults: MapDefaults {
            longitude: KENTUCKY_CENTER.0,
            latitude: KENTUCKY_CENTER.1,
            zoom: KENTUCKY_ZOOM,
        },
    })
}

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Gateway health and configured upstreams", body = HealthStatus)
    )
)]
/// Return gateway health status.
///
/// # What it does
/// Reports liveness and summarizes the configured upstreams. Upstream
/// outages surface per view instead, so a flaky CMS never fails probes.
///
/// # Errors
/// - Does not return errors.
pub(crate) async fn system_health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        upstreams: state.upstreams.clone(),
    })
}
