//! Portal HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! The access gate is a plain `layer`, not a `route_layer`, so paths with
//! no matching route are still evaluated against the rule table before any
//! 404 handling. This module centralizes route composition to keep `main`
//! small and testable.
use crate::api;
use crate::api::types::UpstreamSummary;
use crate::auth;
use crate::auth::policy_store::PolicyStore;
use crate::map::fetch::MapSources;
use crate::map::view::ViewRegistry;
use crate::observability;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use wwky_access::AccessRuleTable;

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub upstreams: UpstreamSummary,
    pub rules: Arc<AccessRuleTable>,
    pub policy_store: Arc<PolicyStore>,
    pub sources: Arc<MapSources>,
    pub views: Arc<ViewRegistry>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });
    let gate = axum::middleware::from_fn_with_state(state.clone(), auth::gate::access_gate);

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/openapi.json",
            axum::routing::get(api::openapi::openapi_json),
        )
        .route(
            "/unauthorized",
            axum::routing::get(api::session::unauthorized_landing),
        )
        .route(
            "/v1/session",
            axum::routing::get(api::session::get_session).delete(api::session::delete_session),
        )
        .route(
            "/v1/session/refresh",
            axum::routing::post(api::session::refresh_session),
        )
        .route("/v1/map/views", axum::routing::post(api::map::create_view))
        .route(
            "/v1/map/views/:view_id",
            axum::routing::get(api::map::get_view).delete(api::map::delete_view),
        )
        .route(
            "/v1/map/views/:view_id/refresh",
            axum::routing::post(api::map::refresh_view),
        )
        .route(
            "/v1/map/views/:view_id/layers/:category",
            axum::routing::get(api::map::get_layer).put(api::map::set_layer_visibility),
        )
        .route(
            "/v1/map/views/:view_id/layers/:category/toggle",
            axum::routing::post(api::map::toggle_layer),
        )
        .route(
            "/v1/map/views/:view_id/sites",
            axum::routing::get(api::map::list_sites),
        )
        .route(
            "/v1/map/views/:view_id/hubs",
            axum::routing::get(api::map::list_hubs),
        )
        .route(
            "/v1/map/views/:view_id/biological",
            axum::routing::get(api::map::list_biological),
        )
        .route(
            "/v1/map/views/:view_id/habitat",
            axum::routing::get(api::map::list_habitat),
        )
        .route(
            "/v1/map/views/:view_id/search",
            axum::routing::get(api::map::search_sites),
        )
        .route(
            "/v1/map/views/:view_id/sites/:site_id/locate",
            axum::routing::get(api::map::locate_site),
        )
        .route(
            "/v1/map/views/:view_id/user-sites",
            axum::routing::post(api::map::attach_user_sites),
        )
        .layer(gate)
        .layer(trace_layer)
        .with_state(state)
}
