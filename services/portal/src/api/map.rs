//! Map view API handlers.
//!
//! # Purpose and responsibility
//! Creates and serves map views: aggregation snapshots, per-category layer
//! state, the folded site and hub collections, site search, and navigation
//! targets.
//!
//! # Where it fits in the portal
//! Everything here reads or mutates one view in the registry. Upstream
//! fetches happen only in `create_view` and `refresh_view`; every other
//! handler answers from the view's last applied pass.
//!
//! # Key invariants and assumptions
//! - A refresh never blocks reads; passes land atomically or not at all.
//! - Layer visibility is a preference that outlives layer construction, so
//!   toggling a layer whose data has not arrived is valid and remembered.
use crate::api::error::{ApiError, api_not_found, api_validation_error};
use crate::api::types::{
    BiologicalListResponse, CreateViewRequest, ErrorResponse, HabitatListResponse, HubListResponse,
    LayerDetail, LayerState, LocateResponse, SearchResponse, SetVisibleRequest, SiteListResponse,
    UserSitesRequest, ViewSnapshot,
};
use crate::app::AppState;
use crate::map::fetch::ViewOptions;
use crate::map::view::MapView;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use wwky_mapdata::{
    Graphic, KENTUCKY_BOUNDS, KENTUCKY_CENTER, KENTUCKY_ZOOM, LayerCategory, Site,
};

/// Zoom for jumping to a single located site.
const SITE_ZOOM: u8 = 12;

#[utoipa::path(
    post,
    path = "/v1/map/views",
    tag = "map",
    request_body = CreateViewRequest,
    responses(
        (status = 201, description = "View created and first pass applied", body = ViewSnapshot)
    )
)]
/// Create a map view and run its first aggregation pass.
///
/// # What it does
/// Registers the view, fetches every enabled source concurrently, folds the
/// results, and returns the first snapshot. Source failures land in the
/// snapshot's error slot instead of failing the request.
///
/// # Errors
/// - 404 only in the rare case the view was evicted while its first pass
///   was in flight.
pub(crate) async fn create_view(
    State(state): State<AppState>,
    Json(request): Json<CreateViewRequest>,
) -> Result<(StatusCode, Json<ViewSnapshot>), ApiError> {
    let options = ViewOptions {
        include_biological: request.include_biological,
        include_habitat: request.include_habitat,
        feed: request.feed,
    };
    let (view_id, generation) = state.views.create(options.clone()).await;
    tracing::info!(
        view_id = %view_id,
        include_biological = options.include_biological,
        include_habitat = options.include_habitat,
        "created map view"
    );

    let pass = state.sources.load(&options).await;
    state.views.apply_pass(&view_id, generation, pass).await;

    let snapshot = super::with_view(&state, &view_id, view_snapshot).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 200, description = "Current view snapshot", body = ViewSnapshot),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Return the view's current snapshot.
pub(crate) async fn get_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ViewSnapshot>, ApiError> {
    let snapshot = super::with_view(&state, &view_id, view_snapshot).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    delete,
    path = "/v1/map/views/{view_id}",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 204, description = "View removed"),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Tear the view down.
pub(crate) async fn delete_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.views.remove(&view_id).await {
        return Err(api_not_found("view not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/map/views/{view_id}/refresh",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 200, description = "Snapshot after the refresh", body = ViewSnapshot),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Re-run the view's aggregation pass.
///
/// # What it does
/// Reserves the next refresh generation, fetches outside the registry lock,
/// and applies the pass only if no newer refresh started meanwhile. The
/// returned snapshot is whatever the view serves afterwards, which for a
/// superseded refresh is the newer refresh's data.
///
/// # Errors
/// - 404 when the view does not exist or was evicted mid-refresh.
pub(crate) async fn refresh_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ViewSnapshot>, ApiError> {
    let Some(generation) = state.views.begin_refresh(&view_id).await else {
        return Err(api_not_found("view not found"));
    };
    let options = super::with_view(&state, &view_id, |view| view.options.clone()).await?;

    let pass = state.sources.load(&options).await;
    state.views.apply_pass(&view_id, generation, pass).await;

    let snapshot = super::with_view(&state, &view_id, view_snapshot).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    post,
    path = "/v1/map/views/{view_id}/layers/{category}/toggle",
    tag = "map",
    params(
        ("view_id" = String, Path, description = "View id"),
        ("category" = String, Path, description = "Layer category name")
    ),
    responses(
        (status = 200, description = "Layer state after the toggle", body = LayerState),
        (status = 400, description = "Unknown category", body = ErrorResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Flip a layer's visibility.
///
/// # What it does
/// Flips the recorded preference and, when the layer has been constructed,
/// the layer itself. Before construction only the preference moves; the
/// handle picks it up when its data arrives.
pub(crate) async fn toggle_layer(
    State(state): State<AppState>,
    Path((view_id, category)): Path<(String, String)>,
) -> Result<Json<LayerState>, ApiError> {
    let category = parse_category(&category)?;
    let after = super::with_view_mut(&state, &view_id, |view| {
        view.layers.toggle(category);
        layer_state(view, category)
    })
    .await?;
    Ok(Json(after))
}

#[utoipa::path(
    put,
    path = "/v1/map/views/{view_id}/layers/{category}",
    tag = "map",
    params(
        ("view_id" = String, Path, description = "View id"),
        ("category" = String, Path, description = "Layer category name")
    ),
    request_body = SetVisibleRequest,
    responses(
        (status = 200, description = "Layer state after the change", body = LayerState),
        (status = 400, description = "Unknown category", body = ErrorResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Set a layer's visibility outright.
pub(crate) async fn set_layer_visibility(
    State(state): State<AppState>,
    Path((view_id, category)): Path<(String, String)>,
    Json(request): Json<SetVisibleRequest>,
) -> Result<Json<LayerState>, ApiError> {
    let category = parse_category(&category)?;
    let after = super::with_view_mut(&state, &view_id, |view| {
        view.layers.set_visible(category, request.visible);
        layer_state(view, category)
    })
    .await?;
    Ok(Json(after))
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/layers/{category}",
    tag = "map",
    params(
        ("view_id" = String, Path, description = "View id"),
        ("category" = String, Path, description = "Layer category name")
    ),
    responses(
        (status = 200, description = "Layer graphics and extent", body = LayerDetail),
        (status = 400, description = "Unknown category", body = ErrorResponse),
        (status = 404, description = "Unknown view, or layer not constructed yet", body = ErrorResponse)
    )
)]
/// Return a constructed layer's graphics and extent.
///
/// # Errors
/// - 404 until the category's data source has produced data for this view.
pub(crate) async fn get_layer(
    State(state): State<AppState>,
    Path((view_id, category)): Path<(String, String)>,
) -> Result<Json<LayerDetail>, ApiError> {
    let category = parse_category(&category)?;
    let detail = super::with_view(&state, &view_id, |view| {
        view.layers.layer(category).map(|layer| LayerDetail {
            category,
            visible: layer.visible,
            graphics: layer.graphics.clone(),
            extent: layer.extent(),
        })
    })
    .await?;
    detail
        .map(Json)
        .ok_or_else(|| api_not_found("layer not constructed yet"))
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/sites",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 200, description = "Folded sampled sites in first-seen order", body = SiteListResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// List the view's folded sampled sites.
pub(crate) async fn list_sites(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<SiteListResponse>, ApiError> {
    let items = super::with_view(&state, &view_id, |view| view.data.sites.clone()).await?;
    Ok(Json(SiteListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/hubs",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 200, description = "Support hubs", body = HubListResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// List the view's support hubs.
pub(crate) async fn list_hubs(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<HubListResponse>, ApiError> {
    let items = super::with_view(&state, &view_id, |view| view.data.hubs.clone()).await?;
    Ok(Json(HubListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/biological",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 200, description = "Biological sample bags joined to their sites", body = BiologicalListResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// List the view's biological sample bags. Empty unless the view opted in.
pub(crate) async fn list_biological(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<BiologicalListResponse>, ApiError> {
    let items = super::with_view(&state, &view_id, |view| view.data.biological.clone()).await?;
    Ok(Json(BiologicalListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/habitat",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    responses(
        (status = 200, description = "Habitat sample bags joined to their sites", body = HabitatListResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// List the view's habitat sample bags. Empty unless the view opted in.
pub(crate) async fn list_habitat(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<HabitatListResponse>, ApiError> {
    let items = super::with_view(&state, &view_id, |view| view.data.habitat.clone()).await?;
    Ok(Json(HabitatListResponse { items }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/search",
    tag = "map",
    params(
        ("view_id" = String, Path, description = "View id"),
        ("q" = Option<String>, Query, description = "Name or site id fragment")
    ),
    responses(
        (status = 200, description = "Matching sites, capped, in view order", body = SearchResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Search the view's sites by stream name or site id fragment.
///
/// # What it does
/// Case-insensitive substring match against the view's current site list.
/// An empty or missing query matches nothing.
pub(crate) async fn search_sites(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.unwrap_or_default();
    let items = super::with_view(&state, &view_id, |view| {
        view.search
            .search(&query)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>()
    })
    .await?;
    Ok(Json(SearchResponse { items }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocateParams {
    #[serde(default)]
    zoom: Option<u8>,
}

#[utoipa::path(
    get,
    path = "/v1/map/views/{view_id}/sites/{site_id}/locate",
    tag = "map",
    params(
        ("view_id" = String, Path, description = "View id"),
        ("site_id" = i64, Path, description = "Site id"),
        ("zoom" = Option<u8>, Query, description = "Desired zoom, defaults to site zoom")
    ),
    responses(
        (status = 200, description = "Navigation target for the site", body = LocateResponse),
        (status = 404, description = "Unknown view, or site not in this view", body = ErrorResponse)
    )
)]
/// Return the navigation target for one of the view's sites.
///
/// # What it does
/// Answers with the site's coordinates and the requested zoom. A site with
/// missing or out-of-state coordinates gets the statewide center and zoom
/// with `fallback` set, so the map always lands somewhere sensible.
pub(crate) async fn locate_site(
    State(state): State<AppState>,
    Path((view_id, site_id)): Path<(String, i64)>,
    Query(params): Query<LocateParams>,
) -> Result<Json<LocateResponse>, ApiError> {
    let located = super::with_view(&state, &view_id, |view| {
        view.data
            .sites
            .iter()
            .find(|site| site.id == site_id)
            .map(|site| locate_response(site, params.zoom))
    })
    .await?;
    located
        .map(Json)
        .ok_or_else(|| api_not_found("site not in this view"))
}

#[utoipa::path(
    post,
    path = "/v1/map/views/{view_id}/user-sites",
    tag = "map",
    params(("view_id" = String, Path, description = "View id")),
    request_body = UserSitesRequest,
    responses(
        (status = 200, description = "User-sites layer state after the attach", body = LayerState),
        (status = 404, description = "Unknown view", body = ErrorResponse)
    )
)]
/// Attach the caller's personal sites as a highlighted overlay.
///
/// # What it does
/// Replaces the user-sites layer with graphics for every record that has
/// coordinates and turns the layer on. The overlay survives refreshes; only
/// another attach replaces it.
pub(crate) async fn attach_user_sites(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(request): Json<UserSitesRequest>,
) -> Result<Json<LayerState>, ApiError> {
    let after = super::with_view_mut(&state, &view_id, |view| {
        let graphics: Vec<Graphic> = request
            .sites
            .iter()
            .filter_map(Graphic::for_user_site)
            .collect();
        view.layers.set_graphics(LayerCategory::UserSites, graphics);
        view.layers.set_visible(LayerCategory::UserSites, true);
        layer_state(view, LayerCategory::UserSites)
    })
    .await?;
    Ok(Json(after))
}

fn parse_category(raw: &str) -> Result<LayerCategory, ApiError> {
    raw.parse::<LayerCategory>()
        .map_err(|err| api_validation_error(&err.to_string()))
}

pub(crate) fn view_snapshot(view: &MapView) -> ViewSnapshot {
    ViewSnapshot {
        view_id: view.id.clone(),
        generation: view.generation(),
        include_biological: view.options.include_biological,
        include_habitat: view.options.include_habitat,
        site_count: view.data.sites.len(),
        hub_count: view.data.hubs.len(),
        biological_site_count: view.data.biological.len(),
        habitat_site_count: view.data.habitat.len(),
        layers: LayerCategory::ALL
            .iter()
            .map(|&category| layer_state(view, category))
            .collect(),
        errors: view.data.errors.clone(),
    }
}

fn layer_state(view: &MapView, category: LayerCategory) -> LayerState {
    match view.layers.layer(category) {
        Some(layer) => LayerState {
            category,
            visible: layer.visible,
            constructed: true,
            graphic_count: layer.graphics.len(),
        },
        None => LayerState {
            category,
            visible: view.layers.preference(category),
            constructed: false,
            graphic_count: 0,
        },
    }
}

fn locate_response(site: &Site, zoom: Option<u8>) -> LocateResponse {
    match (site.longitude, site.latitude) {
        (Some(longitude), Some(latitude)) if KENTUCKY_BOUNDS.contains(longitude, latitude) => {
            LocateResponse {
                site_id: site.id,
                longitude,
                latitude,
                zoom: zoom.unwrap_or(SITE_ZOOM),
                fallback: false,
            }
        }
        _ => {
            tracing::warn!(
                site_id = site.id,
                "site has no usable coordinates; centering statewide"
            );
            LocateResponse {
                site_id: site.id,
                longitude: KENTUCKY_CENTER.0,
                latitude: KENTUCKY_CENTER.1,
                zoom: KENTUCKY_ZOOM,
                fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: i64, longitude: Option<f64>, latitude: Option<f64>) -> Site {
        Site {
            id,
            stream_name: "Clarks Run".to_string(),
            basin: String::new(),
            description: String::new(),
            longitude,
            latitude,
            sample_count: 1,
            has_samples: true,
            latest_sample_date: None,
            ecoli_sample_count: 0,
            biological_sample_count: 0,
            habitat_sample_count: 0,
        }
    }

    #[test]
    fn locate_uses_site_coordinates_and_requested_zoom() {
        let located = locate_response(&site(1089, Some(-84.84), Some(37.65)), Some(15));
        assert_eq!(located.longitude, -84.84);
        assert_eq!(located.zoom, 15);
        assert!(!located.fallback);

        let default_zoom = locate_response(&site(1089, Some(-84.84), Some(37.65)), None);
        assert_eq!(default_zoom.zoom, SITE_ZOOM);
    }

    #[test]
    fn locate_falls_back_statewide_for_unusable_coordinates() {
        let missing = locate_response(&site(7, None, Some(37.65)), Some(15));
        assert!(missing.fallback);
        assert_eq!(missing.longitude, KENTUCKY_CENTER.0);
        assert_eq!(missing.zoom, KENTUCKY_ZOOM);

        let out_of_state = locate_response(&site(7, Some(-120.0), Some(37.65)), None);
        assert!(out_of_state.fallback);
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let error = parse_category("rivers").expect_err("error");
        assert_eq!(error.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(parse_category("biological").is_ok());
    }
}
