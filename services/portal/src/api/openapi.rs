//! OpenAPI schema aggregation for the portal API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document,
//! served as plain JSON for docs and client generation.
use crate::api::{
    map, session, system,
    types::{
        BiologicalListResponse, CreateViewRequest, ErrorResponse, HabitatListResponse,
        HealthStatus, HubListResponse, LayerDetail, LayerState, LocateResponse, MapDefaults,
        SearchResponse, SessionView, SetVisibleRequest, SiteListResponse, SystemInfo,
        UnauthorizedPayload, UpstreamSummary, UserSitesRequest, ViewSnapshot,
    },
};
use crate::map::feed::FeedFilters;
use axum::Json;
use utoipa::OpenApi;
use wwky_mapdata::model::{BiologicalSiteSamples, HabitatSiteSamples};
use wwky_mapdata::{
    BioSample, Graphic, HabitatSample, Hub, HubServices, LayerCategory, MapBounds, Site, UserSite,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "wwky-portal",
        version = "v1",
        description = "Watershed Watch portal gateway HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        session::get_session,
        session::refresh_session,
        session::delete_session,
        session::unauthorized_landing,
        map::create_view,
        map::get_view,
        map::delete_view,
        map::refresh_view,
        map::toggle_layer,
        map::set_layer_visibility,
        map::get_layer,
        map::list_sites,
        map::list_hubs,
        map::list_biological,
        map::list_habitat,
        map::search_sites,
        map::locate_site,
        map::attach_user_sites
    ),
    components(schemas(
        SystemInfo,
        MapDefaults,
        HealthStatus,
        UpstreamSummary,
        ErrorResponse,
        SessionView,
        UnauthorizedPayload,
        CreateViewRequest,
        FeedFilters,
        ViewSnapshot,
        LayerState,
        SetVisibleRequest,
        LayerDetail,
        LayerCategory,
        Graphic,
        MapBounds,
        Site,
        SiteListResponse,
        Hub,
        HubServices,
        HubListResponse,
        BioSample,
        HabitatSample,
        BiologicalSiteSamples,
        HabitatSiteSamples,
        BiologicalListResponse,
        HabitatListResponse,
        SearchResponse,
        LocateResponse,
        UserSite,
        UserSitesRequest
    )),
    tags(
        (name = "system", description = "Service metadata and health"),
        (name = "session", description = "Caller identity and the session cache"),
        (name = "map", description = "Map views, layers, and site data")
    )
)]
pub struct ApiDoc;

/// Serve the aggregated document as plain JSON.
pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
