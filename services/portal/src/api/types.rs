//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the portal REST API and OpenAPI schema
//! generation.
use crate::map::feed::FeedFilters;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use wwky_mapdata::model::{BiologicalSiteSamples, HabitatSiteSamples};
use wwky_mapdata::{Graphic, Hub, LayerCategory, MapBounds, Site};

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MapDefaults {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: u8,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub map_defaults: MapDefaults,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UpstreamSummary {
    pub cms_url: String,
    pub feed_url: String,
    pub cms_token_configured: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub upstreams: UpstreamSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

/// Resolved identity for the presented bearer token.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionView {
    pub role_id: Option<String>,
    pub policy_ids: Vec<String>,
}

/// Landing payload for denied requests, echoing where the caller came from.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UnauthorizedPayload {
    pub message: String,
    pub from: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct CreateViewRequest {
    #[serde(default)]
    pub include_biological: bool,
    #[serde(default)]
    pub include_habitat: bool,
    /// Feed narrowing passed through to the sample feed. Empty means the
    /// statewide feed.
    #[serde(default)]
    pub feed: FeedFilters,
}

/// One category's state as the snapshot reports it. `constructed` is false
/// until the category's data has arrived; `visible` is the recorded
/// preference either way.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LayerState {
    pub category: LayerCategory,
    pub visible: bool,
    pub constructed: bool,
    pub graphic_count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ViewSnapshot {
    pub view_id: String,
    pub generation: u64,
    pub include_biological: bool,
    pub include_habitat: bool,
    pub site_count: usize,
    pub hub_count: usize,
    pub biological_site_count: usize,
    pub habitat_site_count: usize,
    pub layers: Vec<LayerState>,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SetVisibleRequest {
    pub visible: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LayerDetail {
    pub category: LayerCategory,
    pub visible: bool,
    pub graphics: Vec<Graphic>,
    pub extent: Option<MapBounds>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SiteListResponse {
    pub items: Vec<Site>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HubListResponse {
    pub items: Vec<Hub>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BiologicalListResponse {
    pub items: Vec<BiologicalSiteSamples>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HabitatListResponse {
    pub items: Vec<HabitatSiteSamples>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub items: Vec<Site>,
}

/// Map navigation target for one site. When the site's coordinates are
/// missing or fall outside the statewide bounds the response carries the
/// Kentucky center at the statewide zoom and `fallback` is set.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LocateResponse {
    pub site_id: i64,
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: u8,
    pub fallback: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSitesRequest {
    pub sites: Vec<wwky_mapdata::UserSite>,
}
