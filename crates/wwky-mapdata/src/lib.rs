// Map data primitives: record shapes, site aggregation, layer state, search.
pub mod aggregate;
pub mod layers;
pub mod model;
pub mod search;

pub use aggregate::{
    fold_sampled_sites, group_biological_sites, group_habitat_sites, parse_sample_date,
};
pub use layers::{
    Graphic, Layer, LayerCategory, LayerChange, LayerObserver, LayerSet, UnknownCategory,
};
pub use model::{
    BioSample, FlatFeature, FlatFeed, FlatSample, HabitatSample, Hub, HubServices,
    KENTUCKY_BOUNDS, KENTUCKY_CENTER, KENTUCKY_ZOOM, MapBounds, PointGeometry, Site, SiteDetail,
    SiteSamples, UserSite,
};
pub use search::{SEARCH_RESULT_LIMIT, SiteSearchIndex};
