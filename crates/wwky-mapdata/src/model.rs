//! Record shapes for the map pipeline.
//!
//! Ingest types mirror the external payloads (the flat sample feed and the
//! CMS collections) through serde renames, so upstream records pass through
//! unchanged. `Site` is the gateway's own aggregate shape and keeps its own
//! field names.
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Default map center for the statewide extent, `(longitude, latitude)`.
pub const KENTUCKY_CENTER: (f64, f64) = (-85.8, 37.8);
/// Default zoom for the statewide view.
pub const KENTUCKY_ZOOM: u8 = 7;
/// Statewide bounding box; coordinates outside it are treated as bad data.
pub const KENTUCKY_BOUNDS: MapBounds = MapBounds {
    xmin: -89.57,
    ymin: 36.49,
    xmax: -81.96,
    ymax: 39.15,
};

/// Rectangular extent in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MapBounds {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl MapBounds {
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        longitude >= self.xmin
            && longitude <= self.xmax
            && latitude >= self.ymin
            && latitude <= self.ymax
    }
}

/// One sampling location with its aggregate fields.
///
/// Rebuilt in full on every aggregation pass; the only stable identity is
/// `id`. The stream-sample fold fills `sample_count`, `has_samples`,
/// `latest_sample_date` and `ecoli_sample_count`; the biological and habitat
/// groupings fill their own count and leave the rest at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Site {
    pub id: i64,
    pub stream_name: String,
    pub basin: String,
    pub description: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub sample_count: u32,
    pub has_samples: bool,
    pub latest_sample_date: Option<NaiveDate>,
    pub ecoli_sample_count: u32,
    pub biological_sample_count: u32,
    pub habitat_sample_count: u32,
}

impl From<&SiteDetail> for Site {
    fn from(detail: &SiteDetail) -> Self {
        Self {
            id: detail.id,
            stream_name: detail.stream_name.clone().unwrap_or_default(),
            basin: detail.basin.clone().unwrap_or_default(),
            description: detail.description.clone().unwrap_or_default(),
            longitude: detail.longitude,
            latitude: detail.latitude,
            sample_count: 0,
            has_samples: false,
            latest_sample_date: None,
            ecoli_sample_count: 0,
            biological_sample_count: 0,
            habitat_sample_count: 0,
        }
    }
}

/// Flat sample feed payload: one feature per sample event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatFeed {
    pub features: Option<Vec<FlatFeature>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatFeature {
    pub properties: FlatSample,
    pub geometry: Option<PointGeometry>,
}

impl FlatFeature {
    /// `(longitude, latitude)` when the feature carries a usable point.
    pub fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        match &self.geometry {
            Some(geometry) if geometry.coordinates.len() >= 2 => {
                (Some(geometry.coordinates[0]), Some(geometry.coordinates[1]))
            }
            _ => (None, None),
        }
    }
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Deserialize)]
pub struct PointGeometry {
    pub coordinates: Vec<f64>,
}

/// Per-sample properties as the feed spells them. The feed omits nulls
/// freely, so everything past the site id is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSample {
    pub site_id: i64,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub basin: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sample_date: Option<String>,
    #[serde(default)]
    pub e_coli_avg: Option<f64>,
    #[serde(default)]
    pub water_temperature: Option<f64>,
    #[serde(default, rename = "pH")]
    pub ph: Option<f64>,
    #[serde(default)]
    pub dissolved_oxygen: Option<f64>,
    #[serde(default)]
    pub conductivity: Option<f64>,
}

/// Support-hub record, passed through with the CMS column names.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Hub {
    pub hub_id: i64,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default, rename = "Description")]
    pub description: Option<String>,
    #[serde(default, rename = "Basin")]
    pub basin: Option<String>,
    #[serde(default, rename = "County")]
    pub county: Option<String>,
    #[serde(default, rename = "Full_Address")]
    pub full_address: Option<String>,
    #[serde(default)]
    pub mailing_address: Option<String>,
    #[serde(default, rename = "Contact_Person")]
    pub contact_person: Option<String>,
    #[serde(default, rename = "Phone")]
    pub phone: Option<String>,
    #[serde(default, rename = "Email")]
    pub email: Option<String>,
    #[serde(default, rename = "Availability")]
    pub availability: Option<String>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(flatten)]
    pub services: HubServices,
}

/// Service flags a hub offers. Unset flags arrive as null or are missing
/// entirely; both read as false.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HubServices {
    #[serde(default, deserialize_with = "null_is_false", rename = "Sampling_kits")]
    pub sampling_kits: bool,
    #[serde(default, rename = "Kit_count")]
    pub kit_count: Option<i64>,
    #[serde(default, deserialize_with = "null_is_false", rename = "Incubator")]
    pub incubator: bool,
    #[serde(default, rename = "Incubator_count")]
    pub incubator_count: Option<i64>,
    #[serde(default, deserialize_with = "null_is_false", rename = "Biological_kit")]
    pub biological_kit: bool,
    #[serde(default, rename = "Biokit_count")]
    pub biokit_count: Option<i64>,
    #[serde(
        default,
        deserialize_with = "null_is_false",
        rename = "Events_and_meetings"
    )]
    pub events_and_meetings: bool,
    #[serde(
        default,
        deserialize_with = "null_is_false",
        rename = "Site_selection_assist"
    )]
    pub site_selection_assist: bool,
    #[serde(
        default,
        deserialize_with = "null_is_false",
        rename = "Data_entry_assistance"
    )]
    pub data_entry_assistance: bool,
    #[serde(
        default,
        deserialize_with = "null_is_false",
        rename = "Interpret_findings"
    )]
    pub interpret_findings: bool,
    #[serde(
        default,
        deserialize_with = "null_is_false",
        rename = "Coordinate_community"
    )]
    pub coordinate_community: bool,
    #[serde(
        default,
        deserialize_with = "null_is_false",
        rename = "Host_outreach_materials"
    )]
    pub host_outreach_materials: bool,
}

/// Site lookup row from the CMS `wwky_sites` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDetail {
    #[serde(rename = "wwkyid_pk")]
    pub id: i64,
    #[serde(default)]
    pub stream_name: Option<String>,
    #[serde(default, rename = "wwkybasin")]
    pub basin: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
}

/// One macroinvertebrate survey record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BioSample {
    pub id: i64,
    #[serde(rename = "wwky_id")]
    pub site_id: i64,
    #[serde(default)]
    pub sample_date: Option<NaiveDate>,
    #[serde(default)]
    pub biotic_index_score: Option<f64>,
    #[serde(default)]
    pub taxa_count: Option<i64>,
}

/// One habitat assessment record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HabitatSample {
    pub id: i64,
    #[serde(rename = "wwky_id")]
    pub site_id: i64,
    #[serde(default)]
    pub sample_date: Option<NaiveDate>,
    #[serde(default)]
    pub habitat_score: Option<f64>,
    #[serde(default)]
    pub flow_status: Option<String>,
}

/// A site joined with its sample bag for one category.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(BiologicalSiteSamples = SiteSamples<BioSample>, HabitatSiteSamples = SiteSamples<HabitatSample>)]
pub struct SiteSamples<T> {
    pub site: Site,
    pub samples: Vec<T>,
}

/// Caller-supplied personal site record for the user-sites overlay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSite {
    pub id: i64,
    #[serde(default)]
    pub stream_name: Option<String>,
    #[serde(default)]
    pub basin: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub sample_count: u32,
    #[serde(default)]
    pub last_sampled: Option<NaiveDate>,
}

// The CMS returns unset boolean columns as null.
fn null_is_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
