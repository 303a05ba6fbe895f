//! CMS collection client.
//!
//! # Purpose
//! Fetch the map's reference collections (hubs, site details) and the
//! sample collections (biological, habitat) from the Directus-style CMS.
//! Every collection response arrives wrapped in a `{"data": [...]}`
//! envelope.
//!
//! # Notes
//! Collection reads use the service token when one is configured; they are
//! public data otherwise. Caller tokens never reach this client, that path
//! belongs to `auth::identity`.
use crate::map::FetchError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wwky_mapdata::{BioSample, HabitatSample, Hub, SiteDetail};

/// Site-detail fields the map needs. Everything else in the collection
/// stays on the wire.
const SITE_DETAIL_FIELDS: &str = "wwkyid_pk,latitude,longitude,stream_name,wwkybasin,description";

/// Sites are capped well above the basin-wide count instead of unbounded,
/// so a runaway collection cannot balloon a pass.
const SITE_DETAIL_LIMIT: &str = "8000";

#[derive(Debug, Clone)]
pub struct CmsClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CmsClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client,
            base_url,
            token,
        }
    }

    /// All hubs, sorted by their description for stable display order.
    pub async fn hubs(&self) -> Result<Vec<Hub>, FetchError> {
        self.collection(
            "hub",
            "wwky_hubs",
            &[("sort", "Description"), ("fields", "*"), ("limit", "-1")],
        )
        .await
    }

    /// Site reference records, trimmed to the fields the map joins on.
    pub async fn site_details(&self) -> Result<Vec<SiteDetail>, FetchError> {
        self.collection(
            "site",
            "wwky_sites",
            &[("fields", SITE_DETAIL_FIELDS), ("limit", SITE_DETAIL_LIMIT)],
        )
        .await
    }

    pub async fn biological_samples(&self) -> Result<Vec<BioSample>, FetchError> {
        self.collection("biological", "biological_samples", &[("limit", "-1")])
            .await
    }

    pub async fn habitat_samples(&self) -> Result<Vec<HabitatSample>, FetchError> {
        self.collection("habitat", "habitat_samples", &[("limit", "-1")])
            .await
    }

    async fn collection<T: DeserializeOwned>(
        &self,
        source_name: &'static str,
        collection: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, FetchError> {
        let url = format!("{}/items/{collection}", self.base_url);
        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|cause| FetchError::Http { source_name, cause })?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                source_name,
                status: response.status(),
            });
        }
        let envelope: DataEnvelope<T> = response
            .json()
            .await
            .map_err(|cause| FetchError::Decode { source_name, cause })?;
        Ok(envelope.data)
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}
