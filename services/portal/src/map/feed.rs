//! Flat sample feed client.
//!
//! # Purpose
//! Fetch the public sampling feed in flat mode, one feature per sample,
//! and hand the features to the fold in `wwky_mapdata::aggregate`.
use crate::map::FetchError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use wwky_mapdata::{FlatFeature, FlatFeed};

/// Optional narrowing filters the feed understands. All absent by default;
/// a view that wants the whole basin sends none of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeedFilters {
    /// Restrict to one site id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<i64>,
    /// Earliest sample date to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    /// Latest sample date to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    /// Cap on returned samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct FlatFeedClient {
    client: reqwest::Client,
    url: String,
}

impl FlatFeedClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetch the feed's features. A feed without a `features` array reads
    /// as empty; the fold downstream logs that case.
    pub async fn features(&self, filters: &FeedFilters) -> Result<Vec<FlatFeature>, FetchError> {
        const SOURCE: &str = "sample";

        let mut query: Vec<(&str, String)> = vec![("mode", "flat".to_string())];
        if let Some(site) = filters.site {
            query.push(("site", site.to_string()));
        }
        if let Some(from) = filters.from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = filters.to {
            query.push(("to", to.to_string()));
        }
        if let Some(limit) = filters.limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|cause| FetchError::Http {
                source_name: SOURCE,
                cause,
            })?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                source_name: SOURCE,
                status: response.status(),
            });
        }
        let feed: FlatFeed = response.json().await.map_err(|cause| FetchError::Decode {
            source_name: SOURCE,
            cause,
        })?;
        Ok(feed.features.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::{Json, Router, routing::get};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    async fn spawn_feed_server(
        status: StatusCode,
        body: Value,
    ) -> (SocketAddr, Arc<Mutex<HashMap<String, String>>>, JoinHandle<()>) {
        let seen = Arc::new(Mutex::new(HashMap::new()));
        let app = Router::new().route(
            "/data",
            get({
                let seen = seen.clone();
                move |Query(query): Query<HashMap<String, String>>| {
                    let seen = seen.clone();
                    let body = body.clone();
                    async move {
                        *seen.lock().expect("lock") = query;
                        (status, Json(body))
                    }
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = axum::serve(listener, app.into_make_service());
        let handle = tokio::spawn(async move {
            let _ = server.await;
        });
        (addr, seen, handle)
    }

    fn client(addr: SocketAddr) -> FlatFeedClient {
        FlatFeedClient::new(reqwest::Client::new(), format!("http://{addr}/data"))
    }

    #[tokio::test]
    async fn default_request_asks_for_flat_mode_only() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"siteId": 1089, "sampleDate": "2024-03-01T00:00:00"},
                "geometry": {"type": "Point", "coordinates": [-84.84, 37.65]}
            }]
        });
        let (addr, seen, _handle) = spawn_feed_server(StatusCode::OK, body).await;

        let features = client(addr)
            .features(&FeedFilters::default())
            .await
            .expect("features");

        assert_eq!(features.len(), 1);
        let seen = seen.lock().expect("lock");
        assert_eq!(seen.get("mode").map(String::as_str), Some("flat"));
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn filters_pass_through_as_query_parameters() {
        let (addr, seen, _handle) =
            spawn_feed_server(StatusCode::OK, json!({"type": "FeatureCollection"})).await;

        let filters = FeedFilters {
            site: Some(1089),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: NaiveDate::from_ymd_opt(2024, 6, 30),
            limit: Some(500),
        };
        let features = client(addr).features(&filters).await.expect("features");

        assert!(features.is_empty());
        let seen = seen.lock().expect("lock");
        assert_eq!(seen.get("site").map(String::as_str), Some("1089"));
        assert_eq!(seen.get("from").map(String::as_str), Some("2024-01-01"));
        assert_eq!(seen.get("to").map(String::as_str), Some("2024-06-30"));
        assert_eq!(seen.get("limit").map(String::as_str), Some("500"));
    }

    #[tokio::test]
    async fn feed_failure_names_the_sample_source() {
        let (addr, _seen, _handle) =
            spawn_feed_server(StatusCode::BAD_GATEWAY, json!({"error": "down"})).await;

        let error = client(addr)
            .features(&FeedFilters::default())
            .await
            .expect_err("error");

        assert_eq!(error.source_name(), "sample");
    }
}
