//! One aggregation pass across the map's upstream sources.
//!
//! # Purpose
//! Run every fetch a view asked for concurrently, settle each source on its
//! own, and fold the survivors into the collections a view serves. A failed
//! source contributes an empty collection and a message in the pass's error
//! slot; the rest of the map renders regardless.
use crate::map::FetchError;
use crate::map::cms::CmsClient;
use crate::map::feed::{FeedFilters, FlatFeedClient};
use std::future::Future;
use wwky_mapdata::{
    BioSample, HabitatSample, Hub, Site, SiteSamples, fold_sampled_sites, group_biological_sites,
    group_habitat_sites,
};

/// What a view asks a pass to load. The optional sources stay off unless a
/// view opts in, so the default view costs two requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    pub include_biological: bool,
    pub include_habitat: bool,
    pub feed: FeedFilters,
}

/// Everything one pass produced, already folded into serving shape.
#[derive(Debug, Clone, Default)]
pub struct AggregatePass {
    pub sites: Vec<Site>,
    pub hubs: Vec<Hub>,
    pub biological: Vec<SiteSamples<BioSample>>,
    pub habitat: Vec<SiteSamples<HabitatSample>>,
    pub errors: Vec<String>,
}

/// The upstream clients one pass draws from.
pub struct MapSources {
    cms: CmsClient,
    feed: FlatFeedClient,
}

impl MapSources {
    pub fn new(cms: CmsClient, feed: FlatFeedClient) -> Self {
        Self { cms, feed }
    }

    /// Run one pass. Sources run concurrently and settle independently;
    /// nothing is folded until every enabled source has finished.
    pub async fn load(&self, options: &ViewOptions) -> AggregatePass {
        let details_wanted = options.include_biological || options.include_habitat;
        let (features, hubs, details, biological_samples, habitat_samples) = tokio::join!(
            self.feed.features(&options.feed),
            self.cms.hubs(),
            fetch_if(details_wanted, self.cms.site_details()),
            fetch_if(options.include_biological, self.cms.biological_samples()),
            fetch_if(options.include_habitat, self.cms.habitat_samples()),
        );

        let mut errors = Vec::new();
        let features = settle(features, &mut errors);
        let hubs = settle(hubs, &mut errors);
        let details = details
            .map(|result| settle(result, &mut errors))
            .unwrap_or_default();
        let biological_samples = biological_samples
            .map(|result| settle(result, &mut errors))
            .unwrap_or_default();
        let habitat_samples = habitat_samples
            .map(|result| settle(result, &mut errors))
            .unwrap_or_default();

        let sites = fold_sampled_sites(&features);
        metrics::gauge!("wwky_map_sites_total").set(sites.len() as f64);

        AggregatePass {
            sites,
            hubs,
            biological: group_biological_sites(biological_samples, &details),
            habitat: group_habitat_sites(habitat_samples, &details),
            errors,
        }
    }
}

/// Await the fetch only when the view wants its source. A skipped fetch
/// never reaches the wire.
async fn fetch_if<T>(
    wanted: bool,
    fetch: impl Future<Output = Result<Vec<T>, FetchError>>,
) -> Option<Result<Vec<T>, FetchError>> {
    if wanted { Some(fetch.await) } else { None }
}

fn settle<T>(result: Result<Vec<T>, FetchError>, errors: &mut Vec<String>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(error) => {
            let source_name = error.source_name();
            tracing::warn!(
                source = source_name,
                error = %error,
                "map source failed; rendering without it"
            );
            metrics::counter!("wwky_map_fetch_failures_total", "source" => source_name)
                .increment(1);
            errors.push(format!("Failed to load {source_name} data"));
            Vec::new()
        }
    }
}
