//! Merging raw sample records into per-site aggregates.
//!
//! The stream fold collapses one-row-per-sample feed features into distinct
//! sites with counts and a latest date. The biological/habitat grouping bags
//! whole sample records per site and joins them against the site lookup.
//! Both are pure: same input, same output, no state between passes.
use std::collections::HashMap;

use crate::model::{BioSample, FlatFeature, HabitatSample, Site, SiteDetail, SiteSamples};
use chrono::NaiveDate;

/// Fold flat sample features into distinct sites, first-seen order.
///
/// The first feature for a site id creates the `Site` and seeds its counts;
/// every later feature for the same id increments `sample_count`, bumps
/// `latest_sample_date` when its date is strictly later, and increments
/// `ecoli_sample_count` when the E. coli reading is present.
pub fn fold_sampled_sites(features: &[FlatFeature]) -> Vec<Site> {
    if features.is_empty() {
        tracing::warn!("sample feed contained no features");
        return Vec::new();
    }

    let mut order = Vec::new();
    let mut by_id: HashMap<i64, Site> = HashMap::new();

    for feature in features {
        let sample = &feature.properties;
        let sample_date = parse_sample_date(sample.sample_date.as_deref());
        match by_id.get_mut(&sample.site_id) {
            None => {
                let (longitude, latitude) = feature.coordinates();
                by_id.insert(
                    sample.site_id,
                    Site {
                        id: sample.site_id,
                        stream_name: sample.site_name.clone().unwrap_or_default(),
                        basin: sample
                            .basin
                            .as_deref()
                            .map(str::trim)
                            .unwrap_or_default()
                            .to_string(),
                        description: sample.description.clone().unwrap_or_default(),
                        longitude,
                        latitude,
                        sample_count: 1,
                        has_samples: true,
                        latest_sample_date: sample_date,
                        ecoli_sample_count: u32::from(sample.e_coli_avg.is_some()),
                        biological_sample_count: 0,
                        habitat_sample_count: 0,
                    },
                );
                order.push(sample.site_id);
            }
            Some(site) => {
                site.sample_count += 1;
                if let Some(date) = sample_date
                    && site.latest_sample_date.is_none_or(|current| date > current)
                {
                    site.latest_sample_date = Some(date);
                }
                if sample.e_coli_avg.is_some() {
                    site.ecoli_sample_count += 1;
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

/// Feed dates are `YYYY-MM-DD`, sometimes with a time suffix. Anything that
/// does not parse is treated as absent, so it can never displace a real date.
pub fn parse_sample_date(raw: Option<&str>) -> Option<NaiveDate> {
    let date_part = raw?.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Bag biological samples per site and join them with the site lookup.
pub fn group_biological_sites(
    samples: Vec<BioSample>,
    details: &[SiteDetail],
) -> Vec<SiteSamples<BioSample>> {
    group_by_site(
        samples,
        details,
        |sample| sample.site_id,
        |site, count| site.biological_sample_count = count,
    )
}

/// Bag habitat samples per site and join them with the site lookup.
pub fn group_habitat_sites(
    samples: Vec<HabitatSample>,
    details: &[SiteDetail],
) -> Vec<SiteSamples<HabitatSample>> {
    group_by_site(
        samples,
        details,
        |sample| sample.site_id,
        |site, count| site.habitat_sample_count = count,
    )
}

// Samples referencing a site id missing from the lookup are dropped rather
// than fabricated into coordinate-less sites.
fn group_by_site<T>(
    samples: Vec<T>,
    details: &[SiteDetail],
    site_id: impl Fn(&T) -> i64,
    set_count: impl Fn(&mut Site, u32),
) -> Vec<SiteSamples<T>> {
    let lookup: HashMap<i64, &SiteDetail> =
        details.iter().map(|detail| (detail.id, detail)).collect();

    let mut order = Vec::new();
    let mut bags: HashMap<i64, Vec<T>> = HashMap::new();
    for sample in samples {
        let id = site_id(&sample);
        let bag = bags.entry(id).or_default();
        if bag.is_empty() {
            order.push(id);
        }
        bag.push(sample);
    }

    let mut grouped = Vec::new();
    for id in order {
        let Some(detail) = lookup.get(&id) else {
            tracing::debug!(site_id = id, "dropping samples for unknown site");
            continue;
        };
        let samples = bags.remove(&id).unwrap_or_default();
        let mut site = Site::from(*detail);
        set_count(&mut site, samples.len() as u32);
        grouped.push(SiteSamples { site, samples });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlatFeed;

    fn features(json: &str) -> Vec<FlatFeature> {
        let feed: FlatFeed = serde_json::from_str(json).expect("feed");
        feed.features.unwrap_or_default()
    }

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn fold_counts_samples_and_keeps_later_date() {
        let sites = fold_sampled_sites(&features(
            r#"{ "features": [
                { "properties": { "siteId": 1, "sampleDate": "2024-01-01", "eColiAvg": null },
                  "geometry": { "coordinates": [-84.5, 38.0] } },
                { "properties": { "siteId": 1, "sampleDate": "2024-03-01", "eColiAvg": 12 },
                  "geometry": { "coordinates": [-84.5, 38.0] } },
                { "properties": { "siteId": 2, "sampleDate": "2024-02-01", "eColiAvg": null },
                  "geometry": { "coordinates": [-85.1, 37.2] } }
            ] }"#,
        ));

        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, 1);
        assert_eq!(sites[0].sample_count, 2);
        assert_eq!(sites[0].latest_sample_date, Some(date("2024-03-01")));
        assert_eq!(sites[0].ecoli_sample_count, 1);
        assert_eq!(sites[1].id, 2);
        assert_eq!(sites[1].sample_count, 1);
        assert_eq!(sites[1].ecoli_sample_count, 0);
    }

    #[test]
    fn fold_preserves_first_seen_order() {
        let sites = fold_sampled_sites(&features(
            r#"{ "features": [
                { "properties": { "siteId": 101, "sampleDate": "2024-03-01", "eColiAvg": 120 } },
                { "properties": { "siteId": 204, "sampleDate": "2024-03-02" } },
                { "properties": { "siteId": 101, "sampleDate": "2024-02-15", "eColiAvg": 90 } },
                { "properties": { "siteId": 101, "sampleDate": "2024-04-10" } }
            ] }"#,
        ));

        let ids: Vec<i64> = sites.iter().map(|site| site.id).collect();
        assert_eq!(ids, vec![101, 204]);
        assert_eq!(sites[0].sample_count, 3);
        assert_eq!(sites[0].latest_sample_date, Some(date("2024-04-10")));
        assert_eq!(sites[0].ecoli_sample_count, 2);
        assert_eq!(sites[1].sample_count, 1);
        assert_eq!(sites[1].latest_sample_date, Some(date("2024-03-02")));
    }

    #[test]
    fn fold_takes_site_fields_from_first_occurrence() {
        let sites = fold_sampled_sites(&features(
            r#"{ "features": [
                { "properties": { "siteId": 5, "siteName": "Clarks Run", "basin": " Dix River " },
                  "geometry": { "coordinates": [-84.77, 37.65] } },
                { "properties": { "siteId": 5, "siteName": "Renamed Creek", "basin": "Other" },
                  "geometry": { "coordinates": [-80.0, 30.0] } }
            ] }"#,
        ));

        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].stream_name, "Clarks Run");
        assert_eq!(sites[0].basin, "Dix River");
        assert_eq!(sites[0].longitude, Some(-84.77));
    }

    #[test]
    fn earlier_or_unparseable_dates_never_replace_the_latest() {
        let sites = fold_sampled_sites(&features(
            r#"{ "features": [
                { "properties": { "siteId": 1, "sampleDate": "2024-03-01" } },
                { "properties": { "siteId": 1, "sampleDate": "2024-01-01" } },
                { "properties": { "siteId": 1, "sampleDate": "not-a-date" } },
                { "properties": { "siteId": 1 } }
            ] }"#,
        ));

        assert_eq!(sites[0].sample_count, 4);
        assert_eq!(sites[0].latest_sample_date, Some(date("2024-03-01")));
    }

    #[test]
    fn missing_first_date_is_filled_by_a_later_parseable_one() {
        let sites = fold_sampled_sites(&features(
            r#"{ "features": [
                { "properties": { "siteId": 1 } },
                { "properties": { "siteId": 1, "sampleDate": "2024-02-01" } }
            ] }"#,
        ));

        assert_eq!(sites[0].latest_sample_date, Some(date("2024-02-01")));
    }

    #[test]
    fn fold_of_empty_feed_is_empty() {
        assert!(fold_sampled_sites(&[]).is_empty());
    }

    #[test]
    fn fold_is_pure_across_repeated_calls() {
        let input = features(
            r#"{ "features": [
                { "properties": { "siteId": 1, "sampleDate": "2024-01-01", "eColiAvg": 3 } },
                { "properties": { "siteId": 1, "sampleDate": "2024-02-01" } }
            ] }"#,
        );
        assert_eq!(fold_sampled_sites(&input), fold_sampled_sites(&input));
    }

    #[test]
    fn parse_sample_date_accepts_datetime_suffix() {
        assert_eq!(
            parse_sample_date(Some("2024-03-01T00:00:00")),
            Some(date("2024-03-01"))
        );
        assert_eq!(parse_sample_date(Some("03/01/2024")), None);
        assert_eq!(parse_sample_date(Some("")), None);
        assert_eq!(parse_sample_date(None), None);
    }

    fn details() -> Vec<SiteDetail> {
        serde_json::from_str(
            r#"[
                { "wwkyid_pk": 204, "stream_name": "Hanging Fork", "wwkybasin": "Dix River",
                  "longitude": -84.6, "latitude": 37.5 },
                { "wwkyid_pk": 309, "stream_name": "Gunpowder Creek", "wwkybasin": "Ohio River",
                  "longitude": -84.7, "latitude": 38.9 }
            ]"#,
        )
        .expect("details")
    }

    fn bio(id: i64, site_id: i64) -> BioSample {
        BioSample {
            id,
            site_id,
            sample_date: Some(date("2024-05-04")),
            biotic_index_score: Some(7.2),
            taxa_count: Some(11),
        }
    }

    #[test]
    fn grouping_bags_samples_and_joins_site_details() {
        let grouped = group_biological_sites(
            vec![bio(1, 204), bio(2, 309), bio(3, 204)],
            &details(),
        );

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].site.id, 204);
        assert_eq!(grouped[0].site.stream_name, "Hanging Fork");
        assert_eq!(grouped[0].site.biological_sample_count, 2);
        assert_eq!(grouped[0].samples.len(), 2);
        assert_eq!(grouped[1].site.id, 309);
        assert_eq!(grouped[1].samples.len(), 1);
    }

    #[test]
    fn grouping_drops_samples_for_unknown_sites() {
        let grouped = group_biological_sites(vec![bio(1, 999), bio(2, 204)], &details());

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].site.id, 204);
    }

    #[test]
    fn habitat_grouping_fills_the_habitat_count() {
        let samples = vec![HabitatSample {
            id: 1,
            site_id: 309,
            sample_date: Some(date("2024-06-10")),
            habitat_score: Some(132.0),
            flow_status: Some("normal".to_string()),
        }];
        let grouped = group_habitat_sites(samples, &details());

        assert_eq!(grouped[0].site.habitat_sample_count, 1);
        assert_eq!(grouped[0].site.biological_sample_count, 0);
    }
}
