// Substring search over an aggregated site list.
use crate::model::Site;

/// Most sites a single query returns.
pub const SEARCH_RESULT_LIMIT: usize = 20;

/// Search index rebuilt alongside each applied aggregation pass.
///
/// Matching is a case-insensitive substring test on the stream name plus a
/// substring test on the stringified site id. Results keep the aggregate's
/// ordering; no ranking.
#[derive(Debug, Clone, Default)]
pub struct SiteSearchIndex {
    entries: Vec<SearchEntry>,
}

#[derive(Debug, Clone)]
struct SearchEntry {
    id_text: String,
    name_lower: String,
    site: Site,
}

impl SiteSearchIndex {
    pub fn build(sites: &[Site]) -> Self {
        let entries = sites
            .iter()
            .map(|site| SearchEntry {
                id_text: site.id.to_string(),
                name_lower: site.stream_name.to_lowercase(),
                site: site.clone(),
            })
            .collect();
        Self { entries }
    }

    /// An empty query means "no query yet" and returns nothing, as distinct
    /// from a query that matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Site> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                entry.id_text.contains(query) || entry.name_lower.contains(&query_lower)
            })
            .map(|entry| &entry.site)
            .take(SEARCH_RESULT_LIMIT)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
