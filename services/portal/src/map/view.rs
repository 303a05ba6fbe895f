//! In-memory registry of live map views.
//!
//! # Purpose and responsibility
//! A view is one caller's map: the folded site list, hub list, optional
//! sample bags, layer state, search index, and the error slot from its most
//! recent aggregation pass. The registry owns every live view, hands out
//! refresh generations, and evicts the oldest view when full.
//!
//! # Key invariants
//! - Passes are fetched outside the registry lock. A finished pass lands on
//!   a view only when no newer refresh started after it; stale passes are
//!   discarded whole.
//! - Layer preferences and the user-sites overlay survive refreshes; only
//!   the data layers and the search index are rebuilt.
//!
//! # Concurrency model
//! One `tokio::sync::RwLock` over the whole table. Mutations are brief
//! (pointer swaps and fold output moves); the slow work happens before the
//! lock is taken.
use crate::map::fetch::{AggregatePass, ViewOptions};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use wwky_mapdata::{Graphic, LayerCategory, LayerSet, SiteSearchIndex};

/// One live map view.
pub struct MapView {
    pub id: String,
    pub options: ViewOptions,
    pub data: AggregatePass,
    pub layers: LayerSet,
    pub search: SiteSearchIndex,
    latest_started: u64,
    applied_generation: u64,
}

impl MapView {
    fn new(id: String, options: ViewOptions) -> Self {
        let mut layers = LayerSet::new();
        if options.include_biological {
            layers.set_preference(LayerCategory::Biological, true);
        }
        if options.include_habitat {
            layers.set_preference(LayerCategory::Habitat, true);
        }
        Self {
            id,
            options,
            data: AggregatePass::default(),
            layers,
            search: SiteSearchIndex::build(&[]),
            latest_started: 1,
            applied_generation: 0,
        }
    }

    /// Generation of the data currently served. Zero until the first pass
    /// lands.
    pub fn generation(&self) -> u64 {
        self.applied_generation
    }

    fn apply(&mut self, generation: u64, pass: AggregatePass) {
        self.search = SiteSearchIndex::build(&pass.sites);
        self.layers.set_graphics(
            LayerCategory::Sites,
            pass.sites.iter().filter_map(Graphic::for_site).collect(),
        );
        self.layers.set_graphics(
            LayerCategory::Hubs,
            pass.hubs.iter().filter_map(Graphic::for_hub).collect(),
        );
        self.layers.set_graphics(
            LayerCategory::Biological,
            pass.biological
                .iter()
                .filter_map(|bag| Graphic::for_site(&bag.site))
                .collect(),
        );
        self.layers.set_graphics(
            LayerCategory::Habitat,
            pass.habitat
                .iter()
                .filter_map(|bag| Graphic::for_site(&bag.site))
                .collect(),
        );
        self.data = pass;
        self.applied_generation = generation;
    }
}

#[derive(Default)]
struct ViewTable {
    views: HashMap<String, MapView>,
    /// Creation order, oldest first, for eviction.
    order: VecDeque<String>,
}

/// Registry of live views with a capacity cap.
pub struct ViewRegistry {
    capacity: usize,
    table: RwLock<ViewTable>,
}

impl ViewRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            table: RwLock::new(ViewTable::default()),
        }
    }

    /// Create a view and reserve its first pass generation.
    pub async fn create(&self, options: ViewOptions) -> (String, u64) {
        let id = new_view_id();
        let mut table = self.table.write().await;
        while table.views.len() >= self.capacity {
            let Some(oldest) = table.order.pop_front() else {
                break;
            };
            table.views.remove(&oldest);
            metrics::counter!("wwky_map_views_evicted_total").increment(1);
            tracing::info!(view_id = %oldest, "view registry full; evicted the oldest view");
        }
        let view = MapView::new(id.clone(), options);
        let generation = view.latest_started;
        table.order.push_back(id.clone());
        table.views.insert(id.clone(), view);
        metrics::gauge!("wwky_map_views_active").set(table.views.len() as f64);
        (id, generation)
    }

    /// Reserve the next generation for a refresh of `view_id`. `None` when
    /// the view no longer exists.
    pub async fn begin_refresh(&self, view_id: &str) -> Option<u64> {
        let mut table = self.table.write().await;
        let view = table.views.get_mut(view_id)?;
        view.latest_started += 1;
        Some(view.latest_started)
    }

    /// Land a finished pass on its view. Returns false when the view is
    /// gone or a newer refresh started while this pass was in flight; the
    /// pass is dropped in both cases.
    pub async fn apply_pass(&self, view_id: &str, generation: u64, pass: AggregatePass) -> bool {
        let mut table = self.table.write().await;
        let Some(view) = table.views.get_mut(view_id) else {
            return false;
        };
        if generation != view.latest_started {
            metrics::counter!("wwky_map_refresh_superseded_total").increment(1);
            tracing::debug!(
                view_id,
                generation,
                latest = view.latest_started,
                "discarding pass superseded by a newer refresh"
            );
            return false;
        }
        view.apply(generation, pass);
        true
    }

    pub async fn with_view<R>(&self, view_id: &str, f: impl FnOnce(&MapView) -> R) -> Option<R> {
        let table = self.table.read().await;
        table.views.get(view_id).map(f)
    }

    pub async fn with_view_mut<R>(
        &self,
        view_id: &str,
        f: impl FnOnce(&mut MapView) -> R,
    ) -> Option<R> {
        let mut table = self.table.write().await;
        table.views.get_mut(view_id).map(f)
    }

    /// Tear a view down. Returns whether it existed.
    pub async fn remove(&self, view_id: &str) -> bool {
        let mut table = self.table.write().await;
        let existed = table.views.remove(view_id).is_some();
        if existed {
            table.order.retain(|id| id != view_id);
            metrics::gauge!("wwky_map_views_active").set(table.views.len() as f64);
        }
        existed
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.views.len()
    }
}

fn new_view_id() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}
