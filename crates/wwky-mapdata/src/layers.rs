//! Per-category layer visibility and lazily-constructed layer handles.
//!
//! A `LayerSet` tracks two things per category: the visibility preference,
//! which always exists, and the layer handle, which is constructed only once
//! that category's data has arrived. Toggling a category whose handle does
//! not exist yet records the preference and touches nothing else, so callers
//! can toggle freely during the async load window.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{Hub, MapBounds, Site, UserSite};

/// The fixed set of map layer categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LayerCategory {
    Hubs,
    Sites,
    Biological,
    Habitat,
    UserSites,
}

impl LayerCategory {
    pub const ALL: [LayerCategory; 5] = [
        LayerCategory::Hubs,
        LayerCategory::Sites,
        LayerCategory::Biological,
        LayerCategory::Habitat,
        LayerCategory::UserSites,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerCategory::Hubs => "hubs",
            LayerCategory::Sites => "sites",
            LayerCategory::Biological => "biological",
            LayerCategory::Habitat => "habitat",
            LayerCategory::UserSites => "user_sites",
        }
    }
}

impl fmt::Display for LayerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown layer category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for LayerCategory {
    type Err = UnknownCategory;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "hubs" => Ok(LayerCategory::Hubs),
            "sites" => Ok(LayerCategory::Sites),
            "biological" => Ok(LayerCategory::Biological),
            "habitat" => Ok(LayerCategory::Habitat),
            "user_sites" => Ok(LayerCategory::UserSites),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// One renderable marker. Records without coordinates never become graphics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Graphic {
    pub reference: i64,
    pub label: String,
    pub detail: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

impl Graphic {
    pub fn for_site(site: &Site) -> Option<Self> {
        let (longitude, latitude) = (site.longitude?, site.latitude?);
        Some(Self {
            reference: site.id,
            label: format!("Site: {}", site.id),
            detail: (!site.stream_name.is_empty()).then(|| site.stream_name.clone()),
            longitude,
            latitude,
        })
    }

    pub fn for_hub(hub: &Hub) -> Option<Self> {
        let (longitude, latitude) = (hub.longitude?, hub.latitude?);
        Some(Self {
            reference: hub.hub_id,
            label: match &hub.description {
                Some(description) => format!("Hub: {description}"),
                None => format!("Hub: {}", hub.hub_id),
            },
            detail: hub.organization.clone(),
            longitude,
            latitude,
        })
    }

    pub fn for_user_site(site: &UserSite) -> Option<Self> {
        let (longitude, latitude) = (site.longitude?, site.latitude?);
        Some(Self {
            reference: site.id,
            label: format!(
                "Your Sample Site: {}",
                site.stream_name.as_deref().unwrap_or("Unnamed Stream")
            ),
            detail: site.description.clone(),
            longitude,
            latitude,
        })
    }
}

/// A constructed layer handle: the category's graphics plus its visible flag.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Layer {
    pub category: LayerCategory,
    pub visible: bool,
    pub graphics: Vec<Graphic>,
}

impl Layer {
    /// Smallest box containing every graphic, for fit-to-extent navigation.
    pub fn extent(&self) -> Option<MapBounds> {
        let mut graphics = self.graphics.iter();
        let first = graphics.next()?;
        let mut bounds = MapBounds {
            xmin: first.longitude,
            ymin: first.latitude,
            xmax: first.longitude,
            ymax: first.latitude,
        };
        for graphic in graphics {
            bounds.xmin = bounds.xmin.min(graphic.longitude);
            bounds.ymin = bounds.ymin.min(graphic.latitude);
            bounds.xmax = bounds.xmax.max(graphic.longitude);
            bounds.ymax = bounds.ymax.max(graphic.latitude);
        }
        Some(bounds)
    }
}

/// What changed about a layer, delivered to registered observers.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerChange {
    Created { visible: bool },
    VisibilityChanged { visible: bool },
    GraphicsReplaced { count: usize },
}

/// Subscription seam for rendering backends. Observers are notified about
/// handle construction and handle changes, never about bare preference
/// flips for layers that do not exist yet.
pub trait LayerObserver: Send + Sync {
    fn layer_changed(&self, category: LayerCategory, change: &LayerChange);
}

/// Visibility preferences plus constructed layer handles for one map view.
#[derive(Default)]
pub struct LayerSet {
    layers: HashMap<LayerCategory, Layer>,
    preferences: HashMap<LayerCategory, bool>,
    observers: Vec<Arc<dyn LayerObserver>>,
}

impl LayerSet {
    /// Hubs and sites start visible; the opt-in categories start hidden.
    pub fn new() -> Self {
        let preferences = HashMap::from([
            (LayerCategory::Hubs, true),
            (LayerCategory::Sites, true),
            (LayerCategory::Biological, false),
            (LayerCategory::Habitat, false),
            (LayerCategory::UserSites, false),
        ]);
        Self {
            layers: HashMap::new(),
            preferences,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn LayerObserver>) {
        self.observers.push(observer);
    }

    pub fn preference(&self, category: LayerCategory) -> bool {
        self.preferences.get(&category).copied().unwrap_or(false)
    }

    /// Record a preference without touching handles or observers. For
    /// seeding a fresh set before any data has arrived; later handle
    /// construction picks the preference up.
    pub fn set_preference(&mut self, category: LayerCategory, visible: bool) {
        self.preferences.insert(category, visible);
    }

    pub fn layer(&self, category: LayerCategory) -> Option<&Layer> {
        self.layers.get(&category)
    }

    /// Flip a category and return the new preference. When the handle does
    /// not exist yet only the preference changes.
    pub fn toggle(&mut self, category: LayerCategory) -> bool {
        let visible = !self.preference(category);
        self.set_visible(category, visible)
    }

    pub fn set_visible(&mut self, category: LayerCategory, visible: bool) -> bool {
        self.preferences.insert(category, visible);
        match self.layers.get_mut(&category) {
            Some(layer) => {
                layer.visible = visible;
                self.notify(category, &LayerChange::VisibilityChanged { visible });
            }
            None => {
                tracing::warn!(
                    category = %category,
                    "layer not yet constructed; visibility preference recorded"
                );
            }
        }
        visible
    }

    /// Replace a category's graphics. The first non-empty replacement
    /// constructs the handle with the recorded visibility preference; an
    /// empty replacement clears an existing handle but never constructs one.
    pub fn set_graphics(&mut self, category: LayerCategory, graphics: Vec<Graphic>) {
        if graphics.is_empty() && !self.layers.contains_key(&category) {
            return;
        }
        let count = graphics.len();
        match self.layers.get_mut(&category) {
            Some(layer) => {
                layer.graphics = graphics;
            }
            None => {
                let visible = self.preference(category);
                self.layers.insert(
                    category,
                    Layer {
                        category,
                        visible,
                        graphics,
                    },
                );
                self.notify(category, &LayerChange::Created { visible });
            }
        }
        self.notify(category, &LayerChange::GraphicsReplaced { count });
    }

    fn notify(&self, category: LayerCategory, change: &LayerChange) {
        for observer in &self.observers {
            observer.layer_changed(category, change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(LayerCategory, LayerChange)>>,
    }

    impl LayerObserver for Recorder {
        fn layer_changed(&self, category: LayerCategory, change: &LayerChange) {
            self.events
                .lock()
                .expect("lock")
                .push((category, change.clone()));
        }
    }

    fn graphic(reference: i64, longitude: f64, latitude: f64) -> Graphic {
        Graphic {
            reference,
            label: format!("Site: {reference}"),
            detail: None,
            longitude,
            latitude,
        }
    }

    #[test]
    fn defaults_show_hubs_and_sites_only() {
        let layers = LayerSet::new();
        assert!(layers.preference(LayerCategory::Hubs));
        assert!(layers.preference(LayerCategory::Sites));
        assert!(!layers.preference(LayerCategory::Biological));
        assert!(!layers.preference(LayerCategory::UserSites));
    }

    #[test]
    fn toggle_without_handle_flips_preference_and_nothing_else() {
        let recorder = Arc::new(Recorder::default());
        let mut layers = LayerSet::new();
        layers.subscribe(recorder.clone());

        assert!(!layers.toggle(LayerCategory::Hubs));
        assert!(layers.toggle(LayerCategory::Hubs));
        assert!(layers.layer(LayerCategory::Hubs).is_none());
        assert!(recorder.events.lock().expect("lock").is_empty());
    }

    #[test]
    fn seeded_preference_is_silent_and_survives_until_construction() {
        let recorder = Arc::new(Recorder::default());
        let mut layers = LayerSet::new();
        layers.subscribe(recorder.clone());

        layers.set_preference(LayerCategory::Habitat, true);
        assert!(layers.preference(LayerCategory::Habitat));
        assert!(recorder.events.lock().expect("lock").is_empty());

        layers.set_graphics(LayerCategory::Habitat, vec![graphic(3, -84.9, 37.9)]);
        assert!(layers.layer(LayerCategory::Habitat).expect("layer").visible);
    }

    #[test]
    fn first_graphics_construct_the_handle_with_the_preference() {
        let recorder = Arc::new(Recorder::default());
        let mut layers = LayerSet::new();
        layers.subscribe(recorder.clone());
        layers.set_visible(LayerCategory::Biological, true);

        layers.set_graphics(LayerCategory::Biological, vec![graphic(1, -84.5, 38.0)]);

        let layer = layers.layer(LayerCategory::Biological).expect("layer");
        assert!(layer.visible);
        assert_eq!(layer.graphics.len(), 1);
        let events = recorder.events.lock().expect("lock");
        assert_eq!(
            *events,
            vec![
                (
                    LayerCategory::Biological,
                    LayerChange::Created { visible: true }
                ),
                (
                    LayerCategory::Biological,
                    LayerChange::GraphicsReplaced { count: 1 }
                ),
            ]
        );
    }

    #[test]
    fn toggle_with_handle_updates_the_layer_and_notifies() {
        let recorder = Arc::new(Recorder::default());
        let mut layers = LayerSet::new();
        layers.set_graphics(LayerCategory::Sites, vec![graphic(1, -84.5, 38.0)]);
        layers.subscribe(recorder.clone());

        assert!(!layers.toggle(LayerCategory::Sites));
        assert!(!layers.layer(LayerCategory::Sites).expect("layer").visible);
        assert_eq!(
            *recorder.events.lock().expect("lock"),
            vec![(
                LayerCategory::Sites,
                LayerChange::VisibilityChanged { visible: false }
            )]
        );
    }

    #[test]
    fn empty_graphics_clear_an_existing_handle_but_never_construct_one() {
        let mut layers = LayerSet::new();
        layers.set_graphics(LayerCategory::Hubs, Vec::new());
        assert!(layers.layer(LayerCategory::Hubs).is_none());

        layers.set_graphics(LayerCategory::Hubs, vec![graphic(4, -84.7, 37.6)]);
        layers.set_graphics(LayerCategory::Hubs, Vec::new());
        let layer = layers.layer(LayerCategory::Hubs).expect("layer");
        assert!(layer.graphics.is_empty());
    }

    #[test]
    fn extent_spans_all_graphics() {
        let layer = Layer {
            category: LayerCategory::Sites,
            visible: true,
            graphics: vec![graphic(1, -84.5, 38.0), graphic(2, -85.2, 37.1)],
        };
        let bounds = layer.extent().expect("bounds");
        assert_eq!(bounds.xmin, -85.2);
        assert_eq!(bounds.ymin, 37.1);
        assert_eq!(bounds.xmax, -84.5);
        assert_eq!(bounds.ymax, 38.0);

        let empty = Layer {
            category: LayerCategory::Sites,
            visible: true,
            graphics: Vec::new(),
        };
        assert!(empty.extent().is_none());
    }

    #[test]
    fn graphics_skip_records_without_coordinates() {
        let site = Site {
            id: 7,
            stream_name: "Clarks Run".to_string(),
            basin: String::new(),
            description: String::new(),
            longitude: None,
            latitude: Some(37.6),
            sample_count: 1,
            has_samples: true,
            latest_sample_date: None,
            ecoli_sample_count: 0,
            biological_sample_count: 0,
            habitat_sample_count: 0,
        };
        assert!(Graphic::for_site(&site).is_none());

        let located = Site {
            longitude: Some(-84.77),
            ..site
        };
        let graphic = Graphic::for_site(&located).expect("graphic");
        assert_eq!(graphic.label, "Site: 7");
        assert_eq!(graphic.detail.as_deref(), Some("Clarks Run"));
    }

    #[test]
    fn category_names_round_trip() {
        for category in LayerCategory::ALL {
            assert_eq!(
                category.as_str().parse::<LayerCategory>().expect("parse"),
                category
            );
        }
        assert!("rivers".parse::<LayerCategory>().is_err());
    }
}
