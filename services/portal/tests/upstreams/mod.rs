//! In-process doubles for the upstreams the portal talks to.
//!
//! Each fixture owns the mutable state behind a spawned axum server, so a
//! test can reshape upstream answers between requests and watch how the
//! portal reacts. The identity route and the CMS collections share one
//! server, matching the deployment where both live in the same CMS.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Path;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::get};
use portal::api::types::UpstreamSummary;
use portal::app::{AppState, build_router};
use portal::auth::identity::CmsIdentityClient;
use portal::auth::policy_store::PolicyStore;
use portal::map::cms::CmsClient;
use portal::map::feed::FlatFeedClient;
use portal::map::fetch::MapSources;
use portal::map::view::ViewRegistry;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wwky_access::AccessRuleTable;

/// Serve `app` on an ephemeral loopback port and return the bound address.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = axum::serve(listener, app.into_make_service());
    tokio::spawn(async move {
        let _ = server.await;
    });
    addr
}

/// Scriptable `/users/me` endpoint keyed by bearer token.
#[derive(Clone, Default)]
pub struct IdentityFixture {
    identities: Arc<Mutex<HashMap<String, Value>>>,
    fetches: Arc<AtomicUsize>,
    failing: Arc<Mutex<bool>>,
}

impl IdentityFixture {
    /// Register the identity a bearer token resolves to. Calling again with
    /// the same token replaces the previous answer.
    pub fn grant(&self, token: &str, role: Option<&str>, policies: &[&str]) {
        let grants: Vec<Value> = policies.iter().map(|id| json!({ "policy": id })).collect();
        let payload = json!({
            "role": role.map(|id| json!({ "id": id })),
            "policies": grants,
        });
        self.identities
            .lock()
            .expect("lock")
            .insert(token.to_string(), payload);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("lock") = failing;
    }

    /// How many times `/users/me` has been hit, failures included.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn router(&self) -> Router {
        let fixture = self.clone();
        Router::new().route(
            "/users/me",
            get(move |headers: HeaderMap| {
                let fixture = fixture.clone();
                async move {
                    fixture.fetches.fetch_add(1, Ordering::SeqCst);
                    if *fixture.failing.lock().expect("lock") {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "errors": [] })),
                        );
                    }
                    let token = headers
                        .get(AUTHORIZATION)
                        .and_then(|value| value.to_str().ok())
                        .and_then(|value| value.strip_prefix("Bearer "))
                        .unwrap_or_default()
                        .to_string();
                    match fixture.identities.lock().expect("lock").get(&token) {
                        Some(payload) => (StatusCode::OK, Json(json!({ "data": payload }))),
                        None => (StatusCode::UNAUTHORIZED, Json(json!({ "errors": [] }))),
                    }
                }
            }),
        )
    }
}

/// Scriptable `/items/{collection}` endpoint. Collections a test never
/// seeded answer with an empty data array, so a pass can always complete.
#[derive(Clone, Default)]
pub struct CmsFixture {
    collections: Arc<Mutex<HashMap<String, Value>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl CmsFixture {
    pub fn seed(&self, collection: &str, rows: Value) {
        self.collections
            .lock()
            .expect("lock")
            .insert(collection.to_string(), rows);
    }

    pub fn fail(&self, collection: &str) {
        self.failing
            .lock()
            .expect("lock")
            .insert(collection.to_string());
    }

    /// Collection names in request order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().expect("lock").clone()
    }

    fn router(&self) -> Router {
        let fixture = self.clone();
        Router::new().route(
            "/items/:collection",
            get(move |Path(collection): Path<String>| {
                let fixture = fixture.clone();
                async move {
                    fixture.hits.lock().expect("lock").push(collection.clone());
                    if fixture.failing.lock().expect("lock").contains(&collection) {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "errors": [] })),
                        );
                    }
                    let rows = fixture
                        .collections
                        .lock()
                        .expect("lock")
                        .get(&collection)
                        .cloned()
                        .unwrap_or_else(|| json!([]));
                    (StatusCode::OK, Json(json!({ "data": rows })))
                }
            }),
        )
    }
}

/// Scriptable flat sample feed. Starts out serving an empty collection.
#[derive(Clone)]
pub struct FeedFixture {
    body: Arc<Mutex<Value>>,
    failing: Arc<Mutex<bool>>,
}

impl Default for FeedFixture {
    fn default() -> Self {
        Self {
            body: Arc::new(Mutex::new(
                json!({ "type": "FeatureCollection", "features": [] }),
            )),
            failing: Arc::new(Mutex::new(false)),
        }
    }
}

impl FeedFixture {
    pub fn seed(&self, features: Value) {
        *self.body.lock().expect("lock") =
            json!({ "type": "FeatureCollection", "features": features });
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("lock") = failing;
    }

    fn router(&self) -> Router {
        let fixture = self.clone();
        Router::new().route(
            "/wwky-data",
            get(move || {
                let fixture = fixture.clone();
                async move {
                    if *fixture.failing.lock().expect("lock") {
                        return (StatusCode::BAD_GATEWAY, Json(json!({ "errors": [] })));
                    }
                    let body = fixture.body.lock().expect("lock").clone();
                    (StatusCode::OK, Json(body))
                }
            }),
        )
    }
}

/// The full set of doubles one portal instance talks to.
pub struct Upstreams {
    pub identity: IdentityFixture,
    pub cms: CmsFixture,
    pub feed: FeedFixture,
    pub cms_addr: SocketAddr,
    pub feed_addr: SocketAddr,
}

pub async fn spawn_upstreams() -> Upstreams {
    let identity = IdentityFixture::default();
    let cms = CmsFixture::default();
    let feed = FeedFixture::default();
    let cms_addr = spawn(identity.router().merge(cms.router())).await;
    let feed_addr = spawn(feed.router()).await;
    Upstreams {
        identity,
        cms,
        feed,
        cms_addr,
        feed_addr,
    }
}

pub fn app_state(upstreams: &Upstreams, rules: AccessRuleTable) -> AppState {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .expect("client");
    let cms_url = format!("http://{}", upstreams.cms_addr);
    let feed_url = format!("http://{}/wwky-data", upstreams.feed_addr);
    AppState {
        service_name: "wwky-portal".to_string(),
        api_version: "v1".to_string(),
        upstreams: UpstreamSummary {
            cms_url: cms_url.clone(),
            feed_url: feed_url.clone(),
            cms_token_configured: false,
        },
        rules: Arc::new(rules),
        policy_store: Arc::new(PolicyStore::new(Arc::new(CmsIdentityClient::new(
            client.clone(),
            cms_url.clone(),
        )))),
        sources: Arc::new(MapSources::new(
            CmsClient::new(client.clone(), cms_url, None),
            FlatFeedClient::new(client, feed_url),
        )),
        views: Arc::new(ViewRegistry::new(8)),
    }
}

pub fn portal_app(
    upstreams: &Upstreams,
    rules: AccessRuleTable,
) -> axum::routing::RouterIntoService<axum::body::Body, ()> {
    build_router(app_state(upstreams, rules)).into_service()
}

/// An empty rule table: every path falls through to the default allow.
pub fn open_rules() -> AccessRuleTable {
    AccessRuleTable::new(Vec::new())
}
