//! Watershed Watch portal gateway entry point.
//!
//! # Purpose
//! Wires configuration, the identity-backed session cache, upstream clients,
//! and the HTTP router, then starts the API server and metrics endpoint.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
mod api;
mod app;
mod auth;
mod config;
mod map;
mod observability;

use anyhow::Context;
use api::types::UpstreamSummary;
use app::{AppState, build_router};
use auth::identity::CmsIdentityClient;
use auth::policy_store::PolicyStore;
use map::cms::CmsClient;
use map::feed::FlatFeedClient;
use map::fetch::MapSources;
use map::view::ViewRegistry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::PortalConfig::from_env_or_yaml().expect("portal config");
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: config::PortalConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("wwky-portal");
    let state = build_state(&config)?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);

    let addr = config.bind_addr;
    tracing::info!(%addr, "portal gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

fn build_state(config: &config::PortalConfig) -> anyhow::Result<AppState> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.upstream_timeout_ms))
        .build()
        .context("build upstream http client")?;

    let identity = CmsIdentityClient::new(client.clone(), &config.cms_url);
    let cms = CmsClient::new(client.clone(), &config.cms_url, config.cms_token.clone());
    let feed = FlatFeedClient::new(client, &config.feed_url);

    Ok(AppState {
        service_name: "wwky-portal".to_string(),
        api_version: "v1".to_string(),
        upstreams: UpstreamSummary {
            cms_url: config.cms_url.clone(),
            feed_url: config.feed_url.clone(),
            cms_token_configured: config.cms_token.is_some(),
        },
        rules: Arc::new(config.build_rule_table()),
        policy_store: Arc::new(PolicyStore::new(Arc::new(identity))),
        sources: Arc::new(MapSources::new(cms, feed)),
        views: Arc::new(ViewRegistry::new(config.view_capacity)),
    })
}
