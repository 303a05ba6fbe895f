//! Telemetry for the portal gateway.
//!
//! # Purpose
//! Installs the tracing subscriber, restores W3C trace context from inbound
//! headers, and serves the Prometheus scrape endpoint on its own listener.
//!
//! # Notes
//! Every entry point is `OnceLock`-guarded: tests and restarts may call the
//! initializers freely, only the first call does any wiring.
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static SCRAPE_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static TRACING: OnceLock<()> = OnceLock::new();
static PROPAGATION: OnceLock<()> = OnceLock::new();

/// Environment variables copied onto exported spans when present.
const DEPLOY_VARS: &[(&str, &str)] = &[
    ("K8S_CLUSTER_NAME", "k8s.cluster.name"),
    ("K8S_NAMESPACE_NAME", "k8s.namespace.name"),
    ("K8S_POD_NAME", "k8s.pod.name"),
    ("CLOUD_REGION", "cloud.region"),
    ("DEPLOYMENT_ENVIRONMENT", "deployment.environment"),
];

pub fn init_observability(service_name: &str) -> PrometheusHandle {
    TRACING.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer());
        match otlp_provider(service_name) {
            Some(provider) => {
                let tracer = provider.tracer(service_name.to_string());
                let _ = registry
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .try_init();
            }
            None => {
                let _ = registry.try_init();
            }
        }
    });

    prometheus_handle()
}

/// Span export is opt-in: without `OTEL_EXPORTER_OTLP_ENDPOINT` the fmt layer
/// runs alone and nothing leaves the process.
fn otlp_provider(service_name: &str) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    let resource = Resource::builder_empty()
        .with_attributes(deployment_attributes(service_name))
        .build();
    Some(
        opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

fn deployment_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![KeyValue::new("service.name", service_name.to_string())];
    if let Ok(value) =
        std::env::var("WWKY_SERVICE_INSTANCE_ID").or_else(|_| std::env::var("HOSTNAME"))
    {
        attrs.push(KeyValue::new("service.instance.id", value));
    }
    for (var, key) in DEPLOY_VARS {
        if let Ok(value) = std::env::var(var) {
            attrs.push(KeyValue::new(*key, value));
        }
    }
    attrs
}

/// Rebuilds the parent context a caller sent in `traceparent`/`tracestate`
/// headers so portal spans join the caller's trace.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    PROPAGATION.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );
    });
    global::get_text_map_propagator(|prop| prop.extract(&HeaderCarrier(headers)))
}

struct HeaderCarrier<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderCarrier<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_scrapes(handle, listener, std::future::pending()).await
}

async fn serve_scrapes<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

fn prometheus_handle() -> PrometheusHandle {
    SCRAPE_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("install metrics recorder");
            describe_portal_metrics();
            handle
        })
        .clone()
}

/// Prometheus HELP text for every series the portal emits.
fn describe_portal_metrics() {
    metrics::describe_counter!(
        "wwky_gate_requests_total",
        "Gate decisions on governed routes, labeled by outcome"
    );
    metrics::describe_gauge!(
        "wwky_sessions_active",
        "Bearer sessions holding a cached identity"
    );
    metrics::describe_counter!(
        "wwky_identity_fetch_failures_total",
        "Identity lookups the CMS failed to answer"
    );
    metrics::describe_counter!(
        "wwky_map_fetch_failures_total",
        "Map source fetches that failed, labeled by source"
    );
    metrics::describe_gauge!(
        "wwky_map_sites_total",
        "Sites folded out of the most recent sample-feed pass"
    );
    metrics::describe_gauge!("wwky_map_views_active", "Map views currently registered");
    metrics::describe_counter!(
        "wwky_map_views_evicted_total",
        "Map views dropped to stay within capacity"
    );
    metrics::describe_counter!(
        "wwky_map_refresh_superseded_total",
        "Refresh passes discarded because a newer one started"
    );
}
