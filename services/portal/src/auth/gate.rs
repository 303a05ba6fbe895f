//! Router-level access gate.
//!
//! # Purpose and responsibility
//! Intercept every request before routing and evaluate the request path
//! against the rule table, resolving the caller's identity when a rule
//! governs the path. Denied requests are redirected to the `/unauthorized`
//! landing page with the original path carried in the `from` query
//! parameter; allowed requests continue into the router untouched.
//!
//! # Key invariants
//! - The gate layers over the whole router, so a path is evaluated before
//!   any 404 handling sees it.
//! - Paths no rule governs pass without an identity lookup.
//! - An identity outage downgrades the caller to unauthenticated rather
//!   than failing the request; paths that admit anonymous callers keep
//!   working through an outage.
//! - Denials are redirects, never bare status codes, so a browser always
//!   lands somewhere that explains itself.
use crate::app::AppState;
use crate::auth::bearer_token;
use axum::extract::{Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use wwky_access::{AccessDecision, evaluate};

pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let identity = match (state.rules.find(&path), bearer_token(request.headers())) {
        (Some(_), Some(token)) => state.policy_store.resolve(token).await,
        _ => None,
    };

    match evaluate(&state.rules, &path, identity.as_deref()) {
        AccessDecision::Allow { rule } => {
            metrics::counter!("wwky_gate_requests_total", "outcome" => "allow").increment(1);
            tracing::debug!(path = %path, rule = ?rule, "request allowed");
            next.run(request).await
        }
        AccessDecision::Deny { rule } => {
            metrics::counter!("wwky_gate_requests_total", "outcome" => "deny").increment(1);
            tracing::info!(
                path = %path,
                rule,
                authenticated = identity.is_some(),
                "request denied; redirecting to the unauthorized page"
            );
            deny_redirect(request.uri()).into_response()
        }
    }
}

/// Build the denial redirect, carrying the denied path and query so the
/// landing page can say where the caller came from.
fn deny_redirect(uri: &Uri) -> Redirect {
    let from = uri
        .path_and_query()
        .map(|part| part.as_str())
        .unwrap_or_else(|| uri.path());
    let query = serde_urlencoded::to_string([("from", from)]).unwrap_or_default();
    Redirect::to(&format!("/unauthorized?{query}"))
}
