//! Session API handlers.
//!
//! # Purpose and responsibility
//! Exposes the caller's resolved identity, the controls for the per-session
//! identity cache, and the landing page denied requests redirect to.
//!
//! # Where it fits in the portal
//! The gate consults the same policy store these handlers manage; a refresh
//! here changes what the gate sees on the caller's next request.
//!
//! # Security considerations
//! - Responses echo role and policy ids, never tokens or user records.
use crate::api::error::{ApiError, api_unauthorized};
use crate::api::types::{ErrorResponse, SessionView, UnauthorizedPayload};
use crate::app::AppState;
use crate::auth::bearer_token;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use wwky_access::Identity;

#[utoipa::path(
    get,
    path = "/v1/session",
    tag = "session",
    responses(
        (status = 200, description = "Resolved identity for the presented token", body = SessionView),
        (status = 401, description = "No token, or the identity could not be resolved", body = ErrorResponse)
    )
)]
/// Return the caller's resolved identity.
///
/// # What it does
/// Resolves the bearer token through the session cache, fetching from the
/// CMS only the first time this session is seen.
///
/// # Errors
/// - 401 when no token is presented or resolution fails.
pub(crate) async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, ApiError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(api_unauthorized("missing bearer token"));
    };
    let Some(identity) = state.policy_store.resolve(token).await else {
        return Err(api_unauthorized("identity could not be resolved"));
    };
    Ok(Json(session_view(&identity)))
}

#[utoipa::path(
    post,
    path = "/v1/session/refresh",
    tag = "session",
    responses(
        (status = 200, description = "Freshly fetched identity", body = SessionView),
        (status = 401, description = "No token, or the refetch failed", body = ErrorResponse)
    )
)]
/// Discard the cached identity and resolve it again.
///
/// # What it does
/// Forces a CMS refetch so role or policy changes take effect without
/// waiting for a new session.
///
/// # Errors
/// - 401 when no token is presented or the refetch fails.
pub(crate) async fn refresh_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, ApiError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(api_unauthorized("missing bearer token"));
    };
    let Some(identity) = state.policy_store.refresh(token).await else {
        return Err(api_unauthorized("identity could not be resolved"));
    };
    Ok(Json(session_view(&identity)))
}

#[utoipa::path(
    delete,
    path = "/v1/session",
    tag = "session",
    responses(
        (status = 204, description = "Cached identity dropped"),
        (status = 401, description = "No token presented", body = ErrorResponse)
    )
)]
/// Drop the caller's cached identity.
///
/// # What it does
/// Logout for the gateway's cache. Idempotent: dropping an unknown session
/// still succeeds.
///
/// # Errors
/// - 401 when no token is presented.
pub(crate) async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(api_unauthorized("missing bearer token"));
    };
    state.policy_store.invalidate(token);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnauthorizedParams {
    #[serde(default)]
    from: Option<String>,
}

#[utoipa::path(
    get,
    path = "/unauthorized",
    tag = "session",
    params(
        ("from" = Option<String>, Query, description = "Path the caller was denied on")
    ),
    responses(
        (status = 200, description = "Denial landing payload", body = UnauthorizedPayload)
    )
)]
/// Landing page for denied requests.
///
/// # What it does
/// Echoes the denied path back so the frontend can explain the denial and
/// offer a way back.
///
/// # Errors
/// - Does not return errors.
pub(crate) async fn unauthorized_landing(
    Query(params): Query<UnauthorizedParams>,
) -> Json<UnauthorizedPayload> {
    Json(UnauthorizedPayload {
        message: "You are not authorized to view the requested page".to_string(),
        from: params.from,
    })
}

fn session_view(identity: &Identity) -> SessionView {
    SessionView {
        role_id: identity
            .role_id
            .as_ref()
            .map(|role| role.as_str().to_string()),
        policy_ids: identity
            .policy_ids
            .iter()
            .map(|policy| policy.as_str().to_string())
            .collect(),
    }
}
