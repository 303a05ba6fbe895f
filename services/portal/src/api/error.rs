//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction to keep error shapes uniform
//! across portal endpoints.
//!
//! # Where it fits in the portal
//! All API handlers use these helpers to return structured errors to clients.
//! The route gate does not: denied requests redirect to `/unauthorized`
//! rather than erroring.
//!
//! # Key invariants and assumptions
//! - Error responses must include a stable `code` and human-readable `message`.
//! - Status codes must align with the error category.
//!
//! # Security considerations
//! - Upstream failures log details server-side; responses carry generic
//!   messages only.
//! - Request IDs are optional; avoid leaking sensitive details in messages.
use crate::api::types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # What it does
/// Couples an HTTP status code with a JSON error body.
///
/// # Why it exists
/// Provides a single error type that implements `IntoResponse` for Axum.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use portal::api::error::ApiError;
/// use portal::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         code: "not_found".to_string(),
///         message: "missing".to_string(),
///         request_id: None,
///     },
/// };
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build a 404 Not Found error.
///
/// # What it does
/// Returns an `ApiError` with code `not_found` and the provided message.
///
/// # Errors
/// - Does not fail.
pub fn api_not_found(message: &str) -> ApiError {
    // Return a consistent not-found error shape.
    ApiError {
        status: StatusCode::NOT_FOUND,
        body: ErrorResponse {
            code: "not_found".to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 401 Unauthorized error.
///
/// # What it does
/// Returns an `ApiError` with code `unauthorized`.
///
/// # Errors
/// - Does not fail.
pub fn api_unauthorized(message: &str) -> ApiError {
    // Authentication failed or missing.
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        body: ErrorResponse {
            code: "unauthorized".to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 400 Bad Request validation error.
///
/// # What it does
/// Returns an `ApiError` with code `validation_error`.
///
/// # Errors
/// - Does not fail.
pub fn api_validation_error(message: &str) -> ApiError {
    // Client input failed validation or was malformed.
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorResponse {
            code: "validation_error".to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_helpers_build_expected_codes() {
        let not_found = api_not_found("missing");
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.code, "not_found");

        let unauthorized = api_unauthorized("nope");
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.body.code, "unauthorized");

        let validation = api_validation_error("bad");
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.body.code, "validation_error");
    }
}
