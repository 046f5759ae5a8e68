//! Token endpoints under `/auth`.
//!
//! Every handler takes the shared [`SessionService`](crate::auth::SessionService)
//! from an `Extension` and maps [`AuthError`] onto HTTP statuses in one place.

pub mod login;
pub mod logout;
pub mod refresh;
pub mod types;
pub mod verify;

use crate::auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use types::ErrorResponse;

/// `{"detail": ...}` response with the given status.
pub(crate) fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: message.into(),
        }),
    )
        .into_response()
}

pub(crate) const fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::BadCredential
        | AuthError::InvalidOrExpired
        | AuthError::NotRegistered
        | AuthError::SubjectUnavailable => StatusCode::UNAUTHORIZED,
        AuthError::InactiveAccount => StatusCode::FORBIDDEN,
        AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        AuthError::Store(_) | AuthError::Identity(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(err: &AuthError) -> Response {
    let status = status_for(err);
    if err.is_backend() {
        error!("Auth backend failure: {err}");
        let message = if status == StatusCode::SERVICE_UNAVAILABLE {
            "Authentication service temporarily unavailable"
        } else {
            "Internal server error"
        };
        return detail(status, message);
    }
    detail(status, err.to_string())
}
