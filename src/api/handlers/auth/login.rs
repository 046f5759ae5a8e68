use super::{
    detail, error_response,
    types::{ErrorResponse, LoginRequest, LoginResponse},
};
use crate::{api::handlers::valid_email, auth::SessionService};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens issued", body = LoginResponse),
        (status = 400, description = "Missing payload or invalid email", body = ErrorResponse),
        (status = 401, description = "Incorrect email or password", body = ErrorResponse),
        (status = 403, description = "Account is disabled", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts, account locked", body = ErrorResponse),
        (status = 503, description = "Backing store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(session, payload))]
pub async fn login(
    session: Extension<Arc<SessionService>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return detail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    // emails are matched exactly as stored, only surrounding whitespace is dropped
    let email = request.email.trim();
    if !valid_email(email) {
        return detail(StatusCode::BAD_REQUEST, "Invalid email");
    }

    match session.login(email, &request.password).await {
        Ok(grant) => (StatusCode::OK, Json(LoginResponse::from(grant))).into_response(),
        Err(err) => error_response(&err),
    }
}
