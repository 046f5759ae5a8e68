use super::{
    detail, error_response,
    types::{ErrorResponse, RefreshRequest, TokenResponse},
};
use crate::auth::SessionService;
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
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = TokenResponse),
        (status = 400, description = "Missing payload", body = ErrorResponse),
        (status = 401, description = "Invalid, expired or superseded refresh token", body = ErrorResponse),
        (status = 503, description = "Backing store unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(session, payload))]
pub async fn refresh(
    session: Extension<Arc<SessionService>>,
    payload: Option<Json<RefreshRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "Missing payload");
    };

    match session.refresh(&request.refresh_token).await {
        Ok(grant) => (StatusCode::OK, Json(TokenResponse::from(grant))).into_response(),
        Err(err) => error_response(&err),
    }
}
