use super::types::{TokenRequest, VerifyTokenResponse};
use crate::auth::SessionService;
use axum::{Json, extract::Extension};
use std::sync::Arc;
use tracing::instrument;

/// Introspection for other services. Always answers 200; unreadable bodies
/// are reported as invalid tokens.
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token validity and, when valid, its claims", body = VerifyTokenResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(session, payload))]
pub async fn verify(
    session: Extension<Arc<SessionService>>,
    payload: Option<Json<TokenRequest>>,
) -> Json<VerifyTokenResponse> {
    let Some(Json(request)) = payload else {
        return Json(VerifyTokenResponse::default());
    };

    Json(session.verify(&request.token).await.into())
}
