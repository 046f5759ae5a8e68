use super::types::{MessageResponse, TokenRequest};
use crate::auth::SessionService;
use axum::{Json, extract::Extension};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token revoked, or already unusable", body = MessageResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(session, payload))]
pub async fn logout(
    session: Extension<Arc<SessionService>>,
    payload: Option<Json<TokenRequest>>,
) -> Json<MessageResponse> {
    if let Some(Json(request)) = payload {
        session.logout(&request.token).await;
    }

    Json(MessageResponse {
        message: "Successfully logged out".to_string(),
    })
}
