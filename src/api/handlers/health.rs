use crate::{GIT_COMMIT_HASH, auth::SessionService};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

const SERVICE_NAME: &str = "auth_service";
const HEALTHY: &str = "healthy";
const UNHEALTHY: &str = "unhealthy";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    service: String,
    status: String,
    database: String,
    redis: String,
}

/// Component status: "healthy", or "unhealthy: <reason>".
fn component_status<E: std::fmt::Display>(component: &str, result: Result<(), E>) -> String {
    match result {
        Ok(()) => HEALTHY.to_string(),
        Err(err) => {
            error!("Failed to ping {component}: {err}");
            format!("{UNHEALTHY}: {err}")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database and Redis are reachable", body = Health),
        (status = 503, description = "Database or Redis is unreachable", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(session: Extension<Arc<SessionService>>) -> impl IntoResponse {
    let database = component_status("database", session.identities().ping().await);
    let redis = component_status("redis", session.store().ping().await);

    let is_healthy = database == HEALTHY && redis == HEALTHY;

    let health = Health {
        service: SERVICE_NAME.to_string(),
        status: if is_healthy { HEALTHY } else { UNHEALTHY }.to_string(),
        database,
        redis,
    };

    let short_hash = GIT_COMMIT_HASH.get(0..7).unwrap_or("");

    let mut headers = HeaderMap::new();
    match format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse::<HeaderValue>()
    {
        Ok(x_app_header_value) => {
            debug!("X-App header: {:?}", x_app_header_value);
            headers.insert("X-App", x_app_header_value);
        }
        Err(err) => error!("Failed to parse X-App header: {}", err),
    }

    let status = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_status_carries_the_reason() {
        assert_eq!(component_status::<String>("redis", Ok(())), "healthy");
        assert_eq!(
            component_status("redis", Err("connection refused")),
            "unhealthy: connection refused"
        );
    }
}
