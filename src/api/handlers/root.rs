use axum::{extract::Extension, response::Json};
use serde::Serialize;

/// Deployment environment name reported by `/`.
#[derive(Clone, Debug)]
pub struct Environment(pub String);

#[derive(Serialize, Debug)]
pub struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    status: &'static str,
    environment: String,
}

pub async fn root(environment: Extension<Environment>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "OwlBoard Auth Service",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        environment: environment.0.0.clone(),
    })
}
