use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub message: &'static str,
}

/// Static service description.
pub async fn route_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Marvin PWA",
        version: env!("CARGO_PKG_VERSION"),
        message: "Static version - API functionality requires server deployment",
    })
}
