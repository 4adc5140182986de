use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// "open" while the platform session can serve requests
    pub relay: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Relay session is open", body = HealthResponse),
        (status = 503, description = "Relay session is closed", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, code, relay) = if state.relay.is_open() {
        ("ok", StatusCode::OK, "open")
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE, "closed")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            relay: relay.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
