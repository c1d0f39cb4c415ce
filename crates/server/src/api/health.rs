//! Readiness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// MySQL answered a ping.
    pub data_store: bool,
    /// Redis answered a ping.
    pub cache: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up; collaborator readiness flags", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let data_store = match &state.data_store {
        Some(store) => store.ping().await.is_ok(),
        None => false,
    };
    let cache = match &state.cache {
        Some(cache) => cache.ping().await.is_ok(),
        None => false,
    };
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        data_store,
        cache,
    })
}
