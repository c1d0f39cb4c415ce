//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// `*` allows every origin; anything else is a single allowed origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("invalid CORS_ORIGIN {:?}: {}; allowing all origins", origin, e);
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.server.cors_origin);

    Router::new()
        .route("/health", get(api::health::health))
        .route(
            "/tuning",
            get(api::tuning::tuning_get)
                .post(api::tuning::tuning_post)
                .put(api::tuning::tuning_put)
                .delete(api::tuning::tuning_delete),
        )
        .route(
            "/alerts",
            get(api::alerts::alerts_get).delete(api::alerts::alerts_delete),
        )
        .route("/stats", get(api::stats::stats_get))
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
