//! HTTP endpoint modules.
//!
//! Shared error body, status mapping and availability guards live here.

pub mod alerts;
pub mod doc;
pub mod health;
pub mod stats;
pub mod tuning;

use std::sync::Arc;

use axum::http::{header, HeaderName, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use inquisition_tuning::{DataStore, ErrorKind, TuningEngine, TuningError};

use crate::state::AppState;
use crate::stats::StatsBackend;

// ── Shared types ─────────────────────────────────────────────────

/// Failure envelope: `{"status":"fail","error":"..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: String,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "fail".into(),
            error: error.into(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body with a `Cache-Control: max-age=<n>` header.
pub type Cached<T> = ([(HeaderName, String); 1], Json<T>);

/// Default client-side cache lifetime for tuning and stats responses.
pub const DEFAULT_MAX_AGE: u64 = 30;

pub(crate) fn cached<T>(max_age: u64, body: T) -> Cached<T> {
    (
        [(header::CACHE_CONTROL, format!("max-age={max_age}"))],
        Json(body),
    )
}

// ── Error helpers ────────────────────────────────────────────────

pub(crate) fn fail(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody::new(msg)))
}

/// Log the detail, answer with a generic message.
pub(crate) fn internal_error(e: impl std::fmt::Display) -> ApiError {
    error!("request failed: {}", e);
    fail(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

pub(crate) fn not_found() -> ApiError {
    fail(StatusCode::NOT_FOUND, "no data found")
}

/// Map an engine error to a response. Bad input on the read path is a 403,
/// on the write path a 400.
pub(crate) fn tuning_error(e: TuningError, read_path: bool) -> ApiError {
    match e.kind() {
        ErrorKind::BadInput if read_path => fail(StatusCode::FORBIDDEN, e.to_string()),
        ErrorKind::BadInput => fail(StatusCode::BAD_REQUEST, e.to_string()),
        ErrorKind::NotFound => fail(StatusCode::NOT_FOUND, e.to_string()),
        ErrorKind::Unavailable => {
            error!("data store unavailable: {}", e);
            fail(StatusCode::SERVICE_UNAVAILABLE, "data store unavailable")
        }
        ErrorKind::Internal => internal_error(e),
    }
}

// ── Availability guards ──────────────────────────────────────────

pub(crate) fn require_tuning(state: &AppState) -> ApiResult<&Arc<TuningEngine>> {
    state.tuning.as_ref().ok_or_else(|| {
        fail(StatusCode::SERVICE_UNAVAILABLE, "could not start tuning engine")
    })
}

pub(crate) fn require_store(state: &AppState) -> ApiResult<&Arc<dyn DataStore>> {
    state.data_store.as_ref().ok_or_else(|| {
        fail(StatusCode::SERVICE_UNAVAILABLE, "could not create database connection")
    })
}

pub(crate) fn require_stats(state: &AppState) -> ApiResult<&Arc<dyn StatsBackend>> {
    state.stats.as_ref().ok_or_else(|| {
        fail(StatusCode::SERVICE_UNAVAILABLE, "could not create stats db connection")
    })
}
