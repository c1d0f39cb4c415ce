//! `/stats` endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};

use inquisition_tuning::ResultEnvelope;

use crate::state::AppState;
use crate::stats::{collect_stats, StatsQuery};

use super::{cached, internal_error, require_stats, ApiResult, Cached, DEFAULT_MAX_AGE};

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Stats",
    params(
        ("t" = Option<String>, Query, description = "Stat type; loads every `stats:<type>:*` hash (alias `type`)"),
        ("k" = Option<String>, Query, description = "Hash key to narrow to (alias `key`)"),
        ("n" = Option<String>, Query, description = "Single stat field to project (alias `name`)"),
    ),
    responses(
        (status = 200, description = "Stat hashes keyed by hash key", body = crate::api::doc::EnvelopeDoc),
        (status = 500, description = "Stats store error", body = super::ErrorBody),
        (status = 503, description = "Stats store unavailable", body = super::ErrorBody)
    )
)]
pub async fn stats_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Cached<ResultEnvelope>> {
    let backend = require_stats(&state)?;
    let query = StatsQuery::from_options(params.iter().map(|(k, v)| (k, v)));
    let data = collect_stats(backend.as_ref(), &query)
        .await
        .map_err(internal_error)?;
    let data = serde_json::to_value(data).map_err(internal_error)?;
    Ok(cached(DEFAULT_MAX_AGE, ResultEnvelope::single(data)))
}
