//! `/alerts` endpoints.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Form;

use inquisition_tuning::ResultEnvelope;

use crate::alerts::{self, AlertError, AlertQuery};
use crate::state::AppState;

use super::{cached, fail, not_found, require_store, tuning_error, ApiError, ApiResult, Cached};

type Params = Vec<(String, String)>;

fn alert_error(e: AlertError, read_path: bool) -> ApiError {
    match e {
        AlertError::Store(inner) => tuning_error(inner, read_path),
        other => fail(StatusCode::BAD_REQUEST, other.to_string()),
    }
}

fn max_age(state: &AppState) -> u64 {
    u64::try_from(state.caching.alert_expiration).unwrap_or(0)
}

#[utoipa::path(
    get,
    path = "/alerts",
    tag = "Alerts",
    params(
        ("i" = Option<u64>, Query, description = "Alert id; disables every other filter (alias `id`)"),
        ("t" = Option<u64>, Query, description = "Alert type (alias `type`)"),
        ("a" = Option<String>, Query, description = "Created at or after (alias `after`)"),
        ("b" = Option<String>, Query, description = "Created at or before (alias `before`)"),
        ("h" = Option<String>, Query, description = "Host (alias `host`)"),
        ("s" = Option<String>, Query, description = "Source node (alias `src`)"),
        ("d" = Option<String>, Query, description = "Destination node (alias `dst`)"),
        ("o" = Option<String>, Query, description = "Order column, default `created` (alias `order`)"),
        ("p" = Option<String>, Query, description = "`ASC` or `DESC` (alias `placement`)"),
        ("l" = Option<u64>, Query, description = "Result limit, default 5, 0 for none (alias `limit`)"),
    ),
    responses(
        (status = 200, description = "Matching alerts", body = crate::api::doc::EnvelopeDoc),
        (status = 400, description = "Bad filter", body = super::ErrorBody),
        (status = 404, description = "Requested alert not found", body = super::ErrorBody),
        (status = 503, description = "Data store unavailable", body = super::ErrorBody)
    )
)]
pub async fn alerts_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> ApiResult<Cached<ResultEnvelope>> {
    let store = require_store(&state)?;
    let query = AlertQuery::from_options(params.iter().map(|(k, v)| (k, v)))
        .map_err(|e| alert_error(e, true))?;
    let envelope = alerts::fetch_alerts(store.as_ref(), state.cache.as_ref(), &query)
        .await
        .map_err(|e| alert_error(e, true))?;
    if query.id > 0 && envelope.is_empty() {
        return Err(not_found());
    }
    Ok(cached(max_age(&state), envelope))
}

#[utoipa::path(
    delete,
    path = "/alerts",
    tag = "Alerts",
    request_body(content = String, content_type = "application/x-www-form-urlencoded", description = "`i`: alert id"),
    responses(
        (status = 200, description = "Whether an alert was removed", body = crate::api::doc::EnvelopeDoc),
        (status = 400, description = "Missing or invalid id", body = super::ErrorBody),
        (status = 503, description = "Data store unavailable", body = super::ErrorBody)
    )
)]
pub async fn alerts_delete(
    State(state): State<Arc<AppState>>,
    Query(mut params): Query<Params>,
    form: Result<Form<Params>, FormRejection>,
) -> ApiResult<Cached<ResultEnvelope>> {
    let store = require_store(&state)?;
    if let Ok(Form(body)) = form {
        params.extend(body);
    }
    let query = AlertQuery::from_options(params.iter().map(|(k, v)| (k, v)))
        .map_err(|e| alert_error(e, false))?;
    let envelope = alerts::delete_alert(store.as_ref(), query.id)
        .await
        .map_err(|e| alert_error(e, false))?;
    Ok(cached(0, envelope))
}
