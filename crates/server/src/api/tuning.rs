//! `/tuning` endpoints: metadata CRUD and config-file key/values.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Form;
use tracing::{debug, info};

use inquisition_tuning::{ResultEnvelope, TuningEngine, TuningRequest, TuningResult};

use crate::state::AppState;

use super::{
    cached, fail, not_found, require_tuning, tuning_error, ApiResult, Cached, DEFAULT_MAX_AGE,
};

type Params = Vec<(String, String)>;

fn pairs(params: &Params) -> impl Iterator<Item = (&str, &str)> {
    params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

#[derive(Debug, Clone, Copy)]
enum WriteOp {
    Update,
    Insert,
    Delete,
}

/// Query-string options followed by the form body, so body values win.
fn merge_options(query: Params, form: Result<Form<Params>, FormRejection>) -> Params {
    let mut opts = query;
    match form {
        Ok(Form(body)) => opts.extend(body),
        Err(e) => debug!("no usable form body: {}", e),
    }
    opts
}

async fn run_write(
    engine: &TuningEngine,
    op: WriteOp,
    req: &TuningRequest,
) -> TuningResult<ResultEnvelope> {
    match op {
        WriteOp::Update => engine.update(req).await,
        WriteOp::Insert => engine.insert(req).await,
        WriteOp::Delete => engine.delete(req).await,
    }
}

async fn handle_write(
    state: &AppState,
    op: WriteOp,
    opts: Params,
) -> ApiResult<Cached<ResultEnvelope>> {
    let engine = require_tuning(state)?;
    let mut req = TuningRequest::new();
    let recognised = req
        .set_tuning_values(pairs(&opts))
        .map_err(|e| tuning_error(e, false))?;
    if !recognised {
        return Err(fail(StatusCode::BAD_REQUEST, "no tuning options provided"));
    }
    info!(?op, metadata_type = ?req.metadata_type, id = req.identifier, "tuning write");
    let envelope = run_write(engine, op, &req)
        .await
        .map_err(|e| tuning_error(e, false))?;
    Ok(cached(0, envelope))
}

#[utoipa::path(
    get,
    path = "/tuning",
    tag = "Tuning",
    params(
        ("t" = Option<String>, Query, description = "Metadata type, `cfg` or `all` (alias `type`)"),
        ("s" = Option<String>, Query, description = "Config section (alias `section`)"),
        ("i" = Option<u64>, Query, description = "Record id (alias `id`)"),
        ("k" = Option<String>, Query, description = "Config key or column name (alias `key`)"),
    ),
    responses(
        (status = 200, description = "Overview, config values or metadata records", body = crate::api::doc::EnvelopeDoc),
        (status = 403, description = "Rejected read request", body = super::ErrorBody),
        (status = 404, description = "Empty data set", body = super::ErrorBody),
        (status = 500, description = "Internal error", body = super::ErrorBody),
        (status = 503, description = "Data store unavailable", body = super::ErrorBody)
    )
)]
pub async fn tuning_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> ApiResult<Cached<ResultEnvelope>> {
    let engine = require_tuning(&state)?;
    let req = TuningRequest::from_options(pairs(&params)).map_err(|e| tuning_error(e, true))?;
    let envelope = engine.fetch(&req).await.map_err(|e| tuning_error(e, true))?;
    if envelope.is_empty() {
        return Err(not_found());
    }
    Ok(cached(DEFAULT_MAX_AGE, envelope))
}

#[utoipa::path(
    post,
    path = "/tuning",
    tag = "Tuning",
    request_body(content = String, content_type = "application/x-www-form-urlencoded", description = "`t`, `s`, `i`, `k`, `v`"),
    responses(
        (status = 200, description = "Record updated or config key set", body = crate::api::doc::EnvelopeDoc),
        (status = 400, description = "Bad input", body = super::ErrorBody),
        (status = 404, description = "Config key not found", body = super::ErrorBody),
        (status = 500, description = "Internal error", body = super::ErrorBody)
    )
)]
pub async fn tuning_post(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Params>,
    form: Result<Form<Params>, FormRejection>,
) -> ApiResult<Cached<ResultEnvelope>> {
    handle_write(&state, WriteOp::Update, merge_options(query, form)).await
}

#[utoipa::path(
    put,
    path = "/tuning",
    tag = "Tuning",
    request_body(content = String, content_type = "application/x-www-form-urlencoded", description = "`t`, `s`, `k`, `v`; metadata inserts take `k={\"fields\":[..]}` and `v={\"values\":[..]}`"),
    responses(
        (status = 200, description = "Record inserted or config key added", body = crate::api::doc::EnvelopeDoc),
        (status = 400, description = "Bad input", body = super::ErrorBody),
        (status = 500, description = "Internal error", body = super::ErrorBody)
    )
)]
pub async fn tuning_put(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Params>,
    form: Result<Form<Params>, FormRejection>,
) -> ApiResult<Cached<ResultEnvelope>> {
    handle_write(&state, WriteOp::Insert, merge_options(query, form)).await
}

#[utoipa::path(
    delete,
    path = "/tuning",
    tag = "Tuning",
    request_body(content = String, content_type = "application/x-www-form-urlencoded", description = "`t` and `i`, or `s` and `k` for a config key"),
    responses(
        (status = 200, description = "Record or config key removed", body = crate::api::doc::EnvelopeDoc),
        (status = 400, description = "Bad input, including `cfg`/`all` deletions", body = super::ErrorBody),
        (status = 404, description = "Config key not found", body = super::ErrorBody),
        (status = 500, description = "Internal error", body = super::ErrorBody)
    )
)]
pub async fn tuning_delete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Params>,
    form: Result<Form<Params>, FormRejection>,
) -> ApiResult<Cached<ResultEnvelope>> {
    handle_write(&state, WriteOp::Delete, merge_options(query, form)).await
}
