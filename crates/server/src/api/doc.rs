//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]`-annotated handlers and schema types into a
//! single OpenAPI document, served via Scalar UI at `/docs`.

use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

/// Response envelope as documented; `data` is one payload, or one payload per
/// metadata type for `t=all`.
#[derive(Serialize, ToSchema)]
pub struct EnvelopeDoc {
    /// `success`
    pub status: String,
    /// `default`, `db` or `cache`
    pub data_source: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inquisition API",
        version = "0.1.0",
        description = "Administration API for the Inquisition log-analysis platform: tuning, alerts and statistics.",
    ),
    tags(
        (name = "Health", description = "Server readiness"),
        (name = "Tuning", description = "Metadata records and configuration key/values"),
        (name = "Alerts", description = "Alert listing and removal"),
        (name = "Stats", description = "Platform statistics"),
    ),
    paths(
        crate::api::health::health,
        crate::api::tuning::tuning_get,
        crate::api::tuning::tuning_post,
        crate::api::tuning::tuning_put,
        crate::api::tuning::tuning_delete,
        crate::api::alerts::alerts_get,
        crate::api::alerts::alerts_delete,
        crate::api::stats::stats_get,
    ),
    components(schemas(
        EnvelopeDoc,
        crate::api::ErrorBody,
        crate::api::health::HealthResponse,
    ))
)]
pub struct ApiDoc;
