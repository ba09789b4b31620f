use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use otc_flow::error::AppError;
use otc_flow::workflows::consultation::consultation_router;
use otc_flow::workflows::packs::{ComplaintOption, PackCatalog, PackSummary};
use otc_flow::workflows::pathway::{evaluate_intake, EvaluationResult, Intake};
use otc_flow::workflows::transcript::TranscriptExtraction;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateRequest {
    #[serde(default)]
    pub(crate) pack_id: Option<String>,
    #[serde(default)]
    pub(crate) intake: Intake,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptRequest {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PackListing {
    pub(crate) source: String,
    pub(crate) loaded_at: Option<String>,
    pub(crate) packs: Vec<PackSummary>,
    pub(crate) complaints: Vec<ComplaintOption>,
}

impl PackListing {
    fn new(source: String, catalog: &PackCatalog) -> Self {
        Self {
            source,
            loaded_at: catalog.loaded_at().map(|at| at.to_rfc3339()),
            packs: catalog.summaries(),
            complaints: catalog.complaint_options(),
        }
    }
}

pub(crate) fn with_platform_routes(state: &AppState) -> axum::Router {
    consultation_router(state.consultations.clone())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/packs", axum::routing::get(packs_endpoint))
        .route(
            "/api/v1/packs/reload",
            axum::routing::post(reload_endpoint),
        )
        .route("/api/v1/evaluate", axum::routing::post(evaluate_endpoint))
        .route(
            "/api/v1/transcripts/parse",
            axum::routing::post(transcript_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready", "packs": state.registry.catalog().len() })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn packs_endpoint(Extension(state): Extension<AppState>) -> Json<PackListing> {
    let catalog = state.registry.catalog();
    Json(PackListing::new(state.registry.location(), &catalog))
}

/// Refetches and re-verifies the bundle; the previous catalog stays live on failure.
pub(crate) async fn reload_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<PackListing>, AppError> {
    let catalog = state.registry.reload().await?;
    state.readiness.store(true, Ordering::Release);
    Ok(Json(PackListing::new(state.registry.location(), &catalog)))
}

pub(crate) async fn evaluate_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluationResult>, AppError> {
    let catalog = state.registry.catalog();
    let result = evaluate_intake(&catalog, request.pack_id.as_deref(), &request.intake)?;
    Ok(Json(result))
}

pub(crate) async fn transcript_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> Result<Json<TranscriptExtraction>, AppError> {
    let extractor = state.consultations.extractor()?;
    Ok(Json(extractor.extract(&request.text)))
}
