use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::repository::{RepositoryError, SessionRepository};
use super::service::{ConsultationError, ConsultationService};
use super::session::{ConsultationSession, SessionId};

type SharedService<R> = Arc<ConsultationService<R>>;

/// Router builder exposing the consultation workspace over HTTP.
pub fn consultation_router<R>(service: SharedService<R>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/consultations", post(start_handler::<R>))
        .route("/api/v1/consultations/:session_id", get(get_handler::<R>))
        .route(
            "/api/v1/consultations/:session_id/complaint",
            put(complaint_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/pack",
            put(pack_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/patient/:field",
            put(patient_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/answers/:question_id",
            put(answer_handler::<R>).delete(clear_answer_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/transcript",
            post(transcript_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/suggestions/apply-confident",
            post(apply_confident_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/suggestions/:suggestion_id/apply",
            post(apply_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/suggestions/:suggestion_id/dismiss",
            post(dismiss_handler::<R>),
        )
        .route(
            "/api/v1/consultations/:session_id/reset",
            post(reset_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ComplaintSelection {
    pub complaint_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PackSelection {
    pub pack_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldValue {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptSubmission {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConfidentRequest {
    #[serde(default)]
    threshold: Option<f64>,
}

pub(crate) async fn start_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    respond(service.start(), StatusCode::CREATED)
}

pub(crate) async fn get_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    respond(service.get(&SessionId(session_id)), StatusCode::OK)
}

pub(crate) async fn complaint_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(selection): axum::Json<ComplaintSelection>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.select_complaint(&SessionId(session_id), &selection.complaint_id);
    respond(result, StatusCode::OK)
}

pub(crate) async fn pack_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(selection): axum::Json<PackSelection>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.select_pack(&SessionId(session_id), &selection.pack_id);
    respond(result, StatusCode::OK)
}

pub(crate) async fn patient_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, field)): Path<(String, String)>,
    axum::Json(body): axum::Json<FieldValue>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.update_patient(&SessionId(session_id), &field, &body.value);
    respond(result, StatusCode::OK)
}

pub(crate) async fn answer_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, question_id)): Path<(String, String)>,
    axum::Json(body): axum::Json<FieldValue>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.set_answer(&SessionId(session_id), &question_id, &body.value);
    respond(result, StatusCode::OK)
}

pub(crate) async fn clear_answer_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, question_id)): Path<(String, String)>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.clear_answer(&SessionId(session_id), &question_id);
    respond(result, StatusCode::OK)
}

pub(crate) async fn transcript_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    axum::Json(submission): axum::Json<TranscriptSubmission>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.ingest_transcript(&SessionId(session_id), &submission.text) {
        Ok((session, extraction)) => {
            let payload = json!({
                "session": session.view(),
                "extraction": extraction,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn apply_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, suggestion_id)): Path<(String, String)>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.apply_suggestion(&SessionId(session_id), &suggestion_id);
    respond(result, StatusCode::OK)
}

pub(crate) async fn dismiss_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, suggestion_id)): Path<(String, String)>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.dismiss_suggestion(&SessionId(session_id), &suggestion_id);
    respond(result, StatusCode::OK)
}

/// Body is optional; `{"threshold": 0.9}` overrides the default.
pub(crate) async fn apply_confident_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Response
where
    R: SessionRepository + 'static,
{
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ConfidentRequest::default()
    } else {
        match serde_json::from_slice::<ConfidentRequest>(&body) {
            Ok(request) => request,
            Err(error) => {
                let payload = json!({ "error": error.to_string() });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        }
    };
    let result = service.apply_confident(&SessionId(session_id), request.threshold);
    respond(result, StatusCode::OK)
}

pub(crate) async fn reset_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    respond(service.reset(&SessionId(session_id)), StatusCode::OK)
}

fn respond(result: Result<ConsultationSession, ConsultationError>, status: StatusCode) -> Response {
    match result {
        Ok(session) => (status, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ConsultationError) -> Response {
    let status = match &error {
        ConsultationError::Repository(RepositoryError::NotFound)
        | ConsultationError::UnknownSuggestion(_) => StatusCode::NOT_FOUND,
        ConsultationError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ConsultationError::UnknownPatientField(_) | ConsultationError::Pathway(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
