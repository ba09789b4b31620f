use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::consultation::{ConsultationError, RepositoryError};
use crate::workflows::packs::TrustError;
use crate::workflows::pathway::PathwayError;
use crate::workflows::transcript::TranscriptError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Trust(Arc<TrustError>),
    Pathway(PathwayError),
    Transcript(TranscriptError),
    Consultation(ConsultationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Trust(err) => write!(f, "rule pack trust error: {}", err),
            AppError::Pathway(err) => write!(f, "pathway error: {}", err),
            AppError::Transcript(err) => write!(f, "transcript error: {}", err),
            AppError::Consultation(err) => write!(f, "consultation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Trust(err) => Some(err.as_ref()),
            AppError::Pathway(err) => Some(err),
            AppError::Transcript(err) => Some(err),
            AppError::Consultation(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Trust(_) => StatusCode::BAD_GATEWAY,
            AppError::Pathway(_) | AppError::Transcript(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Consultation(
                ConsultationError::Repository(RepositoryError::NotFound)
                | ConsultationError::UnknownSuggestion(_),
            ) => StatusCode::NOT_FOUND,
            AppError::Consultation(ConsultationError::Repository(RepositoryError::Conflict)) => {
                StatusCode::CONFLICT
            }
            AppError::Consultation(ConsultationError::Repository(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Consultation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<Arc<TrustError>> for AppError {
    fn from(value: Arc<TrustError>) -> Self {
        Self::Trust(value)
    }
}

impl From<PathwayError> for AppError {
    fn from(value: PathwayError) -> Self {
        Self::Pathway(value)
    }
}

impl From<TranscriptError> for AppError {
    fn from(value: TranscriptError) -> Self {
        Self::Transcript(value)
    }
}

impl From<ConsultationError> for AppError {
    fn from(value: ConsultationError) -> Self {
        Self::Consultation(value)
    }
}
