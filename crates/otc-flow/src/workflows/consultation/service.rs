use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use super::repository::{RepositoryError, SessionRepository};
use super::session::{ConsultationSession, SessionId};
use super::suggestions::CONFIDENT_THRESHOLD;
use crate::workflows::packs::PackCatalog;
use crate::workflows::pathway::PathwayError;
use crate::workflows::transcript::{TranscriptError, TranscriptExtraction, TranscriptExtractor};

type ExtractorCache = Option<(Arc<PackCatalog>, Arc<TranscriptExtractor>)>;

/// Service composing session storage with the live pack catalog.
pub struct ConsultationService<R> {
    repository: Arc<R>,
    catalog: watch::Receiver<Arc<PackCatalog>>,
    extractor: Mutex<ExtractorCache>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("consult-{id:06}"))
}

impl<R> ConsultationService<R>
where
    R: SessionRepository + 'static,
{
    /// `catalog` is usually `PackRegistry::subscribe()`, so sessions always see the
    /// latest verified packs.
    pub fn new(repository: Arc<R>, catalog: watch::Receiver<Arc<PackCatalog>>) -> Self {
        Self {
            repository,
            catalog,
            extractor: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> Arc<PackCatalog> {
        self.catalog.borrow().clone()
    }

    /// Extractor for the current catalog, rebuilt only when the catalog changes.
    pub fn extractor(&self) -> Result<Arc<TranscriptExtractor>, ConsultationError> {
        let catalog = self.catalog();
        let mut cache = self.extractor.lock().expect("extractor cache poisoned");
        if let Some((cached_for, extractor)) = cache.as_ref() {
            if Arc::ptr_eq(cached_for, &catalog) {
                return Ok(extractor.clone());
            }
        }
        let extractor = Arc::new(TranscriptExtractor::new(&catalog)?);
        *cache = Some((catalog, extractor.clone()));
        Ok(extractor)
    }

    pub fn start(&self) -> Result<ConsultationSession, ConsultationError> {
        let session = ConsultationSession::new(next_session_id(), &self.catalog())?;
        let stored = self.repository.insert(session)?;
        info!(session_id = %stored.id, "consultation started");
        Ok(stored)
    }

    pub fn get(&self, id: &SessionId) -> Result<ConsultationSession, ConsultationError> {
        let session = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(session)
    }

    pub fn select_complaint(
        &self,
        id: &SessionId,
        complaint_id: &str,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| {
            session.select_complaint(catalog, complaint_id)
        })
    }

    pub fn select_pack(
        &self,
        id: &SessionId,
        pack_id: &str,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| session.select_pack(catalog, pack_id))
    }

    pub fn update_patient(
        &self,
        id: &SessionId,
        field: &str,
        value: &Value,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| {
            session.update_patient(catalog, field, value)
        })
    }

    pub fn set_answer(
        &self,
        id: &SessionId,
        question_id: &str,
        value: &Value,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| {
            session.set_answer(catalog, question_id, value)
        })
    }

    pub fn clear_answer(
        &self,
        id: &SessionId,
        question_id: &str,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| {
            session.clear_answer(catalog, question_id)
        })
    }

    /// Extracts suggestions from `text` and merges them into the session.
    pub fn ingest_transcript(
        &self,
        id: &SessionId,
        text: &str,
    ) -> Result<(ConsultationSession, TranscriptExtraction), ConsultationError> {
        let extraction = self.extractor()?.extract(text);
        let session = self.mutate(id, |session, catalog| {
            session.ingest_extraction(catalog, &extraction)
        })?;
        Ok((session, extraction))
    }

    pub fn apply_suggestion(
        &self,
        id: &SessionId,
        suggestion_id: &str,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| {
            session.apply_suggestion(catalog, suggestion_id)
        })
    }

    pub fn dismiss_suggestion(
        &self,
        id: &SessionId,
        suggestion_id: &str,
    ) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| {
            session.dismiss_suggestion(catalog, suggestion_id)
        })
    }

    /// Bulk apply; `threshold` defaults to 0.85.
    pub fn apply_confident(
        &self,
        id: &SessionId,
        threshold: Option<f64>,
    ) -> Result<ConsultationSession, ConsultationError> {
        let threshold = threshold.unwrap_or(CONFIDENT_THRESHOLD);
        self.mutate(id, |session, catalog| {
            session.apply_confident(catalog, threshold)
        })
    }

    pub fn reset(&self, id: &SessionId) -> Result<ConsultationSession, ConsultationError> {
        self.mutate(id, |session, catalog| session.reset(catalog))
    }

    fn mutate<T, F>(&self, id: &SessionId, change: F) -> Result<ConsultationSession, ConsultationError>
    where
        F: FnOnce(&mut ConsultationSession, &PackCatalog) -> Result<T, ConsultationError>,
    {
        let catalog = self.catalog();
        self.repository.modify(id, |session| {
            change(session, &catalog)?;
            Ok(session.clone())
        })
    }
}

/// Error raised by the consultation service.
#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Pathway(#[from] PathwayError),
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    #[error("unknown suggestion {0}")]
    UnknownSuggestion(String),
    #[error("unknown patient field {0}")]
    UnknownPatientField(String),
}
