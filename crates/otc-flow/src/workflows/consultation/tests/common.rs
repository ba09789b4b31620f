use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt;

use crate::workflows::consultation::repository::{RepositoryError, SessionRepository};
use crate::workflows::consultation::session::{ConsultationSession, SessionId};
use crate::workflows::consultation::{consultation_router, ConsultationService};
use crate::workflows::packs::PackCatalog;
use crate::workflows::transcript::SAMPLE_TRANSCRIPTS;

pub(super) use crate::workflows::fixtures::{catalog, SORE_THROAT, UTI};

pub(super) fn uti_transcript() -> &'static str {
    SAMPLE_TRANSCRIPTS[0].text
}

pub(super) fn session() -> ConsultationSession {
    ConsultationSession::new(SessionId("consult-test".to_string()), &catalog())
        .expect("session evaluates")
}

pub(super) fn status_of<'a>(session: &'a ConsultationSession, id: &str) -> Option<&'a str> {
    session
        .suggestions
        .get(id)
        .map(|suggestion| suggestion.status.as_str())
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, ConsultationSession>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: ConsultationSession) -> Result<ConsultationSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<ConsultationSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn modify<T, E, F>(&self, id: &SessionId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut ConsultationSession) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        let stored = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let mut draft = stored.clone();
        let output = change(&mut draft)?;
        *stored = draft;
        Ok(output)
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _: ConsultationSession) -> Result<ConsultationSession, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _: &SessionId) -> Result<Option<ConsultationSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify<T, E, F>(&self, _: &SessionId, _: F) -> Result<T, E>
    where
        F: FnOnce(&mut ConsultationSession) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

pub(super) fn build_service() -> (
    ConsultationService<MemoryRepository>,
    watch::Sender<Arc<PackCatalog>>,
) {
    let (sender, receiver) = watch::channel(catalog());
    let service = ConsultationService::new(Arc::new(MemoryRepository::default()), receiver);
    (service, sender)
}

pub(super) fn router() -> Router {
    let (service, _) = build_service();
    consultation_router(Arc::new(service))
}

pub(super) async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).expect("payload serialises"))),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");
    router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}
