use metrics_exporter_prometheus::PrometheusHandle;
use otc_flow::config::RulesConfig;
use otc_flow::error::AppError;
use otc_flow::workflows::consultation::{
    ConsultationService, ConsultationSession, RepositoryError, SessionId, SessionRepository,
};
use otc_flow::workflows::packs::{PackCatalog, PackRegistry};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

pub(crate) type Consultations = ConsultationService<InMemorySessionRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) registry: Arc<PackRegistry>,
    pub(crate) consultations: Arc<Consultations>,
}

impl AppState {
    pub(crate) fn new(registry: Arc<PackRegistry>, metrics: PrometheusHandle) -> Self {
        let consultations = Arc::new(ConsultationService::new(
            Arc::new(InMemorySessionRepository::default()),
            registry.subscribe(),
        ));
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
            registry,
            consultations,
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, ConsultationSession>>>,
}

impl SessionRepository for InMemorySessionRepository {
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

/// Registry for the configured bundle, with `--rules` taking precedence.
pub(crate) fn pack_registry(mut rules: RulesConfig, override_base: Option<String>) -> Arc<PackRegistry> {
    if let Some(base) = override_base {
        rules.base = base;
    }
    Arc::new(PackRegistry::new(rules.source()))
}

/// Loads the bundle once for one-shot CLI commands.
pub(crate) async fn verified_catalog(registry: &PackRegistry) -> Result<Arc<PackCatalog>, AppError> {
    Ok(registry.load().await?)
}
