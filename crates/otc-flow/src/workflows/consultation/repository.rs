use super::session::{ConsultationSession, SessionId};

/// Storage abstraction so the service can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: ConsultationSession) -> Result<ConsultationSession, RepositoryError>;

    fn fetch(&self, id: &SessionId) -> Result<Option<ConsultationSession>, RepositoryError>;

    /// Runs `change` against a copy of the stored session and keeps the copy only when
    /// `change` succeeds. The session is locked for the duration of the call.
    fn modify<T, E, F>(&self, id: &SessionId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut ConsultationSession) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
