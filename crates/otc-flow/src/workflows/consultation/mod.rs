//! Clinician-facing consultation workspace.
//!
//! A session holds the intake being assembled, the suggestions proposed by the latest
//! transcript, and the evaluation recomputed after every change.

pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod suggestions;

#[cfg(test)]
mod tests;

pub use repository::{RepositoryError, SessionRepository};
pub use router::consultation_router;
pub use service::{ConsultationError, ConsultationService};
pub use session::{ConsultationSession, SessionId, SessionView};
pub use suggestions::{
    describe_confidence, Suggestion, SuggestionSet, SuggestionStatus, SuggestionTarget,
    CONFIDENT_THRESHOLD,
};
