use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::service::ConsultationError;
use super::suggestions::{SuggestionSet, SuggestionStatus, SuggestionTarget};
use crate::workflows::packs::PackCatalog;
use crate::workflows::pathway::{
    evaluate_intake, normalize_answer, EvaluationResult, Intake, PatientDetails,
};
use crate::workflows::transcript::TranscriptExtraction;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session plus the per-suggestion status labels the review panel renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView<'a> {
    #[serde(flatten)]
    pub session: &'a ConsultationSession,
    pub suggestion_statuses: BTreeMap<String, String>,
}

/// One clinician's working intake. Every mutation re-runs the evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationSession {
    pub id: SessionId,
    pub complaint_id: String,
    pub pack_id: String,
    pub intake: Intake,
    pub suggestions: SuggestionSet,
    pub evaluation: Option<EvaluationResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationSession {
    pub fn new(id: SessionId, catalog: &PackCatalog) -> Result<Self, ConsultationError> {
        let now = Utc::now();
        let mut session = Self {
            id,
            complaint_id: String::new(),
            pack_id: String::new(),
            intake: Intake::default(),
            suggestions: SuggestionSet::default(),
            evaluation: None,
            created_at: now,
            updated_at: now,
        };
        session.evaluate(catalog)?;
        Ok(session)
    }

    /// Selects the first pack filed under `complaint_id`.
    pub fn select_complaint(
        &mut self,
        catalog: &PackCatalog,
        complaint_id: &str,
    ) -> Result<(), ConsultationError> {
        self.complaint_id = complaint_id.to_string();
        let first = catalog
            .packs_for_complaint(complaint_id)
            .next()
            .map(|pack| pack.id.clone())
            .unwrap_or_default();
        self.select_pack(catalog, &first)
    }

    /// Unknown ids clear the selection. Answers are always cleared.
    pub fn select_pack(
        &mut self,
        catalog: &PackCatalog,
        pack_id: &str,
    ) -> Result<(), ConsultationError> {
        self.pack_id = catalog
            .get(pack_id)
            .map(|pack| pack.id.clone())
            .unwrap_or_default();
        self.intake.answers.clear();
        self.evaluate(catalog)
    }

    pub fn update_patient(
        &mut self,
        catalog: &PackCatalog,
        field: &str,
        value: &Value,
    ) -> Result<(), ConsultationError> {
        if !self.intake.patient.set_field(field, value) {
            return Err(ConsultationError::UnknownPatientField(field.to_string()));
        }
        self.evaluate(catalog)
    }

    pub fn set_answer(
        &mut self,
        catalog: &PackCatalog,
        question_id: &str,
        value: &Value,
    ) -> Result<(), ConsultationError> {
        self.store_answer(catalog, question_id, value);
        self.evaluate(catalog)
    }

    pub fn clear_answer(
        &mut self,
        catalog: &PackCatalog,
        question_id: &str,
    ) -> Result<(), ConsultationError> {
        self.intake.answers.remove(question_id);
        self.evaluate(catalog)
    }

    /// Rebuilds suggestions from a fresh extraction and adopts its pack guess when
    /// nothing is selected yet.
    pub fn ingest_extraction(
        &mut self,
        catalog: &PackCatalog,
        extraction: &TranscriptExtraction,
    ) -> Result<(), ConsultationError> {
        self.suggestions = SuggestionSet::reconcile(extraction, &self.suggestions);
        if self.pack_id.is_empty() {
            if let Some(pack) = extraction.pack_id().and_then(|id| catalog.get(id)) {
                self.complaint_id = pack.complaint_id().unwrap_or_default().to_string();
                self.pack_id = pack.id.clone();
                self.intake.answers.clear();
            }
        }
        self.evaluate(catalog)
    }

    /// Copies a pending suggestion into the intake. Returns whether anything changed.
    pub fn apply_suggestion(
        &mut self,
        catalog: &PackCatalog,
        suggestion_id: &str,
    ) -> Result<bool, ConsultationError> {
        if !self.apply_one(catalog, suggestion_id)? {
            return Ok(false);
        }
        self.evaluate(catalog)?;
        Ok(true)
    }

    pub fn dismiss_suggestion(
        &mut self,
        catalog: &PackCatalog,
        suggestion_id: &str,
    ) -> Result<bool, ConsultationError> {
        let suggestion = self
            .suggestions
            .get_mut(suggestion_id)
            .ok_or_else(|| ConsultationError::UnknownSuggestion(suggestion_id.to_string()))?;
        if suggestion.status == SuggestionStatus::Dismissed {
            return Ok(false);
        }
        suggestion.status = SuggestionStatus::Dismissed;
        self.evaluate(catalog)?;
        Ok(true)
    }

    /// Applies every pending suggestion at or above `threshold`, in order. Returns the
    /// ids applied.
    pub fn apply_confident(
        &mut self,
        catalog: &PackCatalog,
        threshold: f64,
    ) -> Result<Vec<String>, ConsultationError> {
        let candidates: Vec<String> = self
            .suggestions
            .iter()
            .filter(|suggestion| {
                !suggestion.status.is_settled() && suggestion.confidence >= threshold
            })
            .map(|suggestion| suggestion.id.clone())
            .collect();

        let mut applied = Vec::new();
        for id in candidates {
            if self.apply_one(catalog, &id)? {
                applied.push(id);
            }
        }
        if !applied.is_empty() {
            self.evaluate(catalog)?;
        }
        Ok(applied)
    }

    /// Back to an empty intake with no complaint, pack or suggestions.
    pub fn reset(&mut self, catalog: &PackCatalog) -> Result<(), ConsultationError> {
        self.complaint_id.clear();
        self.pack_id.clear();
        self.intake = Intake::default();
        self.suggestions = SuggestionSet::default();
        self.evaluate(catalog)
    }

    pub fn suggestion_statuses(&self) -> BTreeMap<String, String> {
        self.suggestions.statuses()
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            session: self,
            suggestion_statuses: self.suggestion_statuses(),
        }
    }

    pub fn patient(&self) -> &PatientDetails {
        &self.intake.patient
    }

    fn apply_one(
        &mut self,
        catalog: &PackCatalog,
        suggestion_id: &str,
    ) -> Result<bool, ConsultationError> {
        let suggestion = self
            .suggestions
            .get(suggestion_id)
            .ok_or_else(|| ConsultationError::UnknownSuggestion(suggestion_id.to_string()))?;
        if suggestion.status.is_settled() {
            return Ok(false);
        }
        let (target, field, value) = (
            suggestion.target,
            suggestion.field.clone(),
            suggestion.value.clone(),
        );

        match target {
            SuggestionTarget::Patient => {
                if !self.intake.patient.set_field(&field, &value) {
                    return Ok(false);
                }
            }
            SuggestionTarget::Answer => self.store_answer(catalog, &field, &value),
        }
        if let Some(suggestion) = self.suggestions.get_mut(suggestion_id) {
            suggestion.status = SuggestionStatus::Applied;
        }
        Ok(true)
    }

    fn store_answer(&mut self, catalog: &PackCatalog, question_id: &str, value: &Value) {
        let question = catalog
            .get(&self.pack_id)
            .and_then(|pack| pack.question(question_id));
        self.intake
            .answers
            .insert(question_id.to_string(), normalize_answer(question, value));
    }

    fn evaluate(&mut self, catalog: &PackCatalog) -> Result<(), ConsultationError> {
        let pack_id = Some(self.pack_id.as_str()).filter(|id| !id.is_empty());
        let evaluation = evaluate_intake(catalog, pack_id, &self.intake)?;
        self.evaluation = Some(evaluation);
        self.updated_at = Utc::now();
        Ok(())
    }
}
