use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::transcript::{round2, FieldGuess, TranscriptExtraction};

/// Confidence at or above which bulk apply accepts a suggestion.
pub const CONFIDENT_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionTarget {
    Patient,
    Answer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Applied,
    Dismissed,
}

impl SuggestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Applied => "applied",
            SuggestionStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_settled(self) -> bool {
        self != SuggestionStatus::Pending
    }
}

/// A transcript value awaiting the clinician's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub target: SuggestionTarget,
    pub field: String,
    pub value: Value,
    pub confidence: f64,
    pub status: SuggestionStatus,
}

/// Ordered suggestions from the latest extraction: patient fields first, then answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionSet {
    items: Vec<Suggestion>,
}

impl SuggestionSet {
    /// Replaces `previous` wholesale. A suggestion keeps its earlier status only when the
    /// same id comes back with an identical value.
    pub fn reconcile(extraction: &TranscriptExtraction, previous: &SuggestionSet) -> Self {
        let patient = [
            ("age", &extraction.patient.age),
            ("sex", &extraction.patient.sex),
            ("pregnant", &extraction.patient.pregnant),
        ];
        let patient = patient.into_iter().map(|(field, guess)| {
            (format!("patient.{field}"), SuggestionTarget::Patient, field, guess)
        });
        let answers = extraction.answers.iter().map(|(field, guess)| {
            (field.clone(), SuggestionTarget::Answer, field.as_str(), guess)
        });

        let items = patient
            .chain(answers)
            .filter(|(_, _, _, guess)| worth_suggesting(&guess.value))
            .map(|(id, target, field, guess)| {
                let status = previous.inherited_status(&id, &guess.value);
                suggestion(id, target, field, guess, status)
            })
            .collect();
        Self { items }
    }

    fn inherited_status(&self, id: &str, value: &Value) -> SuggestionStatus {
        self.get(id)
            .filter(|earlier| &earlier.value == value)
            .map_or(SuggestionStatus::Pending, |earlier| earlier.status)
    }

    pub fn get(&self, id: &str) -> Option<&Suggestion> {
        self.items.iter().find(|suggestion| suggestion.id == id)
    }

    pub(super) fn get_mut(&mut self, id: &str) -> Option<&mut Suggestion> {
        self.items.iter_mut().find(|suggestion| suggestion.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suggestion> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `applied`, `dismissed`, or the confidence label of a pending suggestion.
    pub fn statuses(&self) -> BTreeMap<String, String> {
        self.items
            .iter()
            .map(|suggestion| {
                let label = if suggestion.status.is_settled() {
                    suggestion.status.as_str()
                } else {
                    describe_confidence(suggestion.confidence)
                };
                (suggestion.id.clone(), label.to_string())
            })
            .collect()
    }
}

fn suggestion(
    id: String,
    target: SuggestionTarget,
    field: &str,
    guess: &FieldGuess,
    status: SuggestionStatus,
) -> Suggestion {
    let confidence = if guess.confidence.is_nan() {
        0.0
    } else {
        round2(guess.confidence)
    };
    Suggestion {
        id,
        target,
        field: field.to_string(),
        value: guess.value.clone(),
        confidence,
        status,
    }
}

fn worth_suggesting(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !matches!(text.trim(), "" | "unknown"),
        _ => true,
    }
}

pub fn describe_confidence(confidence: f64) -> &'static str {
    if confidence.is_nan() {
        "needs review"
    } else if confidence >= 0.85 {
        "confirmed"
    } else if confidence >= 0.6 {
        "likely accurate"
    } else if confidence >= 0.4 {
        "needs review"
    } else {
        "low confidence"
    }
}
