use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::scoring::Strength;
use crate::workflows::FieldMap;

/// Provenance of a guessed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub strength: Strength,
    #[serde(rename = "match")]
    pub matched: String,
    /// UTF-8 byte offset of `matched` in the whitespace-normalised text the detector
    /// scanned, so `&text[index..]` starts with the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<String>,
}

/// A value proposed for one field with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGuess {
    pub value: Value,
    pub confidence: f64,
    pub evidence: Option<Evidence>,
}

impl FieldGuess {
    pub(super) fn matched(value: impl Into<Value>, evidence: Evidence) -> Self {
        Self {
            value: value.into(),
            confidence: evidence.strength.score(),
            evidence: Some(evidence),
        }
    }

    pub(super) fn absent(value: Value) -> Self {
        Self {
            value,
            confidence: 0.0,
            evidence: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.evidence.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientGuess {
    pub age: FieldGuess,
    pub sex: FieldGuess,
    pub pregnant: FieldGuess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndetectedField {
    pub id: String,
    pub label: String,
    pub reason: String,
}

impl UndetectedField {
    pub(super) fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            reason: "not_detected".to_string(),
        }
    }
}

/// Everything one pass over a transcript proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptExtraction {
    pub patient: PatientGuess,
    pub complaint_id: String,
    pub rule_pack_id: String,
    pub rule_pack_confidence: f64,
    /// In the pack's cue declaration order, duration last.
    pub answers: FieldMap<FieldGuess>,
    pub missing: Vec<UndetectedField>,
    pub warnings: Vec<String>,
}

impl TranscriptExtraction {
    pub fn pack_id(&self) -> Option<&str> {
        Some(self.rule_pack_id.as_str()).filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("rule pack {pack_id} has an invalid transcript pattern {pattern}: {source}")]
    InvalidCue {
        pack_id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
