use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::normalize::{normalize_boolean, normalize_number};
use crate::logic::{LogicError, LogicValue};

/// Tri-state pregnancy status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pregnancy {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Pregnancy {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Pregnancy::Yes,
            Some(false) => Pregnancy::No,
            None => Pregnancy::Unknown,
        }
    }

    pub fn as_flag(self) -> Option<bool> {
        match self {
            Pregnancy::Yes => Some(true),
            Pregnancy::No => Some(false),
            Pregnancy::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Pregnancy::Yes => "yes",
            Pregnancy::No => "no",
            Pregnancy::Unknown => "unknown",
        }
    }
}

/// Patient facts in canonical form. Deserialisation accepts loose input
/// (`"28"`, `"Female"`, `"yes"`, `true`) and normalises it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PatientInput")]
pub struct PatientDetails {
    pub age: Option<f64>,
    pub sex: String,
    pub pregnant: Pregnancy,
    pub postcode: String,
}

#[derive(Debug, Default, Deserialize)]
struct PatientInput {
    #[serde(default)]
    age: Value,
    #[serde(default)]
    sex: Value,
    #[serde(default)]
    pregnant: Value,
    #[serde(default)]
    postcode: Value,
}

impl From<PatientInput> for PatientDetails {
    fn from(input: PatientInput) -> Self {
        Self {
            age: normalize_number(&input.age),
            sex: loose_text(&input.sex).to_lowercase(),
            pregnant: Pregnancy::from_flag(normalize_boolean(&input.pregnant)),
            postcode: loose_text(&input.postcode),
        }
    }
}

impl PatientDetails {
    pub const FIELDS: [&'static str; 4] = ["age", "sex", "pregnant", "postcode"];

    /// Normalises and stores one field. Returns `false` for an unknown field name.
    pub fn set_field(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "age" => self.age = normalize_number(value),
            "sex" => self.sex = loose_text(value).to_lowercase(),
            "pregnant" => self.pregnant = Pregnancy::from_flag(normalize_boolean(value)),
            "postcode" => self.postcode = loose_text(value),
            _ => return false,
        }
        true
    }

    pub(crate) fn context_value(&self) -> LogicValue {
        let mut patient = BTreeMap::new();
        patient.insert("age".to_string(), LogicValue::from(self.age));
        patient.insert("sex".to_string(), LogicValue::from(self.sex.as_str()));
        patient.insert(
            "pregnant".to_string(),
            LogicValue::from(self.pregnant.as_flag()),
        );
        patient.insert(
            "postcode".to_string(),
            LogicValue::from(self.postcode.as_str()),
        );
        LogicValue::Object(patient)
    }
}

fn loose_text(value: &Value) -> String {
    let value = LogicValue::from(value);
    if value.is_truthy() {
        value.to_display()
    } else {
        String::new()
    }
}

/// Patient facts plus answers keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    #[serde(default)]
    pub patient: PatientDetails,
    #[serde(default)]
    pub answers: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Incomplete,
    Refer,
    #[serde(alias = "advice")]
    Advise,
    Supply,
}

impl Outcome {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "incomplete" => Some(Outcome::Incomplete),
            "refer" => Some(Outcome::Refer),
            "advise" | "advice" => Some(Outcome::Advise),
            "supply" => Some(Outcome::Supply),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Incomplete => "incomplete",
            Outcome::Refer => "refer",
            Outcome::Advise => "advise",
            Outcome::Supply => "supply",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Pass,
    Fail,
    #[serde(alias = "warning")]
    Warn,
    #[serde(other)]
    Info,
}

impl TraceStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" => TraceStatus::Pass,
            "fail" => TraceStatus::Fail,
            "warn" | "warning" => TraceStatus::Warn,
            _ => TraceStatus::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TraceStatus::Pass => "pass",
            TraceStatus::Fail => "fail",
            TraceStatus::Warn => "warn",
            TraceStatus::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub status: TraceStatus,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    pub product: String,
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub destination: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Governance {
    pub version: String,
    pub effective_from: String,
    pub last_reviewed: String,
}

/// Decision for one pack and intake, recomputed wholesale on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub outcome: Outcome,
    pub urgency: String,
    pub headline: String,
    pub summary: String,
    #[serde(default)]
    pub missing: Vec<MissingField>,
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub safety_net: Vec<String>,
    #[serde(default)]
    pub supply: Option<Supply>,
    #[serde(default)]
    pub referral: Option<Referral>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub governance: Option<Governance>,
}

impl EvaluationResult {
    /// Terminal `incomplete` prompt with no decision content.
    pub fn prompt(headline: &str, summary: &str) -> Self {
        Self {
            outcome: Outcome::Incomplete,
            urgency: "routine".to_string(),
            headline: headline.to_string(),
            summary: summary.to_string(),
            missing: Vec::new(),
            trace: Vec::new(),
            warnings: Vec::new(),
            actions: Vec::new(),
            safety_net: Vec::new(),
            supply: None,
            referral: None,
            documentation: None,
            governance: None,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.outcome == Outcome::Incomplete
    }
}

#[derive(Debug, Error)]
pub enum PathwayError {
    #[error("rule pack {pack_id} failed to evaluate: {source}")]
    Logic {
        pack_id: String,
        #[source]
        source: LogicError,
    },
    #[error("rule pack {pack_id} produced unknown outcome {value}")]
    UnknownOutcome { pack_id: String, value: String },
}
