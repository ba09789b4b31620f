use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::manifest::ManifestEntry;
use crate::workflows::FieldMap;
use crate::logic::{Expression, LogicError, LogicValue, EXPRESSION_MARKER};

/// Presenting complaint a pack is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Boolean,
    Number,
    Select,
    MultiSelect,
    #[serde(other)]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Patient fields and answer ids that must be captured before logic runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFields {
    #[serde(default)]
    pub patient: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PackIntake {
    #[serde(default)]
    required: RequiredFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedValue {
    pub id: String,
    pub expression: Value,
}

/// Trace, warning, and result fragment attached to a rule branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub expression: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<RuleDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<RuleDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub expression: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<RuleDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeTrace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<RuleDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<RuleDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub expression: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<OutcomeTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<RuleDetail>,
    pub result: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackLogic {
    #[serde(default)]
    pub derived: Vec<DerivedValue>,
    #[serde(default)]
    pub checks: Vec<CheckRule>,
    #[serde(default)]
    pub advice: Vec<AdviceRule>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultRule>,
}

/// Weighted keyword that votes for a pack when it appears in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHint {
    pub pattern: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

/// Regex cue proposing a value for one answer field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCue {
    pub value: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default)]
    pub bypass_negation: bool,
}

/// Patient cohort a pack is written for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default)]
    pub excludes_pregnancy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Optional transcript cue table declared inside a pack file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptHints {
    #[serde(default)]
    pub keywords: Vec<KeywordHint>,
    #[serde(default)]
    pub cues: FieldMap<Vec<AnswerCue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicability: Option<Applicability>,
}

/// Where a verified pack came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSource {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackMeta {
    id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    effective_from: Option<String>,
    last_reviewed: Option<String>,
}

/// Pack file as authored, before normalisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackDocument {
    #[serde(default)]
    meta: PackMeta,
    #[serde(default)]
    effective_from: Option<String>,
    #[serde(default)]
    last_reviewed: Option<String>,
    #[serde(default)]
    complaint: Option<Complaint>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    inclusion: Vec<String>,
    #[serde(default)]
    exclusion: Vec<String>,
    #[serde(default)]
    safety_netting: Vec<String>,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    intake: PackIntake,
    #[serde(default)]
    logic: PackLogic,
    #[serde(default)]
    transcript: Option<TranscriptHints>,
}

/// A verified, normalised clinical pathway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePack {
    pub id: String,
    pub name: String,
    pub version: String,
    pub effective_from: Option<String>,
    pub last_reviewed: Option<String>,
    pub complaint: Option<Complaint>,
    pub description: String,
    pub inclusion: Vec<String>,
    pub exclusion: Vec<String>,
    pub safety_netting: Vec<String>,
    pub sections: Vec<Section>,
    pub required: RequiredFields,
    pub logic: PackLogic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptHints>,
    pub source: PackSource,
    /// The serialised pack as expressions see it under `pack`, built once at parse time.
    #[serde(skip)]
    context: LogicValue,
}

/// Listing entry for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub complaint: Option<Complaint>,
    pub effective_from: Option<String>,
    pub last_reviewed: Option<String>,
    pub checksum: Option<String>,
}

impl RulePack {
    /// Parses a pack file, filling identity gaps from its manifest entry.
    pub fn parse(text: &str, entry: &ManifestEntry) -> Result<Self, serde_json::Error> {
        let document: PackDocument = serde_json::from_str(text)?;
        let mut pack = Self::from_document(document, entry);
        pack.context = LogicValue::from(serde_json::to_value(&pack)?);
        Ok(pack)
    }

    fn from_document(document: PackDocument, entry: &ManifestEntry) -> Self {
        let PackDocument {
            meta,
            effective_from,
            last_reviewed,
            complaint,
            description,
            inclusion,
            exclusion,
            safety_netting,
            sections,
            intake,
            logic,
            transcript,
        } = document;

        Self {
            id: non_empty(meta.id).unwrap_or_else(|| entry.id.clone()),
            name: non_empty(meta.name).unwrap_or_else(|| entry.name.clone()),
            version: non_empty(meta.version).unwrap_or_else(|| entry.version.clone()),
            effective_from: non_empty(meta.effective_from).or_else(|| non_empty(effective_from)),
            last_reviewed: non_empty(meta.last_reviewed).or_else(|| non_empty(last_reviewed)),
            complaint,
            description,
            inclusion,
            exclusion,
            safety_netting,
            sections,
            required: intake.required,
            logic,
            transcript,
            source: PackSource {
                path: entry.path.clone(),
                checksum: entry.checksum.clone(),
            },
            context: LogicValue::Undefined,
        }
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions().find(|question| question.id == id)
    }

    pub fn required_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions().filter(|question| question.required)
    }

    pub fn complaint_id(&self) -> Option<&str> {
        self.complaint.as_ref().map(|complaint| complaint.id.as_str())
    }

    pub fn summary(&self) -> PackSummary {
        PackSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            complaint: self.complaint.clone(),
            effective_from: self.effective_from.clone(),
            last_reviewed: self.last_reviewed.clone(),
            checksum: self.source.checksum.clone(),
        }
    }

    /// Parses every expression the pack declares, including `expr` markers in templates.
    pub fn validate_logic(&self) -> Result<(), LogicError> {
        let logic = &self.logic;
        for derived in &logic.derived {
            Expression::parse(&derived.expression)?;
        }
        for check in &logic.checks {
            Expression::parse(&check.expression)?;
            for detail in [&check.pass, &check.fail].into_iter().flatten() {
                validate_detail(detail)?;
            }
        }
        for advice in &logic.advice {
            Expression::parse(&advice.expression)?;
            if let Some(trace) = &advice.trace {
                validate_detail(trace)?;
            }
            validate_templates(advice.warnings.as_ref())?;
            validate_templates(advice.actions.as_ref())?;
        }
        for outcome in &logic.outcomes {
            Expression::parse(&outcome.expression)?;
            if let Some(trace) = &outcome.trace {
                for detail in [&trace.pass, &trace.fail].into_iter().flatten() {
                    validate_detail(detail)?;
                }
            }
            validate_templates(outcome.warnings.as_ref())?;
            validate_templates(outcome.actions.as_ref())?;
            validate_templates(Some(&outcome.result))?;
        }
        if let Some(default) = &logic.default {
            if let Some(trace) = &default.trace {
                validate_detail(trace)?;
            }
            validate_templates(Some(&default.result))?;
        }
        Ok(())
    }

    /// Pack facet exposed to expressions under `pack`.
    pub(crate) fn context_value(&self) -> &LogicValue {
        &self.context
    }
}

fn validate_detail(detail: &RuleDetail) -> Result<(), LogicError> {
    validate_templates(detail.label.as_ref())?;
    validate_templates(detail.warnings.as_ref())?;
    validate_templates(detail.result.as_ref())
}

fn validate_templates(value: Option<&Value>) -> Result<(), LogicError> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .try_for_each(|item| validate_templates(Some(item))),
        Some(Value::Object(map)) => {
            if map.len() == 1 {
                if let Some(expression) = map.get(EXPRESSION_MARKER) {
                    Expression::parse(expression)?;
                    return Ok(());
                }
            }
            map.values()
                .try_for_each(|child| validate_templates(Some(child)))
        }
        _ => Ok(()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
