use std::collections::BTreeMap;

use serde_json::Value;

use super::documentation::render_note;
use super::domain::{
    EvaluationResult, Governance, Intake, Outcome, PathwayError, Referral, Supply, TraceEntry,
    TraceStatus,
};
use super::normalize::normalize_answers;
use crate::logic::{evaluate, resolve, LogicError, LogicValue};
use crate::workflows::packs::{RuleDetail, RulePack};

/// One pass over a pack's logic. Collects trace, warnings and actions as rules fire.
pub(super) struct RuleRun<'a> {
    pack: &'a RulePack,
    intake: &'a Intake,
    context: LogicValue,
    trace: Vec<TraceEntry>,
    warnings: Vec<String>,
    actions: Vec<String>,
}

impl<'a> RuleRun<'a> {
    /// Normalises the intake and computes derived values in declaration order.
    pub(super) fn start(pack: &'a RulePack, intake: &'a Intake) -> Result<Self, PathwayError> {
        let answers = normalize_answers(pack, &intake.answers)
            .iter()
            .map(|(id, value)| (id.clone(), LogicValue::from(value)))
            .collect();

        let mut root = BTreeMap::new();
        root.insert("patient".to_string(), intake.patient.context_value());
        root.insert("answers".to_string(), LogicValue::Object(answers));
        root.insert("derived".to_string(), LogicValue::Object(BTreeMap::new()));
        root.insert("pack".to_string(), pack.context_value().clone());
        let mut context = LogicValue::Object(root);

        for derived in &pack.logic.derived {
            let value =
                evaluate(&derived.expression, &context).map_err(|source| logic_error(pack, source))?;
            if let LogicValue::Object(root) = &mut context {
                if let Some(LogicValue::Object(values)) = root.get_mut("derived") {
                    values.insert(derived.id.clone(), value);
                }
            }
        }

        Ok(Self {
            pack,
            intake,
            context,
            trace: Vec::new(),
            warnings: Vec::new(),
            actions: Vec::new(),
        })
    }

    /// Runs gates in order; the first failing gate that declares a result stops the run.
    pub(super) fn checks(&mut self) -> Result<Option<LogicValue>, PathwayError> {
        let pack = self.pack;
        for check in &pack.logic.checks {
            let passed = self.holds(&check.expression)?;
            let (detail, fallback) = if passed {
                (check.pass.as_ref(), TraceStatus::Pass)
            } else {
                (check.fail.as_ref(), TraceStatus::Fail)
            };
            let Some(detail) = detail else {
                continue;
            };
            self.record_trace(Some(detail), fallback)?;
            self.record_warnings(detail.warnings.as_ref())?;
            if !passed {
                if let Some(result) = detail.result.as_ref().filter(|value| json_truthy(value)) {
                    return self.resolve(result).map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Every matching advice rule contributes.
    pub(super) fn advice(&mut self) -> Result<(), PathwayError> {
        let pack = self.pack;
        for advice in &pack.logic.advice {
            if !self.holds(&advice.expression)? {
                continue;
            }
            self.record_trace(advice.trace.as_ref(), TraceStatus::Info)?;
            self.record_warnings(advice.warnings.as_ref())?;
            self.record_actions(advice.actions.as_ref())?;
        }
        Ok(())
    }

    /// First matching outcome wins; rules skipped before it log their `fail` trace.
    pub(super) fn outcomes(&mut self) -> Result<Option<LogicValue>, PathwayError> {
        let pack = self.pack;
        for outcome in &pack.logic.outcomes {
            let trace = outcome.trace.as_ref();
            if self.holds(&outcome.expression)? {
                self.record_trace(trace.and_then(|t| t.pass.as_ref()), TraceStatus::Pass)?;
                self.record_warnings(outcome.warnings.as_ref())?;
                self.record_actions(outcome.actions.as_ref())?;
                return self.resolve(&outcome.result).map(Some);
            }
            self.record_trace(trace.and_then(|t| t.fail.as_ref()), TraceStatus::Info)?;
        }
        Ok(None)
    }

    pub(super) fn fallback(&mut self) -> Result<LogicValue, PathwayError> {
        let Some(default) = &self.pack.logic.default else {
            let mut result = BTreeMap::new();
            result.insert("outcome".to_string(), LogicValue::from("incomplete"));
            result.insert("urgency".to_string(), LogicValue::from("routine"));
            result.insert(
                "headline".to_string(),
                LogicValue::from("No matching recommendation"),
            );
            result.insert(
                "summary".to_string(),
                LogicValue::from("Unable to determine a recommendation for the provided answers."),
            );
            return Ok(LogicValue::Object(result));
        };
        self.record_trace(default.trace.as_ref(), TraceStatus::Info)?;
        self.resolve(&default.result)
    }

    /// Shapes the raw result and merges what the run collected.
    pub(super) fn finish(self, raw: LogicValue) -> Result<EvaluationResult, PathwayError> {
        let pack = self.pack;
        let outcome = match raw.get("outcome") {
            value if value.is_truthy() => {
                let text = value.to_display();
                Outcome::parse(&text).ok_or_else(|| PathwayError::UnknownOutcome {
                    pack_id: pack.id.clone(),
                    value: text,
                })?
            }
            _ => Outcome::Incomplete,
        };

        let mut warnings = self.warnings;
        warnings.extend(string_list(&raw.get("warnings"), false));
        let mut actions = self.actions;
        actions.extend(string_list(&raw.get("actions"), false));

        let mut safety_net = string_list(&raw.get("safetyNet"), false);
        if safety_net.is_empty() {
            safety_net = pack.safety_netting.clone();
        }

        let mut result = EvaluationResult {
            outcome,
            urgency: text(&raw.get("urgency")).unwrap_or_else(|| "routine".to_string()),
            headline: text(&raw.get("headline"))
                .unwrap_or_else(|| "No recommendation available".to_string()),
            summary: text(&raw.get("summary")).unwrap_or_default(),
            missing: Vec::new(),
            trace: self.trace,
            warnings: unique_strings(warnings),
            actions: unique_strings(actions),
            safety_net,
            supply: supply(&raw.get("supply")),
            referral: referral(&raw.get("referral")),
            documentation: None,
            governance: Some(Governance {
                version: pack.version.clone(),
                effective_from: pack
                    .effective_from
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                last_reviewed: pack
                    .last_reviewed
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
        };
        result.documentation = Some(render_note(pack, &self.intake.patient, &result));
        Ok(result)
    }

    fn holds(&self, expression: &Value) -> Result<bool, PathwayError> {
        evaluate(expression, &self.context)
            .map(|value| value.is_truthy())
            .map_err(|source| logic_error(self.pack, source))
    }

    fn resolve(&self, value: &Value) -> Result<LogicValue, PathwayError> {
        resolve(value, &self.context).map_err(|source| logic_error(self.pack, source))
    }

    fn record_trace(
        &mut self,
        detail: Option<&RuleDetail>,
        fallback: TraceStatus,
    ) -> Result<(), PathwayError> {
        let Some(detail) = detail else {
            return Ok(());
        };
        let status = detail
            .status
            .as_deref()
            .filter(|status| !status.is_empty())
            .map(TraceStatus::parse)
            .unwrap_or(fallback);
        let Some(label) = &detail.label else {
            return Ok(());
        };
        let label = match self.resolve(label)? {
            LogicValue::Undefined | LogicValue::Null => return Ok(()),
            LogicValue::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_display()
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_display(),
        };
        if !label.trim().is_empty() {
            self.trace.push(TraceEntry { status, label });
        }
        Ok(())
    }

    fn record_warnings(&mut self, value: Option<&Value>) -> Result<(), PathwayError> {
        let items = self.resolve_items(value)?;
        self.warnings.extend(items);
        Ok(())
    }

    fn record_actions(&mut self, value: Option<&Value>) -> Result<(), PathwayError> {
        let items = self.resolve_items(value)?;
        self.actions.extend(items);
        Ok(())
    }

    fn resolve_items(&self, value: Option<&Value>) -> Result<Vec<String>, PathwayError> {
        match value.filter(|value| json_truthy(value)) {
            Some(value) => Ok(string_list(&self.resolve(value)?, true)),
            None => Ok(Vec::new()),
        }
    }
}

fn logic_error(pack: &RulePack, source: LogicError) -> PathwayError {
    PathwayError::Logic {
        pack_id: pack.id.clone(),
        source,
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Flattens nested lists into non-blank strings.
fn string_list(value: &LogicValue, trim: bool) -> Vec<String> {
    match value {
        LogicValue::Undefined | LogicValue::Null => Vec::new(),
        LogicValue::Array(items) => items
            .iter()
            .flat_map(|item| string_list(item, trim))
            .collect(),
        other => {
            let text = other.to_display();
            if text.trim().is_empty() {
                Vec::new()
            } else if trim {
                vec![text.trim().to_string()]
            } else {
                vec![text]
            }
        }
    }
}

/// Keeps the first occurrence of each trimmed string.
pub(super) fn unique_strings(items: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut unique = Vec::new();
    for item in items {
        let key = item.trim().to_string();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        unique.push(item);
    }
    unique
}

fn text(value: &LogicValue) -> Option<String> {
    value.is_truthy().then(|| value.to_display())
}

fn supply(value: &LogicValue) -> Option<Supply> {
    let LogicValue::Object(_) = value else {
        return None;
    };
    Some(Supply {
        product: text(&value.get("product")).unwrap_or_default(),
        dosage: text(&value.get("dosage")).unwrap_or_default(),
        notes: text(&value.get("notes")),
    })
}

fn referral(value: &LogicValue) -> Option<Referral> {
    let LogicValue::Object(_) = value else {
        return None;
    };
    Some(Referral {
        destination: text(&value.get("destination")).unwrap_or_default(),
        reason: text(&value.get("reason")).unwrap_or_default(),
    })
}
