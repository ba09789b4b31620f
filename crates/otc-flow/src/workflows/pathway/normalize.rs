use std::collections::BTreeMap;

use serde_json::Value;

use super::domain::{Intake, MissingField, PatientDetails, Pregnancy};
use crate::logic::{number_to_json, LogicValue};
use crate::workflows::packs::{Question, QuestionKind, RulePack};

pub fn normalize_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Finite number, or `None` for blanks and anything non-numeric.
pub fn normalize_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        other => {
            let number = LogicValue::from(other).to_number();
            number.is_finite().then_some(number)
        }
    }
}

/// Ordered, de-duplicated, non-empty entries. A bare value counts as one entry.
pub fn normalize_multi_select(value: &Value) -> Vec<String> {
    let entries: Vec<&Value> = match value {
        Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut normalized: Vec<String> = Vec::new();
    for entry in entries {
        let text = match entry {
            Value::Null => String::new(),
            other => LogicValue::from(other).to_display().trim().to_string(),
        };
        if !text.is_empty() && !normalized.contains(&text) {
            normalized.push(text);
        }
    }
    normalized
}

/// Canonical form of an answer for its question's type. Unknown questions pass through.
pub fn normalize_answer(question: Option<&Question>, value: &Value) -> Value {
    let Some(question) = question else {
        return value.clone();
    };
    match question.kind {
        QuestionKind::Boolean => normalize_boolean(value).map_or(Value::Null, Value::Bool),
        QuestionKind::Number => normalize_number(value).map_or(Value::Null, number_to_json),
        QuestionKind::Select => match value {
            Value::Null => Value::Null,
            Value::String(text) if text.is_empty() || text == "unknown" => Value::Null,
            other => Value::String(LogicValue::from(other).to_display()),
        },
        QuestionKind::MultiSelect => Value::Array(
            normalize_multi_select(value)
                .into_iter()
                .map(Value::String)
                .collect(),
        ),
        QuestionKind::Text => value.clone(),
    }
}

pub fn normalize_answers(
    pack: &RulePack,
    answers: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    answers
        .iter()
        .map(|(id, raw)| (id.clone(), normalize_answer(pack.question(id), raw)))
        .collect()
}

/// Required patient fields and questions that are not yet answered, in declaration order.
pub fn collect_missing_fields(pack: &RulePack, intake: &Intake) -> Vec<MissingField> {
    let mut missing = Vec::new();

    for field in &pack.required.patient {
        if field == "age" {
            if intake.patient.age.is_none() {
                missing.push(MissingField {
                    id: "patient.age".to_string(),
                    label: "Patient age".to_string(),
                });
            }
        } else if !patient_field_present(&intake.patient, field) {
            missing.push(MissingField {
                id: format!("patient.{field}"),
                label: format!("Patient {field}"),
            });
        }
    }

    let forced = &pack.required.answers;
    let forced_questions = forced.iter().filter_map(|id| pack.question(id));
    let flagged_questions = pack
        .required_questions()
        .filter(|question| !forced.contains(&question.id));

    let mut seen: Vec<&str> = Vec::new();
    for question in forced_questions.chain(flagged_questions) {
        if seen.contains(&question.id.as_str()) {
            continue;
        }
        seen.push(&question.id);
        if !answer_present(question, intake.answers.get(&question.id)) {
            missing.push(MissingField {
                id: question.id.clone(),
                label: question.label.clone(),
            });
        }
    }

    missing
}

fn patient_field_present(patient: &PatientDetails, field: &str) -> bool {
    match field {
        "pregnant" => patient.pregnant != Pregnancy::Unknown,
        "sex" => !patient.sex.is_empty(),
        "postcode" => !patient.postcode.is_empty(),
        _ => false,
    }
}

fn answer_present(question: &Question, raw: Option<&Value>) -> bool {
    let raw = raw.unwrap_or(&Value::Null);
    match question.kind {
        QuestionKind::Boolean => normalize_boolean(raw).is_some(),
        QuestionKind::Number => normalize_number(raw).is_some(),
        QuestionKind::MultiSelect => !normalize_multi_select(raw).is_empty(),
        QuestionKind::Select | QuestionKind::Text => {
            !matches!(raw, Value::Null) && raw.as_str() != Some("")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::packs::ManifestEntry;
    use serde_json::json;

    fn pack() -> RulePack {
        let text = json!({
            "meta": { "id": "uti_women_16_64", "name": "UTI", "version": "1.0.0" },
            "sections": [{ "id": "core", "questions": [
                { "id": "dysuria", "type": "boolean", "label": "Dysuria", "required": true },
                { "id": "durationDays", "type": "number", "label": "Duration (days)", "required": true },
                { "id": "symptoms", "type": "multi_select", "label": "Symptoms" },
                { "id": "allergy", "type": "select", "label": "Allergy status" }
            ] }],
            "intake": { "required": { "patient": ["age", "sex", "pregnant"], "answers": ["symptoms", "dysuria"] } }
        })
        .to_string();
        let entry = ManifestEntry {
            id: "uti_women_16_64".to_string(),
            name: String::new(),
            version: String::new(),
            path: "uti.json".to_string(),
            checksum: None,
        };
        RulePack::parse(&text, &entry).expect("pack parses")
    }

    #[test]
    fn booleans_accept_words_and_flags() {
        assert_eq!(normalize_boolean(&json!("yes")), Some(true));
        assert_eq!(normalize_boolean(&json!(false)), Some(false));
        assert_eq!(normalize_boolean(&json!("Yes")), None);
        assert_eq!(normalize_boolean(&json!(1)), None);
    }

    #[test]
    fn numbers_must_be_finite() {
        assert_eq!(normalize_number(&json!("2")), Some(2.0));
        assert_eq!(normalize_number(&json!("")), None);
        assert_eq!(normalize_number(&json!("two")), None);
        assert_eq!(normalize_number(&Value::Null), None);
    }

    #[test]
    fn multi_select_trims_and_deduplicates() {
        assert_eq!(
            normalize_multi_select(&json!([" fever ", "fever", "", null, "cough"])),
            vec!["fever", "cough"]
        );
        assert_eq!(normalize_multi_select(&json!("fever")), vec!["fever"]);
        assert!(normalize_multi_select(&json!("")).is_empty());
    }

    #[test]
    fn select_unknown_becomes_null() {
        let pack = pack();
        assert_eq!(
            normalize_answer(pack.question("allergy"), &json!("unknown")),
            Value::Null
        );
        assert_eq!(
            normalize_answer(pack.question("durationDays"), &json!("3")),
            json!(3)
        );
        assert_eq!(normalize_answer(None, &json!("free")), json!("free"));
    }

    #[test]
    fn missing_fields_follow_declaration_order() {
        let pack = pack();
        let intake = Intake {
            patient: PatientDetails {
                age: None,
                sex: "female".to_string(),
                pregnant: Pregnancy::Unknown,
                postcode: String::new(),
            },
            answers: BTreeMap::from([("dysuria".to_string(), json!("yes"))]),
        };
        let ids: Vec<String> = collect_missing_fields(&pack, &intake)
            .into_iter()
            .map(|field| field.id)
            .collect();
        assert_eq!(
            ids,
            vec!["patient.age", "patient.pregnant", "symptoms", "durationDays"]
        );
    }
}
