use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::workflows::pathway::{Intake, PathwayEvaluator, PatientDetails, Pregnancy};

pub(super) use crate::workflows::fixtures::{catalog, parse_pack, SORE_THROAT, UTI};

pub(super) fn evaluator() -> PathwayEvaluator {
    PathwayEvaluator::new(catalog())
}

pub(super) fn patient(age: f64, sex: &str, pregnant: Pregnancy) -> PatientDetails {
    PatientDetails {
        age: Some(age),
        sex: sex.to_string(),
        pregnant,
        postcode: String::new(),
    }
}

pub(super) fn answers(value: Value) -> BTreeMap<String, Value> {
    serde_json::from_value(value).expect("answers are an object")
}

/// Uncomplicated presentation that qualifies for supply.
pub(super) fn uti_intake() -> Intake {
    Intake {
        patient: patient(28.0, "female", Pregnancy::No),
        answers: answers(json!({
            "dysuria": "yes",
            "frequency": "yes",
            "durationDays": 2,
            "fever": "no",
            "loinPain": "no",
            "vaginalDischarge": "no",
            "recurrentUti": "no",
            "diabetes": "no",
            "renalImpairment": "no",
            "indwellingCatheter": "no",
            "immunocompromised": "no",
            "recentUti": "no"
        })),
    }
}

pub(super) fn sore_throat_intake(criteria: &[&str]) -> Intake {
    let mut answers = answers(json!({
        "durationDays": 2,
        "airwayCompromise": "no",
        "systemicallyUnwell": "no",
        "immunocompromise": "no",
        "antibioticAllergy": "no"
    }));
    for criterion in criteria {
        answers.insert((*criterion).to_string(), json!("yes"));
    }
    Intake {
        patient: patient(22.0, "female", Pregnancy::Unknown),
        answers,
    }
}

pub(super) fn labels(result: &crate::workflows::pathway::EvaluationResult) -> Vec<&str> {
    result.trace.iter().map(|entry| entry.label.as_str()).collect()
}
