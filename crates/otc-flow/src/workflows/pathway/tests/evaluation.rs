use serde_json::json;

use super::common::*;
use crate::logic::LogicError;
use crate::workflows::pathway::{
    evaluate_pack, Intake, Outcome, PathwayError, Pregnancy, TraceEntry, TraceStatus,
};

#[test]
fn uncomplicated_uti_qualifies_for_nitrofurantoin_supply() {
    let result = evaluator()
        .evaluate(Some(UTI), &uti_intake())
        .expect("evaluates");

    assert_eq!(result.outcome, Outcome::Supply);
    assert_eq!(result.urgency, "routine");
    let supply = result.supply.as_ref().expect("supply block");
    assert_eq!(supply.product, "Nitrofurantoin 100 mg modified release capsules");
    assert_eq!(supply.dosage, "1 capsule twice daily for 3 days with food");
    assert_eq!(
        labels(&result),
        vec![
            "Age between 16 and 64 years.",
            "Patient identifies as female.",
            "Pregnancy excluded.",
            "No red flag symptoms reported.",
            "No exclusion risk factors recorded.",
            "Duration recorded as 2 day(s).",
            "2 core urinary symptoms recorded.",
            "Inclusion criteria met with no exclusions detected.",
        ]
    );
    assert!(result
        .trace
        .iter()
        .all(|entry| entry.status == TraceStatus::Pass));
    assert_eq!(result.actions.len(), 3);
    assert!(result.warnings.is_empty());
    assert_eq!(result.safety_net.len(), 3);
    let governance = result.governance.as_ref().expect("governance");
    assert_eq!(governance.version, "1.1.0");
    assert_eq!(governance.effective_from, "2025-02-01");
    assert!(result.missing.is_empty());
}

#[test]
fn pregnancy_refers_regardless_of_other_answers() {
    let mut intake = uti_intake();
    intake.patient.pregnant = Pregnancy::Yes;

    let result = evaluator().evaluate(Some(UTI), &intake).expect("evaluates");

    assert_eq!(result.outcome, Outcome::Refer);
    assert_eq!(result.headline, "Refer to GP - pregnancy is excluded");
    assert_eq!(
        result.trace.last(),
        Some(&TraceEntry {
            status: TraceStatus::Fail,
            label: "Pregnancy is an exclusion.".to_string(),
        })
    );
    assert_eq!(
        result.actions,
        vec!["Discuss referral urgency based on symptoms and arrange GP review."]
    );
    assert!(result.supply.is_none());
}

#[test]
fn missing_required_fields_stop_before_any_logic() {
    let mut intake = uti_intake();
    intake.patient.age = None;
    intake.answers.remove("durationDays");
    intake.answers.insert("dysuria".to_string(), json!(""));

    let result = evaluator().evaluate(Some(UTI), &intake).expect("evaluates");

    assert_eq!(result.outcome, Outcome::Incomplete);
    assert_eq!(result.headline, "More information required");
    let ids: Vec<&str> = result.missing.iter().map(|field| field.id.as_str()).collect();
    assert_eq!(ids, vec!["patient.age", "durationDays", "dysuria"]);
    assert_eq!(result.missing[0].label, "Patient age");
    assert!(result.trace.is_empty());
    assert!(result.actions.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.safety_net.len(), 3);
    assert!(result.documentation.is_none());
}

#[test]
fn first_failing_gate_wins_over_later_gates() {
    let mut intake = uti_intake();
    intake.answers.insert("fever".to_string(), json!("yes"));
    intake.answers.insert("loinPain".to_string(), json!(true));
    intake.answers.insert("recurrentUti".to_string(), json!("yes"));

    let result = evaluator().evaluate(Some(UTI), &intake).expect("evaluates");

    assert_eq!(result.outcome, Outcome::Refer);
    assert_eq!(result.urgency, "urgent");
    assert_eq!(
        result.trace.last().map(|entry| entry.label.as_str()),
        Some("Fever or rigors present, Loin or flank pain present")
    );
    assert_eq!(result.summary, "2 red flag symptom(s) reported; urgent referral required.");
    let referral = result.referral.as_ref().expect("referral");
    assert_eq!(referral.destination, "Urgent care / 111 / GP");
    assert!(result
        .warnings
        .iter()
        .all(|warning| !warning.contains("Recurrent UTI")));
    assert!(!labels(&result).contains(&"2 core urinary symptoms recorded."));
}

#[test]
fn risk_factor_gate_lists_each_exclusion() {
    let mut intake = uti_intake();
    intake.answers.insert("diabetes".to_string(), json!("yes"));
    intake.answers.insert("renalImpairment".to_string(), json!("yes"));

    let result = evaluator().evaluate(Some(UTI), &intake).expect("evaluates");

    assert_eq!(result.outcome, Outcome::Refer);
    assert_eq!(result.summary, "2 risk factor(s) recorded.");
    assert_eq!(
        result.warnings,
        vec![
            "Poorly controlled diabetes is an exclusion.",
            "Renal impairment is an exclusion."
        ]
    );
    assert_eq!(
        result.referral.as_ref().map(|r| r.destination.as_str()),
        Some("GP")
    );
}

#[test]
fn single_symptom_falls_back_to_pack_default() {
    let mut intake = uti_intake();
    intake.answers.insert("frequency".to_string(), json!("no"));

    let result = evaluator().evaluate(Some(UTI), &intake).expect("evaluates");

    assert_eq!(result.outcome, Outcome::Advise);
    assert_eq!(
        result.headline,
        "Provide self-care advice - diagnostic certainty low"
    );
    let tail: Vec<&TraceEntry> = result.trace.iter().rev().take(3).collect();
    assert_eq!(tail[0].label, "Self-care advice pathway selected.");
    assert_eq!(tail[0].status, TraceStatus::Info);
    assert_eq!(tail[1].status, TraceStatus::Warn);
    assert_eq!(tail[2].label, "1 core urinary symptoms recorded.");
    assert_eq!(
        result.warnings,
        vec!["At least two urinary symptoms are normally required for supply."]
    );
    assert_eq!(result.actions.len(), 3);
}

#[test]
fn unknown_pregnancy_warns_but_does_not_block() {
    let mut intake = uti_intake();
    intake.patient.pregnant = Pregnancy::Unknown;
    intake.answers.remove("renalImpairment");

    let result = evaluator().evaluate(Some(UTI), &intake).expect("evaluates");

    assert_eq!(result.outcome, Outcome::Supply);
    assert!(labels(&result).contains(&"Pregnancy status unknown."));
    assert_eq!(
        result.warnings,
        vec![
            "Confirm pregnancy status before supply.",
            "Renal function not confirmed - adjust choice accordingly."
        ]
    );
}

#[test]
fn high_feverpain_score_supplies_penicillin() {
    let intake = sore_throat_intake(&["fever", "purulence", "rapidOnset", "inflamedTonsils"]);

    let result = evaluator()
        .evaluate(Some(SORE_THROAT), &intake)
        .expect("evaluates");

    assert_eq!(result.outcome, Outcome::Supply);
    assert_eq!(result.headline, "Supply Phenoxymethylpenicillin for 5 days");
    assert!(labels(&result).contains(&"FeverPAIN score calculated: 4."));
    assert_eq!(
        result.supply.as_ref().map(|supply| supply.product.as_str()),
        Some("Phenoxymethylpenicillin 250 mg/5 mL oral solution or tablets")
    );
    assert!(result.actions[0].starts_with("Supply Phenoxymethylpenicillin 500 mg"));
}

#[test]
fn penicillin_allergy_switches_to_clarithromycin() {
    let mut intake =
        sore_throat_intake(&["fever", "purulence", "rapidOnset", "inflamedTonsils", "noCough"]);
    intake
        .answers
        .insert("antibioticAllergy".to_string(), json!("yes"));

    let result = evaluator()
        .evaluate(Some(SORE_THROAT), &intake)
        .expect("evaluates");

    assert_eq!(result.headline, "Supply Clarithromycin for 5 days");
    assert_eq!(
        result.warnings,
        vec!["Use clarithromycin in place of penicillin."]
    );
    assert!(labels(&result).contains(&"FeverPAIN score calculated: 5."));
}

#[test]
fn moderate_feverpain_score_suggests_delayed_antibiotic() {
    let mut intake = sore_throat_intake(&["fever", "noCough"]);
    intake
        .answers
        .insert("antibioticAllergy".to_string(), json!("unknown"));

    let result = evaluator()
        .evaluate(Some(SORE_THROAT), &intake)
        .expect("evaluates");

    assert_eq!(result.outcome, Outcome::Advise);
    assert_eq!(
        result.headline,
        "Consider delayed antibiotic - FeverPAIN score 2 to 3"
    );
    assert_eq!(
        result.warnings,
        vec!["Clarify penicillin allergy status before supply."]
    );
}

#[test]
fn young_child_is_referred() {
    let mut intake = sore_throat_intake(&["fever"]);
    intake.patient.age = Some(3.0);

    let result = evaluator()
        .evaluate(Some(SORE_THROAT), &intake)
        .expect("evaluates");

    assert_eq!(result.outcome, Outcome::Refer);
    assert_eq!(result.headline, "Refer - patient under 5 years old");
    assert_eq!(result.trace.len(), 1);
}

#[test]
fn no_pack_or_unknown_pack_prompts_for_selection() {
    let evaluator = evaluator();
    let intake = Intake::default();

    let none = evaluator.evaluate(None, &intake).expect("evaluates");
    assert_eq!(none.outcome, Outcome::Incomplete);
    assert_eq!(none.headline, "Select a pathway to begin");

    let unknown = evaluator
        .evaluate(Some("ear_infection"), &intake)
        .expect("evaluates");
    assert_eq!(unknown.headline, "Pathway not available");
    assert_eq!(
        unknown.summary,
        "The selected pathway could not be loaded."
    );
    assert!(unknown.safety_net.is_empty());
}

#[test]
fn derived_values_see_earlier_derived_values() {
    let pack = parse_pack(
        "chained",
        &json!({
            "logic": {
                "derived": [
                    { "id": "base", "expression": { "+": [{ "var": "patient.age" }, 1] } },
                    { "id": "doubled", "expression": { "*": [{ "var": "derived.base" }, 2] } }
                ],
                "default": { "result": { "outcome": "advise", "headline": "Score {{derived.doubled}}" } }
            }
        })
        .to_string(),
    );
    let intake = Intake {
        patient: patient(20.0, "male", Pregnancy::Unknown),
        ..Intake::default()
    };

    let result = evaluate_pack(&pack, &intake).expect("evaluates");
    assert_eq!(result.headline, "Score 42");
    assert_eq!(result.summary, "");
}

#[test]
fn derived_values_cannot_see_later_derived_values() {
    let pack = parse_pack(
        "forward",
        &json!({
            "logic": {
                "derived": [
                    { "id": "early", "expression": { "if": [{ "var": "derived.late" }, "seen", "unseen"] } },
                    { "id": "late", "expression": true }
                ],
                "default": { "result": { "outcome": "advise", "headline": "{{derived.early}} {{derived.late}}" } }
            }
        })
        .to_string(),
    );

    let result = evaluate_pack(&pack, &Intake::default()).expect("evaluates");
    assert_eq!(result.headline, "unseen true");
}

#[test]
fn pack_without_default_returns_generic_result() {
    let pack = parse_pack("empty", "{}");
    let result = evaluate_pack(&pack, &Intake::default()).expect("evaluates");
    assert_eq!(result.outcome, Outcome::Incomplete);
    assert_eq!(result.headline, "No matching recommendation");
    assert_eq!(
        result.summary,
        "Unable to determine a recommendation for the provided answers."
    );
    assert!(result.documentation.is_some());
}

#[test]
fn rule_authoring_errors_abort_the_evaluation() {
    let entry = crate::workflows::packs::ManifestEntry {
        id: "broken".to_string(),
        name: String::new(),
        version: String::new(),
        path: "broken.json".to_string(),
        checksum: None,
    };
    let broken = crate::workflows::packs::RulePack::parse(
        &json!({ "logic": { "checks": [{ "expression": { "max": [1, 2] } }] } }).to_string(),
        &entry,
    )
    .expect("parses");

    let error = evaluate_pack(&broken, &Intake::default()).expect_err("reserved operator");
    assert!(matches!(
        error,
        PathwayError::Logic { ref pack_id, source: LogicError::UnsupportedOperator(_) }
            if pack_id == "broken"
    ));

    let unknown = parse_pack(
        "odd",
        &json!({ "logic": { "default": { "result": { "outcome": "discharge" } } } }).to_string(),
    );
    let error = evaluate_pack(&unknown, &Intake::default()).expect_err("unknown outcome");
    assert!(matches!(error, PathwayError::UnknownOutcome { ref value, .. } if value == "discharge"));
}
