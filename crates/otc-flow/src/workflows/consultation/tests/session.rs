use serde_json::json;

use super::common::*;
use crate::workflows::consultation::{
    ConsultationError, ConsultationSession, SuggestionStatus, CONFIDENT_THRESHOLD,
};
use crate::workflows::pathway::{EvaluationResult, Outcome, Pregnancy};
use crate::workflows::transcript::{TranscriptExtraction, TranscriptExtractor};

fn extract(text: &str) -> TranscriptExtraction {
    TranscriptExtractor::new(&catalog())
        .expect("profiles compile")
        .extract(text)
}

fn evaluation(session: &ConsultationSession) -> &EvaluationResult {
    session.evaluation.as_ref().expect("session is always evaluated")
}

#[test]
fn new_session_prompts_for_a_pathway() {
    let session = session();
    assert_eq!(session.pack_id, "");
    assert!(session.suggestions.is_empty());
    let result = evaluation(&session);
    assert_eq!(result.outcome, Outcome::Incomplete);
    assert_eq!(result.headline, "Select a pathway to begin");
}

#[test]
fn selecting_a_complaint_picks_its_first_pack() {
    let catalog = catalog();
    let mut session = session();

    session
        .select_complaint(&catalog, "urinary_symptoms")
        .expect("evaluates");
    assert_eq!(session.complaint_id, "urinary_symptoms");
    assert_eq!(session.pack_id, UTI);
    assert_eq!(evaluation(&session).headline, "More information required");

    session
        .select_complaint(&catalog, "earache")
        .expect("evaluates");
    assert_eq!(session.complaint_id, "earache");
    assert_eq!(session.pack_id, "");
    assert_eq!(evaluation(&session).headline, "Select a pathway to begin");
}

#[test]
fn switching_pack_clears_answers_but_keeps_patient() {
    let catalog = catalog();
    let mut session = session();
    session.select_pack(&catalog, UTI).expect("evaluates");
    session
        .update_patient(&catalog, "age", &json!("28"))
        .expect("evaluates");
    session
        .set_answer(&catalog, "dysuria", &json!("yes"))
        .expect("evaluates");
    assert_eq!(session.intake.answers.get("dysuria"), Some(&json!(true)));

    session.select_pack(&catalog, SORE_THROAT).expect("evaluates");
    assert!(session.intake.answers.is_empty());
    assert_eq!(session.patient().age, Some(28.0));

    session.clear_answer(&catalog, "dysuria").expect("evaluates");
    assert!(session.intake.answers.is_empty());
}

#[test]
fn unknown_patient_field_is_rejected() {
    let catalog = catalog();
    let mut session = session();
    let error = session
        .update_patient(&catalog, "nhsNumber", &json!("123"))
        .expect_err("unknown field");
    assert!(matches!(error, ConsultationError::UnknownPatientField(field) if field == "nhsNumber"));
}

#[test]
fn ingest_adopts_the_guessed_pack_and_lists_suggestions() {
    let catalog = catalog();
    let mut session = session();
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");

    assert_eq!(session.pack_id, UTI);
    assert_eq!(session.complaint_id, "urinary_symptoms");
    let ids: Vec<&str> = session
        .suggestions
        .iter()
        .map(|suggestion| suggestion.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "patient.age",
            "patient.sex",
            "patient.pregnant",
            "dysuria",
            "frequency",
            "fever",
            "loinPain",
            "vaginalDischarge",
            "durationDays",
        ]
    );
    assert!(session
        .suggestions
        .iter()
        .all(|suggestion| suggestion.status == SuggestionStatus::Pending));
    assert!(session.intake.answers.is_empty());

    let statuses = session.suggestion_statuses();
    assert_eq!(statuses["patient.age"], "confirmed");
    assert_eq!(statuses["frequency"], "likely accurate");
    assert_eq!(statuses["durationDays"], "likely accurate");
}

#[test]
fn ingest_keeps_a_pack_the_clinician_already_chose() {
    let catalog = catalog();
    let mut session = session();
    session.select_pack(&catalog, SORE_THROAT).expect("evaluates");
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");
    assert_eq!(session.pack_id, SORE_THROAT);
    assert!(session.suggestions.get("dysuria").is_some());
}

#[test]
fn bulk_apply_takes_only_confident_suggestions() {
    let catalog = catalog();
    let mut session = session();
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");

    let applied = session
        .apply_confident(&catalog, CONFIDENT_THRESHOLD)
        .expect("evaluates");
    assert_eq!(
        applied,
        vec![
            "patient.age",
            "patient.sex",
            "patient.pregnant",
            "dysuria",
            "fever",
            "loinPain",
            "vaginalDischarge",
        ]
    );
    assert_eq!(session.patient().age, Some(28.0));
    assert_eq!(session.patient().sex, "female");
    assert_eq!(session.patient().pregnant, Pregnancy::No);
    assert_eq!(session.intake.answers.get("fever"), Some(&json!(false)));
    assert_eq!(status_of(&session, "frequency"), Some("pending"));

    let result = evaluation(&session);
    assert_eq!(result.outcome, Outcome::Incomplete);
    let missing: Vec<&str> = result.missing.iter().map(|field| field.id.as_str()).collect();
    assert!(missing.contains(&"durationDays"));
    assert!(missing.contains(&"frequency"));

    let again = session
        .apply_confident(&catalog, CONFIDENT_THRESHOLD)
        .expect("evaluates");
    assert!(again.is_empty());
}

#[test]
fn applying_the_remaining_suggestions_reaches_supply() {
    let catalog = catalog();
    let mut session = session();
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");
    session
        .apply_confident(&catalog, CONFIDENT_THRESHOLD)
        .expect("evaluates");

    assert!(session.apply_suggestion(&catalog, "frequency").expect("applies"));
    assert!(session.apply_suggestion(&catalog, "durationDays").expect("applies"));
    assert_eq!(session.intake.answers.get("durationDays"), Some(&json!(2)));

    let result = evaluation(&session);
    assert!(result.missing.is_empty());
    assert_eq!(result.outcome, Outcome::Supply);

    assert!(!session.apply_suggestion(&catalog, "frequency").expect("no-op"));
    assert_eq!(session.suggestion_statuses()["frequency"], "applied");
}

#[test]
fn dismissed_suggestions_are_skipped_and_survive_reingest() {
    let catalog = catalog();
    let extraction = extract(uti_transcript());
    let mut session = session();
    session.ingest_extraction(&catalog, &extraction).expect("evaluates");

    assert!(session.dismiss_suggestion(&catalog, "fever").expect("dismisses"));
    assert!(!session.dismiss_suggestion(&catalog, "fever").expect("no-op"));
    let applied = session
        .apply_confident(&catalog, CONFIDENT_THRESHOLD)
        .expect("evaluates");
    assert!(!applied.iter().any(|id| id == "fever"));
    assert!(!session.intake.answers.contains_key("fever"));

    session.ingest_extraction(&catalog, &extraction).expect("evaluates");
    assert_eq!(status_of(&session, "fever"), Some("dismissed"));
    assert_eq!(status_of(&session, "dysuria"), Some("applied"));
    assert!(!session
        .apply_suggestion(&catalog, "fever")
        .expect("settled suggestion is a no-op"));
}

#[test]
fn changed_values_come_back_as_pending() {
    let catalog = catalog();
    let mut session = session();
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");
    session
        .apply_confident(&catalog, CONFIDENT_THRESHOLD)
        .expect("evaluates");

    session
        .ingest_extraction(
            &catalog,
            &extract("35 year old female reports burning when passing urine."),
        )
        .expect("evaluates");
    assert_eq!(status_of(&session, "patient.age"), Some("pending"));
    assert_eq!(status_of(&session, "patient.sex"), Some("applied"));
    assert_eq!(status_of(&session, "fever"), None);
    assert_eq!(session.patient().age, Some(28.0));
}

#[test]
fn unknown_suggestion_is_an_error() {
    let catalog = catalog();
    let mut session = session();
    let error = session
        .apply_suggestion(&catalog, "patient.postcode")
        .expect_err("no such suggestion");
    assert!(matches!(error, ConsultationError::UnknownSuggestion(id) if id == "patient.postcode"));
    assert!(matches!(
        session.dismiss_suggestion(&catalog, "dysuria"),
        Err(ConsultationError::UnknownSuggestion(_))
    ));
}

#[test]
fn reset_returns_to_an_empty_intake() {
    let catalog = catalog();
    let mut session = session();
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");
    session
        .apply_confident(&catalog, CONFIDENT_THRESHOLD)
        .expect("evaluates");

    session.reset(&catalog).expect("evaluates");
    assert_eq!(session.pack_id, "");
    assert_eq!(session.complaint_id, "");
    assert!(session.suggestions.is_empty());
    assert_eq!(session.patient().age, None);
    assert_eq!(evaluation(&session).headline, "Select a pathway to begin");
}

#[test]
fn view_serialises_session_with_status_labels() {
    let catalog = catalog();
    let mut session = session();
    session
        .ingest_extraction(&catalog, &extract(uti_transcript()))
        .expect("evaluates");
    session.apply_suggestion(&catalog, "dysuria").expect("applies");

    let value = serde_json::to_value(session.view()).expect("serialises");
    assert_eq!(value["id"], json!("consult-test"));
    assert_eq!(value["packId"], json!(UTI));
    assert_eq!(value["suggestionStatuses"]["dysuria"], json!("applied"));
    assert_eq!(value["suggestions"][0]["target"], json!("patient"));
    assert_eq!(value["evaluation"]["outcome"], json!("incomplete"));
}
