use serde_json::{json, Value};

use super::common::*;
use crate::workflows::fixtures::{parse_pack, UTI_PACK};
use crate::workflows::packs::PackCatalog;
use crate::workflows::transcript::{TranscriptError, TranscriptExtractor, SAMPLE_TRANSCRIPTS};

fn earache_profile() -> Value {
    json!({
        "keywords": [{ "pattern": "\\bearache\\b", "weight": 3, "strength": "explicit" }],
        "cues": {
            "earPain": [{ "value": "yes", "pattern": "\\bear\\s+pain\\b", "strength": "strong" }],
            "discharge": [
                { "value": "yes", "pattern": "\\bdischarge\\b", "strength": "moderate" },
                { "value": "no", "pattern": "\\bno\\s+discharge\\b", "strength": "strong", "bypassNegation": true }
            ]
        },
        "durationQuestion": "days",
        "applicability": { "sex": "female", "label": "Adult earache pack" }
    })
}

#[test]
fn declared_profile_drives_extraction() {
    let extractor = TranscriptExtractor::new(&earache_catalog(earache_profile()))
        .expect("profile compiles");
    let extraction = extractor.extract(
        "50 year old man with EARACHE and ear pain for 4 days, no discharge from the ear.",
    );

    assert_eq!(extraction.rule_pack_id, "earache_adult");
    assert_eq!(extraction.complaint_id, "earache");
    assert_eq!(extraction.rule_pack_confidence, 0.68);
    assert_eq!(answer(&extraction, "earPain"), Some((json!("yes"), 0.85)));
    assert_eq!(answer(&extraction, "discharge"), Some((json!("no"), 0.85)));
    assert_eq!(answer(&extraction, "days"), Some((json!(4), 0.85)));
    assert_eq!(
        extraction.warnings,
        vec!["Adult earache pack targets women; detected sex is male."]
    );
}

#[test]
fn declared_cue_without_strength_scores_as_weak() {
    let profile = json!({
        "keywords": [{ "pattern": "earache" }],
        "cues": { "earPain": [{ "value": "yes", "pattern": "ear pain" }] }
    });
    let extractor = TranscriptExtractor::new(&earache_catalog(profile)).expect("compiles");
    let extraction = extractor.extract("earache with ear pain");
    assert_eq!(extraction.rule_pack_confidence, 0.34);
    assert_eq!(answer(&extraction, "earPain"), Some((json!("yes"), 0.6)));
    assert!(answer(&extraction, "days").is_none());
    assert_eq!(
        missing_ids(&extraction),
        vec!["patient.age", "patient.sex", "patient.pregnant", "days"]
    );
}

#[test]
fn declared_profile_replaces_builtin_profile() {
    let mut document: Value = serde_json::from_str(UTI_PACK).expect("pack json");
    document["transcript"] = json!({
        "keywords": [{ "pattern": "\\bcystitis\\b", "weight": 3, "strength": "explicit" }]
    });
    let pack = parse_pack(UTI, &document.to_string());
    let extractor =
        TranscriptExtractor::new(&PackCatalog::from_packs(vec![pack])).expect("compiles");

    assert!(extractor.extract("burning urine and dysuria").pack_id().is_none());

    let extraction = extractor.extract("probable cystitis with dysuria");
    assert_eq!(extraction.pack_id(), Some(UTI));
    assert!(extraction.answers.is_empty());
    assert!(extraction.warnings.is_empty());
}

#[test]
fn packs_without_a_profile_are_not_candidates() {
    let extractor = TranscriptExtractor::new(&earache_catalog(Value::Null)).expect("compiles");
    assert_eq!(extractor.pack_ids().count(), 0);
    assert!(extractor.extract("earache").pack_id().is_none());

    let shipped = super::common::extractor();
    let shipped: Vec<&str> = shipped.pack_ids().collect();
    assert_eq!(shipped, vec![UTI, SORE_THROAT]);
}

#[test]
fn invalid_declared_pattern_fails_construction() {
    let profile = json!({ "keywords": [{ "pattern": "ear(ache" }] });
    let error = TranscriptExtractor::new(&earache_catalog(profile)).expect_err("invalid pattern");
    let TranscriptError::InvalidCue { pack_id, pattern, .. } = error;
    assert_eq!(pack_id, "earache_adult");
    assert_eq!(pattern, "ear(ache");
}

#[test]
fn answers_follow_cue_declaration_order() {
    let text = r#"{
        "meta": { "id": "earache_adult", "name": "Adult earache", "version": "0.1.0" },
        "complaint": { "id": "earache", "label": "Earache" },
        "transcript": {
            "keywords": [{ "pattern": "\\bearache\\b", "weight": 3 }],
            "cues": {
                "earPain": [{ "value": "yes", "pattern": "\\bear\\s+pain\\b" }],
                "discharge": [{ "value": "yes", "pattern": "\\bdischarge\\b" }]
            },
            "durationQuestion": "days"
        }
    }"#;
    let pack = parse_pack("earache_adult", text);
    let declared: Vec<&str> = pack
        .transcript
        .as_ref()
        .map(|hints| hints.cues.keys().collect())
        .unwrap_or_default();
    assert_eq!(declared, vec!["earPain", "discharge"]);

    let extractor = TranscriptExtractor::new(&PackCatalog::from_packs(vec![pack]))
        .expect("profile compiles");
    let extraction = extractor.extract("Earache with discharge and ear pain for 3 days.");
    let order: Vec<&str> = extraction.answers.keys().collect();
    assert_eq!(order, vec!["earPain", "discharge", "days"]);

    let body = serde_json::to_string(&extraction.answers).expect("serialises");
    assert!(body.find("earPain") < body.find("discharge"));
}

#[test]
fn builtin_answers_keep_table_order() {
    let extraction = extract(SAMPLE_TRANSCRIPTS[0].text);
    let order: Vec<&str> = extraction.answers.keys().collect();
    assert_eq!(
        order,
        vec!["dysuria", "frequency", "fever", "loinPain", "vaginalDischarge", "durationDays"]
    );
}
