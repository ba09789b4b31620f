use serde_json::{json, Value};

use crate::workflows::fixtures::{catalog, parse_pack};
use crate::workflows::packs::PackCatalog;
use crate::workflows::transcript::{TranscriptExtraction, TranscriptExtractor};

pub(super) use crate::workflows::fixtures::{SORE_THROAT, UTI};

pub(super) fn extractor() -> TranscriptExtractor {
    TranscriptExtractor::new(&catalog()).expect("shipped profiles compile")
}

pub(super) fn extract(text: &str) -> TranscriptExtraction {
    extractor().extract(text)
}

/// `(value, confidence)` for an extracted answer.
pub(super) fn answer(extraction: &TranscriptExtraction, id: &str) -> Option<(Value, f64)> {
    extraction
        .answers
        .get(id)
        .map(|guess| (guess.value.clone(), guess.confidence))
}

pub(super) fn missing_ids(extraction: &TranscriptExtraction) -> Vec<&str> {
    extraction
        .missing
        .iter()
        .map(|field| field.id.as_str())
        .collect()
}

/// Earache pack that declares its own transcript profile.
pub(super) fn earache_catalog(transcript: Value) -> PackCatalog {
    let text = json!({
        "meta": { "id": "earache_adult", "name": "Adult earache", "version": "0.1.0" },
        "complaint": { "id": "earache", "label": "Earache" },
        "sections": [{ "id": "core", "questions": [
            { "id": "earPain", "type": "boolean", "label": "Ear pain" },
            { "id": "discharge", "type": "boolean", "label": "Ear discharge" },
            { "id": "days", "type": "number", "label": "Duration (days)", "required": true }
        ] }],
        "transcript": transcript
    })
    .to_string();
    PackCatalog::from_packs(vec![parse_pack("earache_adult", &text)])
}
