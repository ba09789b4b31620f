//! Heuristic transcript extraction: confidence-scored intake suggestions from free text.

mod cues;
mod detectors;
mod domain;
mod samples;
mod scoring;

#[cfg(test)]
mod tests;

use serde_json::Value;
use tracing::debug;

pub use cues::builtin_hints;
pub use domain::{
    Evidence, FieldGuess, PatientGuess, TranscriptError, TranscriptExtraction, UndetectedField,
};
pub use samples::{sample, SampleExpectation, SampleTranscript, SAMPLE_TRANSCRIPTS};
pub use scoring::{pack_confidence, KeywordHit, Strength};

pub(crate) use scoring::round2;

use crate::workflows::packs::PackCatalog;
use crate::workflows::FieldMap;
use cues::PackProfile;
use detectors::{
    detect_age, detect_answer, detect_duration, detect_pregnancy, detect_sex, guess_pack,
};

const AGE_LABEL: &str = "Patient age";
const SEX_LABEL: &str = "Patient sex";
const PREGNANCY_LABEL: &str = "Pregnancy status";

/// Extractor bound to the transcript profiles of one catalog snapshot. Pure per call.
#[derive(Debug, Clone, Default)]
pub struct TranscriptExtractor {
    profiles: Vec<PackProfile>,
}

impl TranscriptExtractor {
    /// Compiles every pack's transcript profile, in catalog order.
    pub fn new(catalog: &PackCatalog) -> Result<Self, TranscriptError> {
        let mut profiles = Vec::new();
        for pack in catalog.packs() {
            if let Some(profile) = PackProfile::for_pack(pack)? {
                profiles.push(profile);
            }
        }
        Ok(Self { profiles })
    }

    /// Packs that can be guessed from a transcript.
    pub fn pack_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|profile| profile.pack_id.as_str())
    }

    pub fn extract(&self, raw: &str) -> TranscriptExtraction {
        let text = normalize(raw);
        let mut missing = Vec::new();
        let mut warnings = Vec::new();

        if text.is_empty() {
            missing.push(UndetectedField::new("patient.age", AGE_LABEL));
            missing.push(UndetectedField::new("patient.sex", SEX_LABEL));
            missing.push(UndetectedField::new("patient.pregnant", PREGNANCY_LABEL));
            return TranscriptExtraction {
                patient: PatientGuess {
                    age: FieldGuess::absent(Value::Null),
                    sex: FieldGuess::absent(Value::Null),
                    pregnant: FieldGuess::absent(Value::from("unknown")),
                },
                complaint_id: String::new(),
                rule_pack_id: String::new(),
                rule_pack_confidence: 0.0,
                answers: FieldMap::new(),
                missing,
                warnings,
            };
        }
        let lower = text.to_lowercase();

        let age = detect_age(&text);
        if age.is_none() {
            missing.push(UndetectedField::new("patient.age", AGE_LABEL));
        }

        let sex = match detect_sex(&lower) {
            Some((guess, ambiguous)) => {
                if ambiguous {
                    warnings.push(
                        "Transcript contains both female and male descriptors; review patient sex."
                            .to_string(),
                    );
                }
                Some(guess)
            }
            None => {
                missing.push(UndetectedField::new("patient.sex", SEX_LABEL));
                None
            }
        };
        let detected_sex = sex.as_ref().and_then(|guess| guess.value.as_str());

        let pregnant = detect_pregnancy(&lower)
            .unwrap_or_else(|| FieldGuess::absent(Value::from("unknown")));
        if pregnant.value == "unknown" {
            missing.push(UndetectedField::new("patient.pregnant", PREGNANCY_LABEL));
        }
        let is_pregnant = pregnant.value == "yes";
        if is_pregnant && detected_sex == Some("male") {
            warnings.push("Pregnancy detected but patient sex recorded as male.".to_string());
        }

        let guess = guess_pack(&lower, &self.profiles);
        let mut answers = FieldMap::new();
        if let Some((profile, _)) = guess {
            for (field, cues) in &profile.cues {
                if let Some(answer) = detect_answer(&lower, cues) {
                    answers.insert(field.clone(), answer);
                }
            }
            if let Some(question) = &profile.duration_question {
                if let Some(duration) = detect_duration(&lower) {
                    answers.insert(question.clone(), duration);
                }
            }

            for (id, label) in &profile.required {
                if !answers.contains_key(id) {
                    missing.push(UndetectedField::new(id, label));
                }
            }
            if let Some(applicability) = &profile.applicability {
                if let (Some(target), Some(detected)) = (applicability.sex.as_deref(), detected_sex)
                {
                    if target != detected {
                        warnings.push(format!(
                            "{} targets {}; detected sex is {detected}.",
                            profile.label,
                            cohort(target)
                        ));
                    }
                }
                if applicability.excludes_pregnancy && is_pregnant {
                    warnings.push(format!(
                        "{} excludes pregnancy; confirm suitability.",
                        profile.label
                    ));
                }
            }
        }

        let extraction = TranscriptExtraction {
            patient: PatientGuess {
                age: age.unwrap_or_else(|| FieldGuess::absent(Value::Null)),
                sex: sex.unwrap_or_else(|| FieldGuess::absent(Value::Null)),
                pregnant,
            },
            complaint_id: guess
                .map(|(profile, _)| profile.complaint_id.clone())
                .unwrap_or_default(),
            rule_pack_id: guess
                .map(|(profile, _)| profile.pack_id.clone())
                .unwrap_or_default(),
            rule_pack_confidence: guess.map_or(0.0, |(_, confidence)| confidence),
            answers,
            missing,
            warnings,
        };
        debug!(
            pack_id = extraction.rule_pack_id.as_str(),
            confidence = extraction.rule_pack_confidence,
            answers = extraction.answers.len(),
            missing = extraction.missing.len(),
            "transcript extracted"
        );
        extraction
    }
}

/// Collapses runs of whitespace and trims.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cohort(sex: &str) -> &str {
    match sex {
        "female" => "women",
        "male" => "men",
        other => other,
    }
}
