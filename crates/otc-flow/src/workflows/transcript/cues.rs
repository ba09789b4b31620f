use regex::{Regex, RegexBuilder};

use super::scoring::Strength;
use super::TranscriptError;
use crate::workflows::packs::{AnswerCue, Applicability, KeywordHint, RulePack, TranscriptHints};
use crate::workflows::FieldMap;

const YES: &str = "yes";
const NO: &str = "no";

/// `(value, pattern, strength, bypass negation)`
type CueRow = (&'static str, &'static str, &'static str, bool);

const fn yes(pattern: &'static str, strength: &'static str) -> CueRow {
    (YES, pattern, strength, false)
}

const fn no(pattern: &'static str, strength: &'static str) -> CueRow {
    (NO, pattern, strength, true)
}

const UTI_KEYWORDS: &[(&str, f64, &str)] = &[
    (r"\buti\b", 3.0, "explicit"),
    (r"\burinary\s+(?:symptoms|tract\s+infection)\b", 3.0, "explicit"),
    (r"\bburning\s+(?:when|on)\s+(?:urinating|passing urine|peeing)\b", 2.0, "strong"),
    (r"\bburning\s+urine\b", 2.0, "strong"),
    (r"\bdysuria\b", 2.0, "strong"),
    (r"\bwater\s+infection\b", 2.0, "moderate"),
    (r"\bfrequency\s+of\s+urination\b", 1.0, "moderate"),
];

const UTI_CUES: &[(&str, &[CueRow])] = &[
    ("dysuria", &[
        yes(r"\bdysuria\b", "explicit"),
        yes(r"\bburning\b[^.]{0,30}\b(?:urine|urinating|peeing|passing urine)\b", "strong"),
        yes(r"\bpain\b[^.]{0,30}\b(?:urinating|passing urine|peeing)\b", "strong"),
        no(r"\bno\s+(?:dysuria|pain\s+(?:when|on)\s+(?:urinating|passing urine|peeing))\b", "strong"),
        no(r"\bdenies\b[^.]{0,30}\b(dysuria|pain\s+(?:when|on)\s+(?:urinating|passing urine|peeing))\b", "strong"),
    ]),
    ("frequency", &[
        yes(r"\b(?:urinating|peeing|passing urine)\b[^.]{0,30}\b(more|often|frequently)\b", "strong"),
        yes(r"\b(?:peeing|urinating|pee)\b[^.]{0,20}\b(?:every|each)\b[^.]{0,10}\b(?:hour|couple of hours)\b", "moderate"),
        yes(r"\bpee\b[^.]{0,15}\b(?:every|each)\b[^.]{0,6}\bhour\b", "moderate"),
        yes(r"\burinary\s+frequency\b", "moderate"),
        yes(r"\burgency\b", "moderate"),
        no(r"\bno\s+(?:change|increase)\s+in\s+(?:urination|peeing)\b", "strong"),
        no(r"\bdenies\b[^.]{0,30}\b(?:frequency|urgent need to pee)\b", "strong"),
    ]),
    ("urgency", &[
        yes(r"\burgenc(?:y|ies)\b", "strong"),
        yes(r"\bstruggling\s+to\s+hold\s+urine\b", "moderate"),
        no(r"\bno\s+(?:urgency|issues\s+holding\s+urine)\b", "strong"),
    ]),
    ("visibleHaematuria", &[
        yes(r"\bvisible\s+blood\s+in\s+urine\b", "explicit"),
        yes(r"\bhematuria|haematuria\b", "strong"),
        no(r"\bno\s+(?:visible\s+)?blood\s+in\s+urine\b", "strong"),
        no(r"\bdenies\b[^.]{0,30}\b(?:blood\s+in\s+urine|hematuria|haematuria)\b", "strong"),
    ]),
    ("fever", &[
        yes(r"\bfever|pyrexia\b", "moderate"),
        no(r"\bno\s+fever\b", "strong"),
        no(r"\bdenies\b[^.]{0,40}\b(?:fever|pyrexia)\b", "strong"),
        no(r"\bafebrile\b", "moderate"),
    ]),
    ("loinPain", &[
        yes(r"\bloin\s+pain|flank\s+pain\b", "strong"),
        no(r"\bno\s+(?:loin|flank)\s+pain\b", "strong"),
        no(r"\bdenies\b[^.]{0,40}\b(?:loin|flank)\s+pain\b", "strong"),
    ]),
    ("vaginalDischarge", &[
        yes(r"\bvaginal\s+discharge\b", "moderate"),
        no(r"\bno\s+vaginal\s+discharge\b", "strong"),
        no(r"\bdenies\b[^.]{0,40}\bvaginal\s+discharge\b", "strong"),
    ]),
    ("recurrentUti", &[
        yes(r"\brecurrent\s+uti\b", "moderate"),
        yes(r"\b(\d+)\s+utis?\s+(?:this|last)\s+(?:year|6\s+months)\b", "moderate"),
        no(r"\bno\s+history\s+of\s+recurrent\s+uti\b", "strong"),
    ]),
    ("diabetes", &[
        yes(r"\b(diabetes|diabetic)\b", "strong"),
        no(r"\bno\s+diabetes\b", "strong"),
    ]),
    ("renalImpairment", &[
        yes(r"\brenal\s+impairment\b", "strong"),
        no(r"\bno\s+known\s+renal\s+issues\b", "moderate"),
    ]),
    ("indwellingCatheter", &[
        yes(r"\bindwelling\s+catheter\b", "explicit"),
        no(r"\bno\s+catheter\b", "strong"),
    ]),
    ("immunocompromised", &[
        yes(r"\bimmunocompromised\b", "strong"),
        no(r"\bnot\s+immunocompromised\b", "moderate"),
    ]),
    ("recentUti", &[
        yes(r"\buti\b[^.]{0,40}\b(last|recent|within)\b[^.]{0,20}\b(\d+)\b", "moderate"),
        no(r"\bno\s+recent\s+uti\b", "strong"),
    ]),
];

const SORE_THROAT_KEYWORDS: &[(&str, f64, &str)] = &[
    (r"\bsore\s+throat\b", 3.0, "explicit"),
    (r"\btonsillitis\b", 2.0, "strong"),
    (r"\bfeverpain\b", 3.0, "explicit"),
    (r"\bthroat\s+pain\b", 1.0, "moderate"),
    (r"\bstrep\s+throat\b", 2.0, "strong"),
];

const SORE_THROAT_CUES: &[(&str, &[CueRow])] = &[
    ("airwayCompromise", &[
        yes(r"\b(drooling|stridor|airway\s+compromise)\b", "strong"),
        no(r"\bno\s+(?:drooling|stridor|airway\s+issues)\b", "strong"),
        no(r"\bdenies\b[^.]{0,30}\b(breathing\s+difficulty|airway\s+(?:issues|compromise))\b", "strong"),
    ]),
    ("systemicallyUnwell", &[
        yes(r"\b(systemically\s+very\s+unwell|toxic\s+appearance)\b", "strong"),
        no(r"\bnot\s+systemically\s+unwell\b", "strong"),
    ]),
    ("immunocompromise", &[
        yes(r"\bimmunocompromised\b", "strong"),
        no(r"\bno\s+immunocompromise\b", "strong"),
        no(r"\bdenies\b[^.]{0,30}\bimmunocompromise\b", "strong"),
    ]),
    ("fever", &[
        yes(r"\bfever\b", "moderate"),
        no(r"\bno\s+fever\b", "strong"),
        no(r"\bafebrile\b", "moderate"),
    ]),
    ("purulence", &[
        yes(r"\bpus\s+on\s+(?:the\s+|her\s+|his\s+)?(?:tonsils|throat)\b", "explicit"),
        yes(r"\btonsillar\s+exudate\b", "strong"),
        no(r"\bno\s+(?:pus|exudate)\b", "strong"),
    ]),
    ("rapidOnset", &[
        yes(r"\bonset\s+(?:within|over)\s+(?:the\s+last|past)\s*(?:24|48|3)\s*(?:hours|days)\b", "strong"),
        yes(r"\bstarted\s+(?:two|three|\d+)\s+days\s+ago\b", "moderate"),
        yes(r"\bstarting\s+(?:two|three|\d+)\s+days\s+ago\b", "moderate"),
        no(r"\bmore\s+than\s+10\s+days\b", "moderate"),
    ]),
    ("inflamedTonsils", &[
        yes(r"\binflamed\s+(?:tonsils|throat)\b", "strong"),
        yes(r"\berythematous\s+tonsils\b", "strong"),
        no(r"\btonsils\s+normal\b", "moderate"),
    ]),
    ("noCough", &[
        yes(r"\bno\s+cough\b", "explicit"),
        yes(r"\bdenies\s+cough\b", "strong"),
        no(r"\bproductive\s+cough\b", "moderate"),
        no(r"\bpersistent\s+cough\b", "moderate"),
    ]),
    ("previousStrep", &[
        yes(r"\b(strep|scarlet\s+fever)\b[^.]{0,30}\b(last|recent|within)\b", "moderate"),
        no(r"\bno\s+recent\s+(?:strep|scarlet\s+fever)\b", "strong"),
    ]),
    ("antibioticAllergy", &[
        yes(r"\bpenicillin\s+allergy\b", "explicit"),
        no(r"\bno\s+penicillin\s+allergy\b", "strong"),
    ]),
];

/// Built-in cue profile for the packs shipped with the service.
pub fn builtin_hints(pack_id: &str) -> Option<TranscriptHints> {
    let (keywords, cues, applicability) = match pack_id {
        "uti_women_16_64" => (
            UTI_KEYWORDS,
            UTI_CUES,
            Some(Applicability {
                sex: Some("female".to_string()),
                excludes_pregnancy: true,
                label: Some("Uncomplicated UTI pack".to_string()),
            }),
        ),
        "sore_throat_feverpain" => (SORE_THROAT_KEYWORDS, SORE_THROAT_CUES, None),
        _ => return None,
    };

    Some(TranscriptHints {
        keywords: keywords
            .iter()
            .map(|(pattern, weight, strength)| KeywordHint {
                pattern: (*pattern).to_string(),
                weight: *weight,
                strength: Some((*strength).to_string()),
            })
            .collect(),
        cues: cues
            .iter()
            .map(|(field, rows)| {
                let rows = rows
                    .iter()
                    .map(|(value, pattern, strength, bypass)| AnswerCue {
                        value: (*value).to_string(),
                        pattern: (*pattern).to_string(),
                        strength: Some((*strength).to_string()),
                        bypass_negation: *bypass,
                    })
                    .collect();
                ((*field).to_string(), rows)
            })
            .collect::<FieldMap<_>>(),
        duration_question: Some("durationDays".to_string()),
        applicability,
    })
}

#[derive(Debug, Clone)]
pub(super) struct CompiledKeyword {
    pub regex: Regex,
    pub weight: f64,
    pub strength: Strength,
}

#[derive(Debug, Clone)]
pub(super) struct CompiledCue {
    pub value: String,
    pub regex: Regex,
    pub strength: Strength,
    pub bypass_negation: bool,
}

/// A pack's transcript profile, ready to match.
#[derive(Debug, Clone)]
pub(super) struct PackProfile {
    pub pack_id: String,
    pub complaint_id: String,
    pub label: String,
    pub keywords: Vec<CompiledKeyword>,
    pub cues: Vec<(String, Vec<CompiledCue>)>,
    pub duration_question: Option<String>,
    pub applicability: Option<Applicability>,
    /// `(question id, label)` for every required question.
    pub required: Vec<(String, String)>,
}

impl PackProfile {
    /// A declared `transcript` block wins over the built-in profile. Packs with
    /// neither are not candidates for extraction.
    pub fn for_pack(pack: &RulePack) -> Result<Option<Self>, TranscriptError> {
        let Some(hints) = pack.transcript.clone().or_else(|| builtin_hints(&pack.id)) else {
            return Ok(None);
        };

        let keywords = hints
            .keywords
            .iter()
            .map(|hint| {
                Ok(CompiledKeyword {
                    regex: compile(&pack.id, &hint.pattern)?,
                    weight: hint.weight,
                    strength: Strength::parse(hint.strength.as_deref()),
                })
            })
            .collect::<Result<Vec<_>, TranscriptError>>()?;

        let mut cues = Vec::with_capacity(hints.cues.len());
        for (field, rows) in &hints.cues {
            let compiled = rows
                .iter()
                .map(|cue| {
                    Ok(CompiledCue {
                        value: cue.value.clone(),
                        regex: compile(&pack.id, &cue.pattern)?,
                        strength: Strength::parse(cue.strength.as_deref()),
                        bypass_negation: cue.bypass_negation,
                    })
                })
                .collect::<Result<Vec<_>, TranscriptError>>()?;
            cues.push((field.clone(), compiled));
        }

        let label = hints
            .applicability
            .as_ref()
            .and_then(|applicability| applicability.label.clone())
            .unwrap_or_else(|| format!("{} pack", pack.name));

        Ok(Some(Self {
            pack_id: pack.id.clone(),
            complaint_id: pack.complaint_id().unwrap_or_default().to_string(),
            label,
            keywords,
            cues,
            duration_question: hints.duration_question.clone(),
            applicability: hints.applicability.clone(),
            required: pack
                .required_questions()
                .map(|question| (question.id.clone(), question.label.clone()))
                .collect(),
        }))
    }
}

fn compile(pack_id: &str, pattern: &str) -> Result<Regex, TranscriptError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TranscriptError::InvalidCue {
            pack_id: pack_id.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}
