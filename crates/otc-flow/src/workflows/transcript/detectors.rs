use std::sync::OnceLock;

use regex::Regex;

use super::cues::{CompiledCue, PackProfile};
use super::domain::{Evidence, FieldGuess};
use super::scoring::{pack_confidence, KeywordHit, Strength};

/// Characters before a match searched for a negation word.
const NEGATION_WINDOW: usize = 40;

pub(super) const FEMALE_TERMS: &[&str] = &["female", "woman", "women", "lady", "girl", "she", "her"];
pub(super) const MALE_TERMS: &[&str] = &["male", "man", "men", "gent", "gentleman", "boy", "he", "him"];

struct AgePattern {
    regex: Regex,
    strength: Strength,
    decade: bool,
}

struct PregnancyPattern {
    regex: Regex,
    pregnant: bool,
    strength: Strength,
    bypass_negation: bool,
}

struct SexTerm {
    female: bool,
    term: &'static str,
    regex: Regex,
}

static NEGATION: OnceLock<Regex> = OnceLock::new();
static AGE_PATTERNS: OnceLock<Vec<AgePattern>> = OnceLock::new();
static PREGNANCY_PATTERNS: OnceLock<Vec<PregnancyPattern>> = OnceLock::new();
static DURATION_PATTERNS: OnceLock<Vec<(Regex, Strength)>> = OnceLock::new();
static SEX_TERMS: OnceLock<Vec<SexTerm>> = OnceLock::new();

fn pattern(source: &str) -> Regex {
    Regex::new(&format!("(?i){source}")).expect("built-in transcript pattern is valid")
}

fn negation() -> &'static Regex {
    NEGATION.get_or_init(|| {
        pattern(r"\b(?:no|not|denies?|denied|without|absence of|free of|negative for)\b")
    })
}

fn age_patterns() -> &'static [AgePattern] {
    AGE_PATTERNS.get_or_init(|| {
        let age = |source: &str, strength: Strength, decade: bool| AgePattern {
            regex: pattern(source),
            strength,
            decade,
        };
        vec![
            age(r"\bage(?:d|:)?\s*(\d{1,3})\b", Strength::Explicit, false),
            age(r"\b(\d{1,3})[- ]?year[- ]?old\b", Strength::Explicit, false),
            age(r"\b(\d{1,3})\s*(?:years?|yrs?)\s*(?:old|of age)?\b", Strength::Explicit, false),
            age(r"\b(\d{1,3})\s*y/?o\b", Strength::Strong, false),
            age(r"\b(mid|late|early)\s*(\d{2})s\b", Strength::Weak, true),
        ]
    })
}

fn pregnancy_patterns() -> &'static [PregnancyPattern] {
    PREGNANCY_PATTERNS.get_or_init(|| {
        let rule = |source: &str, pregnant: bool, strength: Strength, bypass_negation: bool| {
            PregnancyPattern {
                regex: pattern(source),
                pregnant,
                strength,
                bypass_negation,
            }
        };
        vec![
            rule(r"\b(pregnant|pregnancy|expecting)\b", true, Strength::Explicit, false),
            rule(r"\b(denies|not|no)\s+(?:currently\s+)?pregnant\b", false, Strength::Explicit, true),
            rule(r"\bnegative\s+pregnancy\s+test\b", false, Strength::Strong, true),
            rule(r"\bpregnancy\s+test\s+negative\b", false, Strength::Strong, true),
        ]
    })
}

fn duration_patterns() -> &'static [(Regex, Strength)] {
    DURATION_PATTERNS.get_or_init(|| {
        vec![
            (pattern(r"for\s+(\d{1,2})\s+days\b"), Strength::Strong),
            (pattern(r"since\s+(?:the\s+last|past)\s+(\d{1,2})\s+days\b"), Strength::Moderate),
            (pattern(r"(?:last|past)\s+(\d{1,2})\s+days\b"), Strength::Weak),
            (pattern(r"(\d{1,2})\s+days\s+ago\b"), Strength::Moderate),
            (pattern(r"(\d{1,2})\s+day\b"), Strength::Weak),
        ]
    })
}

fn sex_terms() -> &'static [SexTerm] {
    SEX_TERMS.get_or_init(|| {
        let female = FEMALE_TERMS.iter().map(|term| (true, *term));
        let male = MALE_TERMS.iter().map(|term| (false, *term));
        female
            .chain(male)
            .map(|(female, term)| SexTerm {
                female,
                term,
                regex: pattern(&format!(r"\b{term}\b")),
            })
            .collect()
    })
}

/// True when a negation word appears shortly before byte offset `index`.
pub(super) fn is_negated(text: &str, index: usize) -> bool {
    let start = text[..index]
        .char_indices()
        .rev()
        .nth(NEGATION_WINDOW - 1)
        .map_or(0, |(offset, _)| offset);
    negation().is_match(&text[start..index])
}

/// First plausible age (0 < age < 120) by pattern priority.
pub(super) fn detect_age(text: &str) -> Option<FieldGuess> {
    for rule in age_patterns() {
        for captures in rule.regex.captures_iter(text) {
            let age = if rule.decade {
                decade_age(&captures[1], &captures[2])
            } else {
                captures[1].parse::<u32>().ok()
            };
            let Some(age) = age.filter(|age| (1..120).contains(age)) else {
                continue;
            };
            let whole = &captures[0];
            let index = captures.get(0).map(|found| found.start());
            return Some(FieldGuess::matched(
                age,
                Evidence {
                    strength: rule.strength,
                    matched: whole.to_string(),
                    index,
                    terms: Vec::new(),
                },
            ));
        }
    }
    None
}

fn decade_age(phase: &str, decade: &str) -> Option<u32> {
    let base = decade.parse::<u32>().ok()?;
    Some(match phase.to_ascii_lowercase().as_str() {
        "mid" => base + 5,
        "late" => base + 8,
        _ => base,
    })
}

/// Sex guess and whether both vocabularies matched. Ties go to female.
pub(super) fn detect_sex(text: &str) -> Option<(FieldGuess, bool)> {
    let hits: Vec<&SexTerm> = sex_terms()
        .iter()
        .filter(|term| term.regex.is_match(text))
        .collect();
    let female: Vec<&SexTerm> = hits.iter().copied().filter(|hit| hit.female).collect();
    let male: Vec<&SexTerm> = hits.iter().copied().filter(|hit| !hit.female).collect();

    let (value, group) = if female.is_empty() && male.is_empty() {
        return None;
    } else if female.len() >= male.len() {
        ("female", &female)
    } else {
        ("male", &male)
    };
    let best = group[0];
    let strength = if best.term == value {
        Strength::Explicit
    } else {
        Strength::Strong
    };
    let evidence = Evidence {
        strength,
        matched: best.term.to_string(),
        index: None,
        terms: hits.iter().map(|hit| hit.term.to_string()).collect(),
    };
    let ambiguous = !female.is_empty() && !male.is_empty();
    Some((FieldGuess::matched(value, evidence), ambiguous))
}

/// Highest-confidence pregnancy statement; positive mentions respect negation.
pub(super) fn detect_pregnancy(text: &str) -> Option<FieldGuess> {
    let mut best: Option<FieldGuess> = None;
    for rule in pregnancy_patterns() {
        for found in rule.regex.find_iter(text) {
            if !rule.bypass_negation && is_negated(text, found.start()) {
                continue;
            }
            let value = if rule.pregnant { "yes" } else { "no" };
            let guess = FieldGuess::matched(
                value,
                Evidence {
                    strength: rule.strength,
                    matched: found.as_str().to_string(),
                    index: Some(found.start()),
                    terms: Vec::new(),
                },
            );
            if best.as_ref().map_or(true, |current| guess.confidence > current.confidence) {
                best = Some(guess);
            }
        }
    }
    best
}

/// First duration in days between 1 and 59, by pattern priority.
pub(super) fn detect_duration(text: &str) -> Option<FieldGuess> {
    for (regex, strength) in duration_patterns() {
        for captures in regex.captures_iter(text) {
            let Some(days) = captures[1].parse::<u32>().ok().filter(|days| (1..60).contains(days))
            else {
                continue;
            };
            return Some(FieldGuess::matched(
                days,
                Evidence {
                    strength: *strength,
                    matched: captures[0].to_string(),
                    index: captures.get(0).map(|found| found.start()),
                    terms: Vec::new(),
                },
            ));
        }
    }
    None
}

/// Highest-scoring profile with at least one keyword hit; earlier profiles win ties.
pub(super) fn guess_pack<'p>(
    text: &str,
    profiles: &'p [PackProfile],
) -> Option<(&'p PackProfile, f64)> {
    let mut best: Option<(&PackProfile, f64)> = None;
    for profile in profiles {
        let hits: Vec<KeywordHit> = profile
            .keywords
            .iter()
            .flat_map(|keyword| {
                keyword.regex.find_iter(text).map(|_| KeywordHit {
                    weight: keyword.weight,
                    strength: keyword.strength,
                })
            })
            .collect();
        if hits.is_empty() {
            continue;
        }
        let confidence = pack_confidence(&hits);
        if best.map_or(true, |(_, current)| confidence > current) {
            best = Some((profile, confidence));
        }
    }
    best
}

/// Best cue match for one answer field.
pub(super) fn detect_answer(text: &str, cues: &[CompiledCue]) -> Option<FieldGuess> {
    let mut best: Option<FieldGuess> = None;
    for cue in cues {
        for found in cue.regex.find_iter(text) {
            if !cue.bypass_negation && is_negated(text, found.start()) {
                continue;
            }
            let guess = FieldGuess::matched(
                cue.value.as_str(),
                Evidence {
                    strength: cue.strength,
                    matched: found.as_str().to_string(),
                    index: Some(found.start()),
                    terms: Vec::new(),
                },
            );
            if best.as_ref().map_or(true, |current| guess.confidence > current.confidence) {
                best = Some(guess);
            }
        }
    }
    best
}
