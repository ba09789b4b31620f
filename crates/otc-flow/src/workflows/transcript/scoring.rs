use std::fmt;

use serde::{Deserialize, Serialize};

/// Confidence tier attached to every pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Explicit,
    Strong,
    Moderate,
    Weak,
    Conflict,
    None,
}

impl Strength {
    /// Unrecognised or absent tiers score as `weak`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("explicit") => Strength::Explicit,
            Some("strong") => Strength::Strong,
            Some("moderate") => Strength::Moderate,
            Some("conflict") => Strength::Conflict,
            Some("none") => Strength::None,
            _ => Strength::Weak,
        }
    }

    pub fn score(self) -> f64 {
        match self {
            Strength::Explicit => 0.95,
            Strength::Strong => 0.85,
            Strength::Moderate => 0.75,
            Strength::Weak => 0.6,
            Strength::Conflict => 0.35,
            Strength::None => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strength::Explicit => "explicit",
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Weak => "weak",
            Strength::Conflict => "conflict",
            Strength::None => "none",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyword hit counted towards a pack guess.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordHit {
    pub weight: f64,
    pub strength: Strength,
}

/// `min(1, 0.6 * (total weight / 6) + 0.4 * mean strength score)`, two decimals.
pub fn pack_confidence(hits: &[KeywordHit]) -> f64 {
    if hits.is_empty() {
        return Strength::None.score();
    }
    let total_weight: f64 = hits
        .iter()
        .map(|hit| if hit.weight == 0.0 || hit.weight.is_nan() { 1.0 } else { hit.weight })
        .sum();
    let mean_strength =
        hits.iter().map(|hit| hit.strength.score()).sum::<f64>() / hits.len() as f64;
    round2((total_weight / 6.0 * 0.6 + mean_strength * 0.4).min(1.0))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
