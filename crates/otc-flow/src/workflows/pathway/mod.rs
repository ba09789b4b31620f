//! Pathway evaluation: validate intake, run a pack's logic, and shape the recommendation.

mod documentation;
mod domain;
mod normalize;
mod rules;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::warn;

pub use documentation::render_note;
pub use domain::{
    EvaluationResult, Governance, Intake, MissingField, Outcome, PathwayError, PatientDetails,
    Pregnancy, Referral, Supply, TraceEntry, TraceStatus,
};
pub use normalize::{
    collect_missing_fields, normalize_answer, normalize_boolean, normalize_multi_select,
    normalize_number,
};

use crate::workflows::packs::{PackCatalog, RulePack};
use rules::RuleRun;

/// Stateless evaluator over one catalog snapshot.
#[derive(Debug, Clone)]
pub struct PathwayEvaluator {
    catalog: Arc<PackCatalog>,
}

impl PathwayEvaluator {
    pub fn new(catalog: Arc<PackCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PackCatalog {
        &self.catalog
    }

    /// Evaluates `intake` against the selected pack.
    pub fn evaluate(
        &self,
        pack_id: Option<&str>,
        intake: &Intake,
    ) -> Result<EvaluationResult, PathwayError> {
        evaluate_intake(&self.catalog, pack_id, intake)
    }
}

/// A missing or unknown pack yields a terminal `incomplete` prompt rather than an error.
pub fn evaluate_intake(
    catalog: &PackCatalog,
    pack_id: Option<&str>,
    intake: &Intake,
) -> Result<EvaluationResult, PathwayError> {
    let Some(pack_id) = pack_id.filter(|id| !id.is_empty()) else {
        return Ok(EvaluationResult::prompt(
            "Select a pathway to begin",
            "Choose the presenting complaint and pathway to run the assessment.",
        ));
    };
    let Some(pack) = catalog.get(pack_id) else {
        return Ok(EvaluationResult::prompt(
            "Pathway not available",
            "The selected pathway could not be loaded.",
        ));
    };
    evaluate_pack(pack, intake).map_err(|error| {
        warn!(pack_id, error = %error, "evaluation aborted by rule pack error");
        error
    })
}

/// Runs one pack: required fields, derived values, checks, advice, outcomes, default.
pub fn evaluate_pack(pack: &RulePack, intake: &Intake) -> Result<EvaluationResult, PathwayError> {
    let missing = collect_missing_fields(pack, intake);
    if !missing.is_empty() {
        let mut result = EvaluationResult::prompt(
            "More information required",
            "Capture the highlighted fields before generating a recommendation.",
        );
        result.missing = missing;
        result.safety_net = pack.safety_netting.clone();
        return Ok(result);
    }

    let mut run = RuleRun::start(pack, intake)?;
    let raw = match run.checks()?.filter(|result| result.is_truthy()) {
        Some(vetoed) => vetoed,
        None => {
            run.advice()?;
            match run.outcomes()?.filter(|result| result.is_truthy()) {
                Some(matched) => matched,
                None => run.fallback()?,
            }
        }
    };
    run.finish(raw)
}
