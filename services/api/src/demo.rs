use crate::infra::{pack_registry, verified_catalog, InMemorySessionRepository};
use clap::Args;
use otc_flow::config::AppConfig;
use otc_flow::error::AppError;
use otc_flow::workflows::consultation::{
    describe_confidence, ConsultationService, ConsultationSession, CONFIDENT_THRESHOLD,
};
use otc_flow::workflows::packs::{PackCatalog, PackRegistry};
use otc_flow::workflows::pathway::{evaluate_intake, EvaluationResult, Intake};
use otc_flow::workflows::transcript::{
    sample, SampleTranscript, TranscriptExtraction, TranscriptExtractor, SAMPLE_TRANSCRIPTS,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct RulesArgs {
    /// Rule bundle directory or URL (defaults to OTC_RULES_BASE)
    #[arg(long)]
    pub(crate) rules: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Pack id to evaluate against
    #[arg(long)]
    pub(crate) pack: String,
    /// JSON file holding `{ "patient": {...}, "answers": {...} }`
    #[arg(long)]
    pub(crate) intake: PathBuf,
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

#[derive(Args, Debug)]
pub(crate) struct TranscriptArgs {
    /// Transcript text to analyse
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub(crate) text: Option<String>,
    /// Read the transcript from a file instead
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Run a single bundled sample (uti_classic, feverpain_high, ambiguous_dual)
    #[arg(long)]
    pub(crate) sample: Option<String>,
    /// Bulk-apply threshold (defaults to 0.85)
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

async fn load_catalog(rules: RulesArgs) -> Result<(Arc<PackRegistry>, Arc<PackCatalog>), AppError> {
    let config = AppConfig::load()?;
    let registry = pack_registry(config.rules, rules.rules);
    let catalog = verified_catalog(&registry).await?;
    Ok((registry, catalog))
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        pack,
        intake,
        rules,
    } = args;
    let (_, catalog) = load_catalog(rules).await?;

    let raw = std::fs::read_to_string(&intake)?;
    let intake: Intake = serde_json::from_str(&raw).map_err(std::io::Error::from)?;
    let result = evaluate_intake(&catalog, Some(&pack), &intake)?;

    println!("{}", to_pretty(&result));
    if let Some(note) = &result.documentation {
        println!("\n{note}");
    }
    Ok(())
}

pub(crate) async fn run_transcript(args: TranscriptArgs) -> Result<(), AppError> {
    let TranscriptArgs { text, file, rules } = args;
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => String::new(),
    };
    let (_, catalog) = load_catalog(rules).await?;
    let extractor = TranscriptExtractor::new(&catalog)?;

    println!("{}", to_pretty(&extractor.extract(&text)));
    Ok(())
}

pub(crate) async fn run_pack_verify(args: RulesArgs) -> Result<(), AppError> {
    let (registry, catalog) = load_catalog(args).await?;

    println!(
        "Verified {} rule pack(s) from {}",
        catalog.len(),
        registry.location()
    );
    for summary in catalog.summaries() {
        println!(
            "- {} v{} ({}) {}",
            summary.id,
            summary.version,
            summary
                .complaint
                .as_ref()
                .map(|complaint| complaint.label.as_str())
                .unwrap_or("no complaint"),
            summary.checksum.as_deref().unwrap_or("unchecked")
        );
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        sample: selected,
        threshold,
        rules,
    } = args;
    let (registry, catalog) = load_catalog(rules).await?;
    let samples: Vec<&SampleTranscript> = match selected.as_deref() {
        Some(id) => sample(id).into_iter().collect(),
        None => SAMPLE_TRANSCRIPTS.iter().collect(),
    };
    if samples.is_empty() {
        println!("No sample transcript named {}", selected.unwrap_or_default());
        return Ok(());
    }

    println!(
        "Consultation demo ({} pack(s) from {})",
        catalog.len(),
        registry.location()
    );
    let service = ConsultationService::new(
        Arc::new(InMemorySessionRepository::default()),
        registry.subscribe(),
    );

    for sample in samples {
        println!("\n== {} ==\n{}", sample.id, sample.description);
        let id = service.start()?.id;
        let (_, extraction) = service.ingest_transcript(&id, sample.text)?;
        render_extraction(&extraction, sample);

        let session = service.apply_confident(&id, threshold)?;
        render_session(&session, threshold.unwrap_or(CONFIDENT_THRESHOLD));
        if let Some(result) = &session.evaluation {
            render_evaluation(result);
        }
    }
    Ok(())
}

fn render_extraction(extraction: &TranscriptExtraction, sample: &SampleTranscript) {
    let guessed = extraction.pack_id().unwrap_or("none");
    let verdict = if guessed == sample.expected.rule_pack_id {
        "as expected"
    } else {
        "unexpected"
    };
    println!(
        "- Pack guess: {} ({:.2}, {})",
        guessed, extraction.rule_pack_confidence, verdict
    );
    for warning in &extraction.warnings {
        println!("  ! {warning}");
    }
    if !extraction.missing.is_empty() {
        let labels: Vec<&str> = extraction
            .missing
            .iter()
            .map(|field| field.label.as_str())
            .collect();
        println!("  Not detected: {}", labels.join(", "));
    }
}

fn render_session(session: &ConsultationSession, threshold: f64) {
    println!("- Suggestions (bulk apply at {threshold:.2}):");
    for suggestion in session.suggestions.iter() {
        println!(
            "    {} = {} [{:.2} {}] {}",
            suggestion.id,
            suggestion.value,
            suggestion.confidence,
            describe_confidence(suggestion.confidence),
            suggestion.status.as_str()
        );
    }
}

fn render_evaluation(result: &EvaluationResult) {
    println!("- Outcome: {} ({})", result.outcome, result.urgency);
    println!("  {}", result.headline);
    if !result.missing.is_empty() {
        let ids: Vec<&str> = result.missing.iter().map(|field| field.id.as_str()).collect();
        println!("  Still needed: {}", ids.join(", "));
    }
    for warning in &result.warnings {
        println!("  ! {warning}");
    }
}

fn to_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("<unserialisable: {err}>"))
}
