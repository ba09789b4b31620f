use super::domain::{EvaluationResult, PatientDetails, Pregnancy};
use crate::logic::format_number;
use crate::workflows::packs::RulePack;

const FOOTER: &str = "Document generated by OTC Flow. No patient identifiers stored.";

/// Plain-text consultation note for the clinical record.
pub fn render_note(pack: &RulePack, patient: &PatientDetails, result: &EvaluationResult) -> String {
    let mut lines: Vec<String> = Vec::new();
    let age = patient
        .age
        .map(format_number)
        .unwrap_or_else(|| "unknown".to_string());

    lines.push(format!("# Consultation summary - {}", pack.name));
    lines.push(String::new());
    lines.push(format!(
        "- Rule pack version {} (effective from {}, last reviewed {}).",
        pack.version,
        pack.effective_from.as_deref().unwrap_or("unknown"),
        pack.last_reviewed.as_deref().unwrap_or("unknown"),
    ));
    lines.push(format!(
        "- Patient: age {}, sex {}.",
        age,
        or_unknown(&patient.sex)
    ));
    if patient.sex == "female" {
        let pregnancy = match patient.pregnant {
            Pregnancy::Yes => "pregnant",
            Pregnancy::No => "not pregnant",
            Pregnancy::Unknown => "unknown",
        };
        lines.push(format!("- Pregnancy: {pregnancy}."));
    }
    if !patient.postcode.is_empty() {
        lines.push(format!("- Postcode: {}.", patient.postcode));
    }

    lines.push(String::new());
    lines.push("## Assessment".to_string());
    lines.push(format!(
        "- Presenting complaint: {}.",
        pack.complaint
            .as_ref()
            .map(|complaint| complaint.label.as_str())
            .unwrap_or("unknown")
    ));
    lines.push(format!("- Outcome: {}.", result.headline));
    lines.extend(result.warnings.iter().map(|warning| format!("- Caution: {warning}")));

    lines.push(String::new());
    lines.push("## Decision trace".to_string());
    lines.extend(result.trace.iter().map(|entry| {
        format!(
            "- [{}] {}",
            entry.status.as_str().to_ascii_uppercase(),
            entry.label
        )
    }));

    lines.push(String::new());
    lines.push("## Plan".to_string());
    lines.extend(result.actions.iter().map(|action| format!("- {action}")));
    if let Some(supply) = &result.supply {
        lines.push(format!("- Product: {}.", supply.product));
        lines.push(format!("- Dosage: {}.", supply.dosage));
        if let Some(notes) = supply.notes.as_deref().filter(|notes| !notes.is_empty()) {
            lines.push(format!("- Notes: {notes}."));
        }
    }
    if let Some(referral) = &result.referral {
        lines.push(format!(
            "- Referral: {} ({}).",
            referral.destination, referral.reason
        ));
    }

    lines.push(String::new());
    lines.push("## Safety netting".to_string());
    lines.extend(result.safety_net.iter().map(|advice| format!("- {advice}")));

    lines.push(String::new());
    lines.push(FOOTER.to_string());

    lines.join("\n")
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}
