//! Signed rule-pack bundles: fetch, verify, normalise, and publish.

mod domain;
mod manifest;
mod registry;
mod signature;
mod source;

pub use domain::{
    AdviceRule, AnswerCue, Applicability, CheckRule, Complaint, DefaultRule, DerivedValue,
    KeywordHint, OutcomeRule, OutcomeTrace, PackLogic, PackSource, PackSummary, Question,
    QuestionKind, QuestionOption, RequiredFields, RuleDetail, RulePack, Section, TranscriptHints,
};
pub use manifest::{
    checksum, Manifest, ManifestEntry, MANIFEST_FILE, PUBLIC_KEY_FILE, SIGNATURE_FILE,
};
pub use registry::{ComplaintOption, LoadResult, PackCatalog, PackRef, PackRegistry, TrustError};
pub use signature::{decode_signature, verify_manifest};
pub use source::{DirectorySource, HttpSource, RuleSource, SourceError};
