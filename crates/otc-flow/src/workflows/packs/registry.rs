use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::domain::{PackSummary, RulePack};
use super::manifest::{checksum, Manifest, MANIFEST_FILE, PUBLIC_KEY_FILE, SIGNATURE_FILE};
use super::signature::verify_manifest;
use super::source::{RuleSource, SourceError};
use crate::logic::LogicError;

/// Reasons a rule bundle is refused. Any of these leaves the published catalog untouched.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error(transparent)]
    Fetch(#[from] SourceError),
    #[error("Rule manifest public key invalid: {0}")]
    PublicKey(String),
    #[error("Rule manifest signature is not a valid ECDSA signature.")]
    SignatureEncoding,
    #[error("Rule manifest signature invalid.")]
    SignatureInvalid,
    #[error("Rule manifest is not valid JSON: {0}")]
    Manifest(#[source] serde_json::Error),
    #[error("Checksum mismatch for {path}. Expected {expected}, got {actual}.")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("Rule pack {path} is malformed: {source}")]
    PackFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Rule pack {pack_id} contains an invalid expression: {source}")]
    PackLogic {
        pack_id: String,
        #[source]
        source: LogicError,
    },
    #[error("Rule manifest lists pack {0} more than once.")]
    DuplicatePack(String),
    #[error("rule loading task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackRef {
    pub id: String,
    pub name: String,
}

/// A presenting complaint with the packs that cover it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplaintOption {
    pub id: String,
    pub label: String,
    pub packs: Vec<PackRef>,
}

/// Immutable set of verified packs, replaced wholesale on reload.
#[derive(Debug, Clone, Default)]
pub struct PackCatalog {
    packs: Vec<RulePack>,
    loaded_at: Option<DateTime<Utc>>,
}

impl PackCatalog {
    /// Wraps packs whose provenance the caller has already established.
    pub fn from_packs(packs: Vec<RulePack>) -> Self {
        Self {
            packs,
            loaded_at: None,
        }
    }

    fn verified(packs: Vec<RulePack>, loaded_at: DateTime<Utc>) -> Self {
        Self {
            packs,
            loaded_at: Some(loaded_at),
        }
    }

    pub fn packs(&self) -> &[RulePack] {
        &self.packs
    }

    pub fn get(&self, id: &str) -> Option<&RulePack> {
        self.packs.iter().find(|pack| pack.id == id)
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn summaries(&self) -> Vec<PackSummary> {
        self.packs.iter().map(RulePack::summary).collect()
    }

    pub fn packs_for_complaint<'a>(
        &'a self,
        complaint_id: &'a str,
    ) -> impl Iterator<Item = &'a RulePack> + 'a {
        self.packs
            .iter()
            .filter(move |pack| pack.complaint_id() == Some(complaint_id))
    }

    /// Complaints in first-seen order, each listing its packs.
    pub fn complaint_options(&self) -> Vec<ComplaintOption> {
        let mut options: Vec<ComplaintOption> = Vec::new();
        for pack in &self.packs {
            let Some(complaint) = &pack.complaint else {
                continue;
            };
            let pack_ref = PackRef {
                id: pack.id.clone(),
                name: pack.name.clone(),
            };
            match options.iter_mut().find(|option| option.id == complaint.id) {
                Some(option) => option.packs.push(pack_ref),
                None => options.push(ComplaintOption {
                    id: complaint.id.clone(),
                    label: complaint.label.clone(),
                    packs: vec![pack_ref],
                }),
            }
        }
        options
    }
}

pub type LoadResult = Result<Arc<PackCatalog>, Arc<TrustError>>;
type InflightLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Process-scoped owner of the verified pack catalog.
///
/// Loads are memoised: concurrent callers share one fetch-and-verify run and observe the
/// same outcome. A failed load clears the memo so the next call retries.
pub struct PackRegistry {
    source: Arc<dyn RuleSource>,
    inflight: Mutex<Option<(u64, InflightLoad)>>,
    generation: AtomicU64,
    catalog: watch::Sender<Arc<PackCatalog>>,
}

impl PackRegistry {
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        let (catalog, _) = watch::channel(Arc::new(PackCatalog::default()));
        Self {
            source,
            inflight: Mutex::new(None),
            generation: AtomicU64::new(0),
            catalog,
        }
    }

    pub async fn load(&self) -> LoadResult {
        let (generation, load) = self.inflight_load();
        match load.await {
            Ok(catalog) => {
                if generation == self.generation.load(Ordering::SeqCst) {
                    self.publish(&catalog);
                } else {
                    debug!(generation, "discarding superseded rule pack load");
                }
                Ok(catalog)
            }
            Err(error) => {
                self.forget(generation);
                Err(error)
            }
        }
    }

    /// Drops the memoised load so the next `load` fetches the bundle again.
    pub fn invalidate(&self) {
        let mut slot = self.inflight.lock().expect("pack registry mutex poisoned");
        *slot = None;
    }

    pub async fn reload(&self) -> LoadResult {
        self.invalidate();
        self.load().await
    }

    /// Receiver starting at the current catalog and updated on every successful load.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PackCatalog>> {
        self.catalog.subscribe()
    }

    pub fn catalog(&self) -> Arc<PackCatalog> {
        Arc::clone(&self.catalog.borrow())
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    fn inflight_load(&self) -> (u64, InflightLoad) {
        let mut slot = self.inflight.lock().expect("pack registry mutex poisoned");
        if let Some((generation, load)) = slot.as_ref() {
            return (*generation, load.clone());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let source = Arc::clone(&self.source);
        let load = async move {
            let location = source.location();
            match load_bundle(source).await {
                Ok(catalog) => {
                    info!(packs = catalog.len(), source = %location, "rule packs verified");
                    Ok(Arc::new(catalog))
                }
                Err(error) => {
                    warn!(error = %error, source = %location, "rule pack load rejected");
                    Err(Arc::new(error))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some((generation, load.clone()));
        (generation, load)
    }

    fn forget(&self, generation: u64) {
        let mut slot = self.inflight.lock().expect("pack registry mutex poisoned");
        if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
            *slot = None;
        }
    }

    fn publish(&self, catalog: &Arc<PackCatalog>) {
        self.catalog.send_if_modified(|current| {
            if Arc::ptr_eq(current, catalog) {
                false
            } else {
                *current = Arc::clone(catalog);
                true
            }
        });
    }
}

async fn load_bundle(source: Arc<dyn RuleSource>) -> Result<PackCatalog, TrustError> {
    let (manifest_text, signature_text, public_key) = tokio::try_join!(
        fetch(Arc::clone(&source), MANIFEST_FILE),
        fetch(Arc::clone(&source), SIGNATURE_FILE),
        fetch(Arc::clone(&source), PUBLIC_KEY_FILE),
    )?;

    verify_manifest(manifest_text.as_bytes(), &signature_text, &public_key)?;
    let manifest: Manifest = serde_json::from_str(&manifest_text).map_err(TrustError::Manifest)?;
    debug!(entries = manifest.packs.len(), "rule manifest signature verified");

    let mut packs: Vec<RulePack> = Vec::with_capacity(manifest.packs.len());
    for entry in &manifest.packs {
        let text = fetch(Arc::clone(&source), &entry.path).await?;

        if let Some(expected) = entry.expected_checksum() {
            let actual = checksum(text.as_bytes());
            if actual != expected {
                return Err(TrustError::ChecksumMismatch {
                    path: entry.path.clone(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let pack = RulePack::parse(&text, entry).map_err(|source| TrustError::PackFormat {
            path: entry.path.clone(),
            source,
        })?;
        pack.validate_logic()
            .map_err(|source| TrustError::PackLogic {
                pack_id: pack.id.clone(),
                source,
            })?;
        if packs.iter().any(|existing| existing.id == pack.id) {
            return Err(TrustError::DuplicatePack(pack.id));
        }
        debug!(pack_id = %pack.id, version = %pack.version, "rule pack accepted");
        packs.push(pack);
    }

    Ok(PackCatalog::verified(packs, Utc::now()))
}

async fn fetch(source: Arc<dyn RuleSource>, path: &str) -> Result<String, TrustError> {
    let path = path.to_string();
    tokio::task::spawn_blocking(move || source.fetch(&path))
        .await
        .map_err(|error| TrustError::Task(error.to_string()))?
        .map_err(TrustError::from)
}
