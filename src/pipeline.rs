use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::ProgressBar;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{ClassifierSettings, ImportMetadata, Settings};
use crate::db::RecordStore;
use crate::error::{ExportError, PipelineError};
use crate::fetch::Fetcher;
use crate::infer::infer_countries;
use crate::merge::{import_record, CanonicalSet, DuplicatePolicy, ImportOutcome, Resolution};
use crate::model::{CanonicalRecord, Provenance, QualityReport, SourceDocument};
use crate::parser::classify::classify;
use crate::parser::extract::extract;
use crate::quality;
use crate::repair::{self, Enhancement, Repair};

/// One document after the full pipeline.
#[derive(Debug, Clone)]
pub struct Processed {
    pub provenance: Provenance,
    pub record: CanonicalRecord,
    pub repairs: Vec<Repair>,
    pub enhancements: Vec<Enhancement>,
    pub report: QualityReport,
}

/// Classify, extract and infer countries. The record id falls back to the external
/// identifier when the document carries none. Overlay-only fields (uploader, source,
/// attribution, patent status) come back as the record's provenance.
pub fn normalize(doc: &SourceDocument, classifier: &ClassifierSettings) -> (Provenance, CanonicalRecord) {
    let category = classify(doc, classifier);
    let mut partial = extract(category, doc);
    if partial.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        partial.id = Some(doc.external_id.trim().to_string());
    }

    let inferred = infer_countries(
        partial.owner.as_deref().unwrap_or_default(),
        partial.website.as_deref().unwrap_or_default(),
        partial.description.as_deref().unwrap_or_default(),
    );
    let provenance = Provenance::from_partial(category, &partial);
    let record = CanonicalRecord::from_partial(partial, inferred.developed, inferred.deployed);
    (provenance, record)
}

/// Repair, enhance, then score.
pub fn refine(provenance: Provenance, mut record: CanonicalRecord, image_url_base: &str) -> Processed {
    let repairs = repair::repair(&mut record, image_url_base);
    let enhancements = repair::enhance(&mut record);
    let report = quality::score(&record);
    Processed {
        provenance,
        record,
        repairs,
        enhancements,
        report,
    }
}

pub fn process_document(doc: &SourceDocument, settings: &Settings) -> Processed {
    let (provenance, record) = normalize(doc, &settings.classifier);
    refine(provenance, record, &settings.image_url_base.0)
}

// ── Pacing ──

/// Inter-item delay. Injected so tests can record waits instead of sleeping.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, interval: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn wait(&self, interval: Duration) {
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}

// ── Run control ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Stopped,
}

/// Cooperative pause/resume/stop, observed by the runner between items.
#[derive(Clone)]
pub struct BatchControl {
    state: Arc<watch::Sender<RunState>>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunState::Running);
        Self { state: Arc::new(tx) }
    }

    pub fn pause(&self) {
        self.state.send_if_modified(|s| {
            let changed = *s == RunState::Running;
            if changed {
                *s = RunState::Paused;
            }
            changed
        });
    }

    pub fn resume(&self) {
        self.state.send_if_modified(|s| {
            let changed = *s == RunState::Paused;
            if changed {
                *s = RunState::Running;
            }
            changed
        });
    }

    /// Final: a stopped batch cannot be resumed.
    pub fn stop(&self) {
        self.state.send_replace(RunState::Stopped);
    }

    /// Stop in response to a user interrupt. Returns `false` when the batch was already
    /// stopped, so a repeated interrupt can escalate.
    pub fn interrupt(&self) -> bool {
        let was_stopped = self.state.send_replace(RunState::Stopped) == RunState::Stopped;
        !was_stopped
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Wait out a pause. Returns `false` once the batch is stopped.
    async fn proceed(&self, rx: &mut watch::Receiver<RunState>) -> bool {
        match rx.wait_for(|s| *s != RunState::Paused).await {
            Ok(state) => *state == RunState::Running,
            // Sender lives in `self`, so the channel cannot close here
            Err(_) => false,
        }
    }
}

// ── Batch runner ──

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    /// Ids already present in the canonical set.
    pub skipped: Vec<String>,
    /// `(external id, reason)` per failed item, in input order.
    pub failed: Vec<(String, String)>,
    pub processed: Vec<Processed>,
    pub stopped: bool,
}

impl BatchSummary {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Newline-separated failed identifiers, ready to feed back as `--ids-file`.
    pub fn write_failed_ids(&self, path: &Path) -> Result<(), ExportError> {
        let mut body = self.failed_ids().join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        std::fs::write(path, body)?;
        Ok(())
    }
}

/// Sequential fetch → normalize → merge → refine over a list of identifiers.
pub struct BatchRunner<'a> {
    fetcher: &'a dyn Fetcher,
    pacer: &'a dyn Pacer,
    settings: &'a Settings,
    interval: Duration,
    control: BatchControl,
    progress: ProgressBar,
}

impl<'a> BatchRunner<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, pacer: &'a dyn Pacer, settings: &'a Settings) -> Self {
        Self {
            fetcher,
            pacer,
            settings,
            interval: Duration::from_millis(settings.fetch.interval_ms),
            control: BatchControl::new(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Process `ids` in order, admitting new records into `set` (first-seen-wins).
    /// A failing item is recorded and the batch moves on; only an empty id list is fatal.
    pub async fn run(&self, ids: &[String], set: &mut CanonicalSet) -> Result<BatchSummary, PipelineError> {
        if ids.is_empty() {
            return Err(PipelineError::NoIdentifiers);
        }

        let mut summary = BatchSummary::default();
        let mut rx = self.control.state.subscribe();
        self.progress.set_length(ids.len() as u64);

        for (idx, id) in ids.iter().enumerate() {
            if idx > 0 {
                self.pacer.wait(self.interval).await;
            }
            if !self.control.proceed(&mut rx).await {
                info!(done = idx, remaining = ids.len() - idx, "batch stopped");
                summary.stopped = true;
                break;
            }

            let doc = match self.fetcher.fetch(id).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(%id, error = %e, "fetch failed");
                    summary.failed.push((id.clone(), e.to_string()));
                    self.progress.inc(1);
                    continue;
                }
            };

            let (provenance, record) = normalize(&doc, &self.settings.classifier);
            if set.contains(&record.id) {
                debug!(%id, record_id = %record.id, "already in canonical set");
                summary.skipped.push(record.id);
                self.progress.inc(1);
                continue;
            }

            let processed = refine(provenance, record, &self.settings.image_url_base.0);
            debug!(
                %id,
                category = %processed.provenance.category,
                score = processed.report.score,
                repairs = processed.repairs.len(),
                enhancements = processed.enhancements.len(),
                "processed"
            );
            set.admit(processed.record.clone());
            summary.succeeded += 1;
            summary.processed.push(processed);
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "batch finished"
        );
        Ok(summary)
    }
}

// ── Persistence ──

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub overwritten: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
}

/// Hand processed records to the store under `policy`. A store error fails that record
/// only; it is logged to the store's failure table when possible. Fetch failures from the
/// batch are logged there too.
pub fn persist<S, F>(
    store: &mut S,
    processed: &[Processed],
    fetch_failures: &[(String, String)],
    metadata: &ImportMetadata,
    policy: DuplicatePolicy,
    resolve: &mut F,
) -> ImportSummary
where
    S: RecordStore + ?Sized,
    F: FnMut(&CanonicalRecord, &CanonicalRecord) -> Resolution,
{
    let mut summary = ImportSummary::default();
    for Processed { provenance, record, .. } in processed {
        match import_record(store, record, provenance, metadata, policy, resolve) {
            Ok(ImportOutcome::Inserted) => summary.inserted += 1,
            Ok(ImportOutcome::Overwritten) => summary.overwritten += 1,
            Ok(ImportOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                warn!(id = %record.id, error = %e, "import failed");
                if let Err(log_err) = store.log_failure(&record.id, &e.to_string()) {
                    warn!(id = %record.id, error = %log_err, "could not record import failure");
                }
                summary.failed.push(record.id.clone());
            }
        }
    }
    for (id, reason) in fetch_failures {
        if let Err(e) = store.log_failure(id, reason) {
            warn!(%id, error = %e, "could not record fetch failure");
        }
    }
    summary
}

// ── Tests ──
