//! Pipeline coordination for admitted recordings.
//!
//! Runs transcode → transcribe → analyze → persist for each admitted
//! create event, and the inverse flow for deletions. Every external
//! stage is bounded by a timeout so a hung provider can never occupy a
//! dedup slot forever.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::analyze;
use crate::audio::AudioTranscoder;
use crate::config::Config;
use crate::domain::{NewCallRecord, TranscriptionOutcome};
use crate::ingest::{DedupTracker, FileEvent, FileEventKind};
use crate::providers::{TranscriptionProvider, TranslationProvider};
use crate::store::{InsertOutcome, RecordStore};

/// Timing and language knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Wait before reading a newly created file, to avoid racing a
    /// writer that has not finished flushing. A policy, not a
    /// correctness guarantee: later stages tolerate partial files by
    /// failing the attempt.
    pub settle_delay: Duration,

    /// Upper bound for each external stage.
    pub stage_timeout: Duration,

    /// How long in-flight attempts get to reach a terminal state on
    /// shutdown.
    pub shutdown_grace: Duration,

    /// Language hint for transcription.
    pub default_language: String,

    /// Canonical analysis language transcripts are translated into.
    pub analysis_language: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            stage_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(20),
            default_language: "en-US".to_string(),
            analysis_language: "en".to_string(),
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
            default_language: config.default_language.clone(),
            analysis_language: config.analysis_language.clone(),
        }
    }
}

/// Terminal result of one create-event attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The event lost admission (duplicate notification or already done).
    NotAdmitted,

    /// A record for this filename already existed; idempotent skip.
    AlreadyRecorded,

    /// A record was persisted with the given store id.
    Recorded { id: i64 },

    /// The attempt failed; in-flight state was cleared so a later
    /// create event can retry.
    Failed { reason: String },
}

/// Orchestrates the ingestion pipeline for one watched directory.
pub struct PipelineCoordinator {
    config: PipelineConfig,
    tracker: Arc<DedupTracker>,
    transcoder: AudioTranscoder,
    transcriber: Arc<dyn TranscriptionProvider>,
    translator: Arc<dyn TranslationProvider>,
    store: Arc<dyn RecordStore>,
}

impl PipelineCoordinator {
    pub fn new(
        config: PipelineConfig,
        transcriber: Arc<dyn TranscriptionProvider>,
        translator: Arc<dyn TranslationProvider>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            tracker: Arc::new(DedupTracker::new()),
            transcoder: AudioTranscoder::new(),
            transcriber,
            translator,
            store,
        }
    }

    pub fn tracker(&self) -> Arc<DedupTracker> {
        Arc::clone(&self.tracker)
    }

    /// Consume watcher events until the stream closes, spawning an
    /// independent task per admitted create so a slow transcription for
    /// one file never blocks ingestion of others. After the stream ends,
    /// in-flight attempts get the configured grace period before being
    /// aborted.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<FileEvent>) {
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => self.dispatch(event, &mut tasks),
                        None => break,
                    }
                }
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        if tasks.is_empty() {
            return;
        }

        info!("Event stream closed, draining in-flight attempts");
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if timeout(self.config.shutdown_grace, drain).await.is_err() {
            warn!("Shutdown grace period elapsed, aborting remaining attempts");
            tasks.shutdown().await;
        }
    }

    fn dispatch(self: &Arc<Self>, event: FileEvent, tasks: &mut JoinSet<()>) {
        let coordinator = Arc::clone(self);
        match event.kind {
            FileEventKind::Created => {
                tasks.spawn(async move {
                    coordinator.handle_created(event.path).await;
                });
            }
            FileEventKind::Deleted => {
                tasks.spawn(async move {
                    coordinator.handle_deleted(&event.path).await;
                });
            }
        }
    }

    /// Full create-event flow: admission, settle delay, then the staged
    /// attempt.
    pub async fn handle_created(&self, path: PathBuf) -> PipelineOutcome {
        let filename = base_name(&path);
        if filename.is_empty() {
            return PipelineOutcome::NotAdmitted;
        }

        if !self.tracker.admit_create(&filename) {
            debug!(%filename, "Duplicate create event dropped");
            return PipelineOutcome::NotAdmitted;
        }

        info!(%filename, "New recording admitted");
        tokio::time::sleep(self.config.settle_delay).await;

        let outcome = self.run_attempt(&path, &filename).await;
        self.finish_attempt(&filename, &outcome);
        outcome
    }

    /// Manual flow: same stages, driven by direct user action instead of
    /// a filesystem event, with no settle delay. Shares admission with
    /// the watcher path so the two cannot double-process a filename.
    pub async fn process_file(&self, path: &Path) -> PipelineOutcome {
        let filename = base_name(path);
        if filename.is_empty() || !self.tracker.admit_create(&filename) {
            return PipelineOutcome::NotAdmitted;
        }

        let outcome = self.run_attempt(path, &filename).await;
        self.finish_attempt(&filename, &outcome);
        outcome
    }

    /// Deletion flow: no state machine. Remove the record (absence is
    /// fine), then unconditionally clear tracker state so a future
    /// create event is processed fresh.
    pub async fn handle_deleted(&self, path: &Path) {
        let filename = base_name(path);
        if filename.is_empty() {
            return;
        }

        match timeout(
            self.config.stage_timeout,
            self.store.delete_by_filename(&filename),
        )
        .await
        {
            Ok(Ok(())) => info!(%filename, "Record removed for deleted recording"),
            Ok(Err(e)) => warn!(%filename, "Failed to remove record: {}", e),
            Err(_) => warn!(%filename, "Record removal timed out"),
        }

        self.tracker.on_deleted(&filename);
    }

    fn finish_attempt(&self, filename: &str, outcome: &PipelineOutcome) {
        match outcome {
            PipelineOutcome::Recorded { id } => {
                info!(%filename, id, "Recording processed");
                self.tracker.mark_completed(filename);
            }
            PipelineOutcome::AlreadyRecorded => {
                debug!(%filename, "Already in store, skipping");
                self.tracker.mark_completed(filename);
            }
            PipelineOutcome::Failed { reason } => {
                warn!(%filename, "Attempt failed: {}", reason);
                self.tracker.mark_failed(filename);
            }
            PipelineOutcome::NotAdmitted => {}
        }
    }

    /// One staged attempt: pre-check → transcode → transcribe →
    /// analyze → persist.
    async fn run_attempt(&self, path: &Path, filename: &str) -> PipelineOutcome {
        // Idempotent pre-check before any audio work.
        match timeout(
            self.config.stage_timeout,
            self.store.find_by_filename(filename),
        )
        .await
        {
            Ok(Ok(Some(_))) => return PipelineOutcome::AlreadyRecorded,
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                return PipelineOutcome::Failed {
                    reason: format!("store pre-check failed: {}", e),
                }
            }
            Err(_) => {
                return PipelineOutcome::Failed {
                    reason: "store pre-check timed out".to_string(),
                }
            }
        }

        // Transcode failure is non-fatal to the pipeline: the reason is
        // persisted as the transcript placeholder and the attempt ends
        // failed instead of aborting silently.
        let mut transcode_failure: Option<String> = None;

        let outcome = match timeout(
            self.config.stage_timeout,
            self.transcoder.to_canonical(path),
        )
        .await
        {
            Ok(Ok(canonical)) => {
                debug!(%filename, "Transcribing");
                match timeout(
                    self.config.stage_timeout,
                    self.transcriber
                        .transcribe(canonical.path(), &self.config.default_language),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        TranscriptionOutcome::ProviderError("transcription timed out".to_string())
                    }
                }
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                transcode_failure = Some(reason.clone());
                TranscriptionOutcome::ProviderError(reason)
            }
            Err(_) => {
                let reason = "transcode timed out".to_string();
                transcode_failure = Some(reason.clone());
                TranscriptionOutcome::ProviderError(reason)
            }
        };

        let transcribed_text = outcome.record_text();

        // Analysis runs on the translated transcript when one exists;
        // placeholder outcomes are analyzed as-is.
        let analysis_text = match &outcome {
            TranscriptionOutcome::Text(text) => {
                match timeout(
                    self.config.stage_timeout,
                    self.translator
                        .translate(text, "auto", &self.config.analysis_language),
                )
                .await
                {
                    Ok(translated) => translated,
                    Err(_) => {
                        warn!(%filename, "Translation timed out, analyzing untranslated text");
                        text.clone()
                    }
                }
            }
            _ => transcribed_text.clone(),
        };

        let record = NewCallRecord {
            filename: filename.to_string(),
            transcribed_text,
            analysis: analyze(&analysis_text),
            language: self.config.default_language.clone(),
        };

        let persisted = match timeout(self.config.stage_timeout, self.store.insert(record)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                return PipelineOutcome::Failed {
                    reason: format!("store insert failed: {}", e),
                }
            }
            Err(_) => {
                return PipelineOutcome::Failed {
                    reason: "store insert timed out".to_string(),
                }
            }
        };

        if let Some(reason) = transcode_failure {
            // The degraded record is in the store; the attempt itself is
            // still a failure so a retriggered create event can retry.
            return PipelineOutcome::Failed {
                reason: format!("transcode failed: {}", reason),
            };
        }

        match persisted {
            InsertOutcome::Inserted(id) => PipelineOutcome::Recorded { id },
            InsertOutcome::AlreadyPresent(_) => PipelineOutcome::AlreadyRecorded,
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
