//! callwatch - automated call-recording ingestion and annotation pipeline
//!
//! Watches a directory for dropped audio recordings, transcribes them,
//! enriches the transcript with rule-based intent/sentiment/action-item
//! analysis, and synchronizes the result into a durable record store -
//! staying consistent under duplicate events, partial failures, and
//! concurrent creation/deletion.
//!
//! # Architecture
//!
//! ```text
//! CallRecordings/ → IngestWatcher → DedupTracker → PipelineCoordinator
//!                                                    ├── AudioTranscoder (ffmpeg)
//!                                                    ├── TranscriptionProvider
//!                                                    ├── TranslationProvider
//!                                                    ├── AnalysisEngine
//!                                                    └── RecordStore (SQLite)
//! ```
//!
//! Each admitted filename is processed by an independent task; the
//! deduplication tracker guarantees one attempt per filename per epoch,
//! and the store's filename uniqueness makes persistence idempotent.
//!
//! # Modules
//!
//! - `ingest`: directory watcher and deduplication tracking
//! - `pipeline`: per-file orchestration and deletion handling
//! - `analysis`: deterministic keyword-based transcript analysis
//! - `audio`: ffmpeg normalization into canonical WAV
//! - `providers`: transcription/translation capability adapters
//! - `store`: durable call-record storage
//! - `cli`: command-line interface

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod pipeline;
pub mod providers;
pub mod store;

// Re-export main types at crate root for convenience
pub use analysis::analyze;
pub use domain::{Analysis, CallRecord, Intent, NewCallRecord, Sentiment, TranscriptionOutcome};
pub use ingest::{DedupTracker, FileEvent, FileEventKind, IngestWatcher, WatcherConfig};
pub use pipeline::{PipelineConfig, PipelineCoordinator, PipelineOutcome};
pub use providers::{TranscriptionProvider, TranslationProvider};
pub use store::{InsertOutcome, RecordFilter, RecordStore, SqliteStore, StoreError};
