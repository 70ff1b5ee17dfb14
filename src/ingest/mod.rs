//! Filesystem ingestion: watcher and deduplication tracking.
//!
//! 1. **Watcher**: emits typed create/delete events for audio files in
//!    the configured directory
//! 2. **Tracker**: admits each filename for processing exactly once per
//!    epoch, collapsing duplicate notifications
//!
//! ```text
//! CallRecordings/ → IngestWatcher → DedupTracker → PipelineCoordinator
//! ```

pub mod tracker;
pub mod watcher;

pub use tracker::DedupTracker;
pub use watcher::{FileEvent, FileEventKind, IngestWatcher, WatchHandle, WatcherConfig, WatcherError};
