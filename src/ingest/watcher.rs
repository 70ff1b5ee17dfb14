//! Call recording directory watcher.
//!
//! Subscribes to a single directory (non-recursive) and emits typed
//! create/delete events for audio files. The watcher carries no business
//! logic; deduplication and processing belong to the tracker and the
//! pipeline.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur with the watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Failed to create watch directory {0}: {1}")]
    CreateDirectory(PathBuf, std::io::Error),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// Configuration for the watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Directory to watch for call recordings.
    pub watch_path: PathBuf,

    /// Audio file extensions to accept (case-insensitive).
    pub extensions: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_path: Self::default_watch_path(),
            extensions: ["mp3", "wav", "m4a", "ogg", "webm"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl WatcherConfig {
    /// Default recordings directory (~/CallRecordings).
    pub fn default_watch_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("CallRecordings")
    }

    /// Create the watch directory if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), WatcherError> {
        std::fs::create_dir_all(&self.watch_path)
            .map_err(|e| WatcherError::CreateDirectory(self.watch_path.clone(), e))
    }

    /// Check whether a path carries one of the allowed audio extensions.
    pub fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Kind of filesystem event the pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Deleted,
}

/// A typed event for one audio file.
#[derive(Debug, Clone)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    /// Base name of the file, the pipeline's identity key.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// Handle that keeps the OS subscription alive. Stopping (or dropping)
/// releases the subscription and ends the event stream.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    forwarder: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Release the subscription and wait for the forwarder to drain.
    pub async fn stop(self) {
        drop(self.watcher);
        let _ = self.forwarder.await;
    }
}

/// Directory watcher for incoming call recordings.
pub struct IngestWatcher {
    config: WatcherConfig,
}

impl IngestWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Subscribe to the watch directory.
    ///
    /// Returns a bounded event channel and a handle owning the OS
    /// subscription. Events are forwarded from the notify callback thread
    /// through an unbounded staging channel, so the subscription itself
    /// never blocks on pipeline work; backpressure is applied in the
    /// forwarder task.
    pub fn subscribe(
        &self,
    ) -> Result<(mpsc::Receiver<FileEvent>, WatchHandle), WatcherError> {
        self.config.ensure_exists()?;

        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<FileEvent>();
        let (event_tx, event_rx) = mpsc::channel::<FileEvent>(256);

        let config = self.config.clone();
        let mut watcher = notify::recommended_watcher(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let kind = match event.kind {
                        EventKind::Create(_) => FileEventKind::Created,
                        EventKind::Remove(_) => FileEventKind::Deleted,
                        _ => return,
                    };

                    for path in event.paths {
                        if !config.is_audio_file(&path) {
                            continue;
                        }
                        // Directory events never match the extension
                        // allow-list; creating a directory named *.mp3 is
                        // filtered here.
                        if kind == FileEventKind::Created && path.is_dir() {
                            continue;
                        }
                        let _ = raw_tx.send(FileEvent { kind, path });
                    }
                }
                Err(e) => {
                    tracing::warn!("Watch error: {}", e);
                }
            },
        )?;

        watcher.watch(&self.config.watch_path, RecursiveMode::NonRecursive)?;

        tracing::info!(
            "Watching {} for call recordings",
            self.config.watch_path.display()
        );

        // Forward raw events into the bounded pipeline channel. Exits when
        // the watcher is dropped (staging channel disconnects) or the
        // pipeline stops consuming.
        let forwarder = tokio::task::spawn_blocking(move || {
            while let Ok(event) = raw_rx.recv() {
                if event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        Ok((event_rx, WatchHandle { watcher, forwarder }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_extension_filter_case_insensitive() {
        let config = WatcherConfig::default();

        assert!(config.is_audio_file(Path::new("/tmp/call.mp3")));
        assert!(config.is_audio_file(Path::new("/tmp/call.WAV")));
        assert!(config.is_audio_file(Path::new("/tmp/call.M4a")));
        assert!(config.is_audio_file(Path::new("/tmp/call.ogg")));
        assert!(config.is_audio_file(Path::new("/tmp/call.webm")));

        assert!(!config.is_audio_file(Path::new("/tmp/notes.txt")));
        assert!(!config.is_audio_file(Path::new("/tmp/call.flac")));
        assert!(!config.is_audio_file(Path::new("/tmp/noext")));
    }

    #[test]
    fn test_file_event_filename() {
        let event = FileEvent {
            kind: FileEventKind::Created,
            path: PathBuf::from("/some/dir/call-001.wav"),
        };
        assert_eq!(event.filename(), "call-001.wav");
    }

    #[tokio::test]
    async fn test_subscribe_emits_create_and_delete() {
        let temp = TempDir::new().unwrap();
        let config = WatcherConfig {
            watch_path: temp.path().to_path_buf(),
            ..Default::default()
        };

        let watcher = IngestWatcher::new(config);
        let (mut rx, handle) = watcher.subscribe().unwrap();

        let audio = temp.path().join("incoming.wav");
        tokio::fs::write(&audio, b"riff").await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for create event")
            .expect("channel closed");
        assert_eq!(event.kind, FileEventKind::Created);
        assert_eq!(event.filename(), "incoming.wav");

        tokio::fs::remove_file(&audio).await.unwrap();

        // The same write may surface extra create events; skip until the
        // delete arrives.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let event = tokio::time::timeout_at(deadline, rx.recv())
                .await
                .expect("timed out waiting for delete event")
                .expect("channel closed");
            if event.kind == FileEventKind::Deleted {
                assert_eq!(event.filename(), "incoming.wav");
                break;
            }
        }

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_non_audio_files_ignored() {
        let temp = TempDir::new().unwrap();
        let config = WatcherConfig {
            watch_path: temp.path().to_path_buf(),
            ..Default::default()
        };

        let watcher = IngestWatcher::new(config);
        let (mut rx, handle) = watcher.subscribe().unwrap();

        tokio::fs::write(temp.path().join("notes.txt"), b"text")
            .await
            .unwrap();
        tokio::fs::write(temp.path().join("call.mp3"), b"audio")
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(event.filename(), "call.mp3");

        handle.stop().await;
    }
}
