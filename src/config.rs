//! Configuration for callwatch.
//!
//! Sources (highest priority first):
//! 1. Environment variables (CALLWATCH_HOME, CALLWATCH_WATCH_DIR,
//!    DEFAULT_LANGUAGE, SPEECH_ENDPOINT, TRANSLATE_ENDPOINT)
//! 2. Config file ($CALLWATCH_HOME/config.yaml)
//! 3. Defaults (~/.callwatch, ~/CallRecordings)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ingest::WatcherConfig;

/// Raw config file schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub watch_dir: Option<String>,
    pub database: Option<String>,
    pub default_language: Option<String>,
    pub analysis_language: Option<String>,
    pub settle_delay_secs: Option<u64>,
    pub stage_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
    pub speech_endpoint: Option<String>,
    pub translate_endpoint: Option<String>,
}

/// Resolved configuration with absolute paths and defaults applied.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory observed for new recordings.
    pub watch_dir: PathBuf,

    /// SQLite database path.
    pub database: PathBuf,

    /// Language hint passed to the transcription provider.
    pub default_language: String,

    /// Canonical language transcripts are translated into for analysis.
    pub analysis_language: String,

    /// Wait before reading a newly created file.
    pub settle_delay_secs: u64,

    /// Upper bound per external stage (transcode, transcribe, translate,
    /// store).
    pub stage_timeout_secs: u64,

    /// How long in-flight attempts get to finish on shutdown.
    pub shutdown_grace_secs: u64,

    /// Speech recognition service base URL.
    pub speech_endpoint: String,

    /// Translation service base URL, if any.
    pub translate_endpoint: Option<String>,
}

/// Engine state directory ($CALLWATCH_HOME or ~/.callwatch).
pub fn callwatch_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("CALLWATCH_HOME") {
        return Ok(PathBuf::from(home));
    }
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".callwatch"))
}

impl Config {
    /// Load configuration from file, environment and defaults.
    pub fn load() -> Result<Self> {
        let home = callwatch_home()?;

        let file = Self::load_file(&home.join("config.yaml"))?.unwrap_or_default();

        let watch_dir = std::env::var("CALLWATCH_WATCH_DIR")
            .ok()
            .or(file.watch_dir)
            .map(PathBuf::from)
            .unwrap_or_else(WatcherConfig::default_watch_path);

        let database = file
            .database
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("records.db"));

        let default_language = std::env::var("DEFAULT_LANGUAGE")
            .ok()
            .or(file.default_language)
            .unwrap_or_else(|| "en-US".to_string());

        let speech_endpoint = std::env::var("SPEECH_ENDPOINT")
            .ok()
            .or(file.speech_endpoint)
            .unwrap_or_else(|| "http://localhost:9000".to_string());

        let translate_endpoint = std::env::var("TRANSLATE_ENDPOINT")
            .ok()
            .or(file.translate_endpoint);

        Ok(Self {
            watch_dir,
            database,
            default_language,
            analysis_language: file.analysis_language.unwrap_or_else(|| "en".to_string()),
            settle_delay_secs: file.settle_delay_secs.unwrap_or(2),
            stage_timeout_secs: file.stage_timeout_secs.unwrap_or(60),
            shutdown_grace_secs: file.shutdown_grace_secs.unwrap_or(20),
            speech_endpoint,
            translate_endpoint,
        })
    }

    fn load_file(path: &PathBuf) -> Result<Option<ConfigFile>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let parsed = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(Some(parsed))
    }

    /// Watcher configuration derived from this config.
    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            watch_path: self.watch_dir.clone(),
            ..Default::default()
        }
    }
}
