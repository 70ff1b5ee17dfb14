//! External capability providers.
//!
//! The pipeline consumes speech-to-text and translation through narrow
//! trait interfaces so implementations stay swappable and tests can run
//! without network access.

pub mod speech;
pub mod translate;

use std::path::Path;

use async_trait::async_trait;

use crate::domain::TranscriptionOutcome;

pub use speech::HttpTranscriber;
pub use translate::{HttpTranslator, NoopTranslator};

/// Converts canonical audio to text for a given language hint.
///
/// Failures are tagged outcomes, never `Err`: the pipeline records a
/// placeholder instead of blocking on a broken provider.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, audio: &Path, language: &str) -> TranscriptionOutcome;
}

/// Best-effort translation into the canonical analysis language.
///
/// Never fails: any provider problem returns the input text unchanged.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> String;
}

/// Reduce a locale hint like `en-US` to the bare language code the
/// translation providers expect.
pub(crate) fn language_code(hint: &str) -> &str {
    hint.split('-').next().unwrap_or(hint)
}
