//! HTTP speech-to-text adapter.
//!
//! Uploads canonical WAV audio to a recognition service and maps the
//! response into a tagged [`TranscriptionOutcome`]. The concrete backend
//! is whatever speaks this small contract at the configured endpoint.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::domain::TranscriptionOutcome;

use super::TranscriptionProvider;

/// Response from the recognition endpoint.
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    /// Transcribed text; absent or empty when the audio was not understood.
    #[serde(default)]
    text: Option<String>,

    /// Error description from the service, if any.
    #[serde(default)]
    error: Option<String>,
}

/// Speech recognition over HTTP.
pub struct HttpTranscriber {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn recognize_url(&self) -> String {
        format!("{}/recognize", self.base_url)
    }

    async fn request(&self, audio: &Path, language: &str) -> Result<RecognizeResponse, String> {
        let file_name = audio
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| format!("failed to read audio file: {}", e))?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| e.to_string())?;

        let form = Form::new()
            .text("language", language.to_string())
            .part("audio", part);

        let response = self
            .client
            .post(self.recognize_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("recognition request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "recognition service returned {}",
                response.status()
            ));
        }

        response
            .json::<RecognizeResponse>()
            .await
            .map_err(|e| format!("invalid recognition response: {}", e))
    }
}

#[async_trait]
impl TranscriptionProvider for HttpTranscriber {
    async fn transcribe(&self, audio: &Path, language: &str) -> TranscriptionOutcome {
        match self.request(audio, language).await {
            Ok(resp) => {
                if let Some(error) = resp.error {
                    return TranscriptionOutcome::ProviderError(error);
                }
                match resp.text {
                    Some(text) if !text.trim().is_empty() => {
                        TranscriptionOutcome::Text(text.trim().to_string())
                    }
                    _ => TranscriptionOutcome::Unrecognized,
                }
            }
            Err(msg) => TranscriptionOutcome::ProviderError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize_url() {
        let t = HttpTranscriber::new("http://localhost:9000/".to_string());
        assert_eq!(t.recognize_url(), "http://localhost:9000/recognize");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_provider_error() {
        let t = HttpTranscriber::new("http://127.0.0.1:1".to_string());
        let temp = tempfile::tempdir().unwrap();
        let wav = temp.path().join("call.wav");
        tokio::fs::write(&wav, b"riff").await.unwrap();

        let outcome = t.transcribe(&wav, "en-US").await;
        assert!(matches!(outcome, TranscriptionOutcome::ProviderError(_)));
    }
}
