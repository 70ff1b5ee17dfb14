//! Best-effort translation adapters.
//!
//! Translation failures are always recovered locally: the pipeline
//! analyzes the untranslated text rather than aborting, so these
//! adapters never surface an error.

use async_trait::async_trait;
use serde::Deserialize;

use super::{language_code, TranslationProvider};

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Translation over HTTP (LibreTranslate-shaped API).
pub struct HttpTranslator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTranslator {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn translate_url(&self) -> String {
        format!("{}/translate", self.base_url)
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> Option<String> {
        let response = self
            .client
            .post(self.translate_url())
            .json(&serde_json::json!({
                "q": text,
                "source": language_code(source),
                "target": language_code(target),
            }))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        response
            .json::<TranslateResponse>()
            .await
            .ok()
            .map(|r| r.translated_text)
    }
}

#[async_trait]
impl TranslationProvider for HttpTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> String {
        match self.request(text, source, target).await {
            Some(translated) => translated,
            None => {
                tracing::warn!("Translation failed, analyzing untranslated text");
                text.to_string()
            }
        }
    }
}

/// Identity translator for setups without a translation endpoint.
pub struct NoopTranslator;

#[async_trait]
impl TranslationProvider for NoopTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> String {
        text.to_string()
    }
}
