//! Data structures for the ingestion pipeline.
//!
//! The durable unit of work product is the [`CallRecord`]; its `filename`
//! (base name of the source audio file) is the identity and deduplication
//! key across the pipeline and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A durable call record as stored in the record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Store-assigned identifier, immutable once assigned.
    pub id: i64,

    /// Creation time of the record (set at persistence time).
    pub timestamp: DateTime<Utc>,

    /// Base name of the source audio file. At most one live record
    /// exists per filename.
    pub filename: String,

    /// Raw speech-to-text output, possibly a placeholder string.
    pub transcribed_text: String,

    /// Rule-based analysis of the transcript.
    pub analysis: Analysis,

    /// Language hint that was used for transcription.
    pub language: String,
}

/// A record the pipeline has built but the store has not yet assigned
/// an id or timestamp to.
#[derive(Debug, Clone)]
pub struct NewCallRecord {
    pub filename: String,
    pub transcribed_text: String,
    pub analysis: Analysis,
    pub language: String,
}

/// Structured analysis result produced by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub intent: Intent,
    pub sentiment: Sentiment,

    /// Ordered list of short follow-up items. Never empty.
    pub action_items: Vec<String>,

    /// Bounded-length excerpt of the analyzed text.
    pub summary: String,
}

/// Caller intent category, checked in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SalesPurchase,
    TechnicalSupport,
    ComplaintRefund,
    InformationRequest,
    AppointmentScheduling,
    GeneralInquiry,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Intent::SalesPurchase => "Sales/Purchase Inquiry",
            Intent::TechnicalSupport => "Technical Support",
            Intent::ComplaintRefund => "Complaint/Refund Request",
            Intent::InformationRequest => "Information Request",
            Intent::AppointmentScheduling => "Appointment/Scheduling",
            Intent::GeneralInquiry => "General Inquiry",
        };
        f.write_str(label)
    }
}

/// Overall sentiment of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        };
        f.write_str(label)
    }
}

/// Outcome of a transcription attempt.
///
/// Failures are carried as data so the pipeline and tests can branch on
/// outcome kind; conversion to a display string happens only at the
/// persistence boundary via [`TranscriptionOutcome::record_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    /// Successful transcription.
    Text(String),

    /// Audio was present but the provider could not understand it.
    /// A valid outcome, not an error.
    Unrecognized,

    /// The provider was unavailable or returned an error.
    ProviderError(String),
}

impl TranscriptionOutcome {
    /// The text that gets persisted for this outcome.
    pub fn record_text(&self) -> String {
        match self {
            TranscriptionOutcome::Text(text) => text.clone(),
            TranscriptionOutcome::Unrecognized => "Could not understand the audio".to_string(),
            TranscriptionOutcome::ProviderError(msg) => format!("Error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_labels() {
        assert_eq!(Intent::SalesPurchase.to_string(), "Sales/Purchase Inquiry");
        assert_eq!(Intent::GeneralInquiry.to_string(), "General Inquiry");
    }

    #[test]
    fn test_outcome_record_text() {
        assert_eq!(
            TranscriptionOutcome::Text("hello".into()).record_text(),
            "hello"
        );
        assert_eq!(
            TranscriptionOutcome::Unrecognized.record_text(),
            "Could not understand the audio"
        );
        assert_eq!(
            TranscriptionOutcome::ProviderError("service down".into()).record_text(),
            "Error: service down"
        );
    }
}
