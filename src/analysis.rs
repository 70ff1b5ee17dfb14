//! Rule-based transcript analysis.
//!
//! Deterministic, local keyword classification of intent, sentiment and
//! action items, plus a bounded head/tail summary. No external calls;
//! translation to the analysis language happens in the pipeline before
//! this stage.

use crate::domain::{Analysis, Intent, Sentiment};

/// Intent keyword lists, checked in priority order. First match wins.
const INTENT_RULES: &[(Intent, &[&str])] = &[
    (
        Intent::SalesPurchase,
        &["buy", "purchase", "order", "price", "cost"],
    ),
    (
        Intent::TechnicalSupport,
        &["problem", "issue", "not working", "broken", "fix", "help"],
    ),
    (
        Intent::ComplaintRefund,
        &["cancel", "refund", "return", "complaint"],
    ),
    (
        Intent::InformationRequest,
        &["information", "details", "tell me", "what is", "how to"],
    ),
    (
        Intent::AppointmentScheduling,
        &["appointment", "schedule", "book", "meeting"],
    ),
];

const POSITIVE_WORDS: &[&str] = &[
    "thank",
    "great",
    "good",
    "excellent",
    "happy",
    "satisfied",
    "love",
    "appreciate",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "angry",
    "frustrated",
    "disappointed",
    "poor",
];

/// Summary excerpt sizes (in characters, not bytes).
const SUMMARY_THRESHOLD: usize = 150;
const SUMMARY_HEAD: usize = 100;
const SUMMARY_TAIL: usize = 50;

/// Analyze a transcript. Pure and deterministic.
pub fn analyze(text: &str) -> Analysis {
    let lower = text.to_lowercase();

    Analysis {
        intent: classify_intent(&lower),
        sentiment: classify_sentiment(&lower),
        action_items: extract_action_items(&lower),
        summary: summarize(text),
    }
}

/// First matching intent category wins; default is General Inquiry.
/// Case-insensitive substring matching against the full text.
fn classify_intent(lower: &str) -> Intent {
    for (intent, keywords) in INTENT_RULES {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return *intent;
        }
    }
    Intent::GeneralInquiry
}

/// Count lexicon words present in the text; strict majority wins,
/// ties (including 0/0) are Neutral.
fn classify_sentiment(lower: &str) -> Sentiment {
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Independent substring checks, all matches included in the order checked.
/// Falls back to a single follow-up item so the list is never empty.
fn extract_action_items(lower: &str) -> Vec<String> {
    let mut items = Vec::new();

    if lower.contains("call back") || lower.contains("callback") {
        items.push("Schedule callback".to_string());
    }
    if lower.contains("email") && (lower.contains("send") || lower.contains("forward")) {
        items.push("Send email with information".to_string());
    }
    if lower.contains("refund") || lower.contains("return") {
        items.push("Process refund/return request".to_string());
    }
    if lower.contains("appointment") || lower.contains("schedule") {
        items.push("Schedule appointment".to_string());
    }

    if items.is_empty() {
        items.push("Follow up with customer".to_string());
    }

    items
}

/// Fixed-width head/tail excerpt for long texts; short texts pass through.
/// Operates on characters so multi-byte input never splits a code point.
fn summarize(text: &str) -> String {
    let char_count = text.chars().count();
    if char_count <= SUMMARY_THRESHOLD {
        return text.to_string();
    }

    let head: String = text.chars().take(SUMMARY_HEAD).collect();
    let tail: String = text
        .chars()
        .skip(char_count - SUMMARY_TAIL)
        .collect();

    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_intent() {
        let analysis = analyze("I want to buy a new phone, price?");
        assert_eq!(analysis.intent, Intent::SalesPurchase);
    }

    #[test]
    fn test_support_intent() {
        let analysis = analyze("This is broken and not working, please help");
        assert_eq!(analysis.intent, Intent::TechnicalSupport);
    }

    #[test]
    fn test_complaint_intent() {
        let analysis = analyze("I demand a refund immediately");
        assert_eq!(analysis.intent, Intent::ComplaintRefund);
    }

    #[test]
    fn test_intent_priority_order() {
        // "price" (sales) outranks "refund" (complaint) regardless of position
        let analysis = analyze("refund the price difference");
        assert_eq!(analysis.intent, Intent::SalesPurchase);
    }

    #[test]
    fn test_default_intent() {
        let analysis = analyze("hello there");
        assert_eq!(analysis.intent, Intent::GeneralInquiry);
    }

    #[test]
    fn test_positive_sentiment() {
        let analysis = analyze("Thank you, great service!");
        assert_eq!(analysis.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_negative_sentiment() {
        let analysis = analyze("This is terrible and I am angry");
        assert_eq!(analysis.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_neutral_on_tie() {
        let analysis = analyze("");
        assert_eq!(analysis.sentiment, Sentiment::Neutral);

        // one positive, one negative word
        let analysis = analyze("good but bad");
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_action_items_accumulate() {
        let analysis = analyze("please call back about the refund and schedule a visit");
        assert_eq!(
            analysis.action_items,
            vec![
                "Schedule callback",
                "Process refund/return request",
                "Schedule appointment",
            ]
        );
    }

    #[test]
    fn test_send_email_requires_both_words() {
        let analysis = analyze("my email is on file");
        assert!(!analysis
            .action_items
            .contains(&"Send email with information".to_string()));

        let analysis = analyze("send me an email");
        assert!(analysis
            .action_items
            .contains(&"Send email with information".to_string()));
    }

    #[test]
    fn test_action_items_never_empty() {
        let analysis = analyze("");
        assert_eq!(analysis.action_items, vec!["Follow up with customer"]);
    }

    #[test]
    fn test_summary_short_passthrough() {
        let text = "short call";
        assert_eq!(analyze(text).summary, text);
    }

    #[test]
    fn test_summary_exactly_at_threshold() {
        let text = "x".repeat(150);
        assert_eq!(analyze(&text).summary, text);
    }

    #[test]
    fn test_summary_head_tail_excerpt() {
        let text: String = ('a'..='z').cycle().take(200).collect();
        let summary = analyze(&text).summary;

        let head: String = text.chars().take(100).collect();
        let tail: String = text.chars().skip(150).collect();
        assert_eq!(summary, format!("{}...{}", head, tail));
        assert_eq!(summary.chars().count(), 153);
    }

    #[test]
    fn test_summary_multibyte_safe() {
        let text = "é".repeat(200);
        let summary = analyze(&text).summary;
        assert_eq!(summary.chars().count(), 153);
    }
}
