//! SQLite-backed record store.
//!
//! One table keyed by filename with a UNIQUE constraint carrying the
//! at-most-one-live-record invariant. The connection sits behind a
//! mutex held only for the duration of a statement; all calls are fast
//! local operations.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{Analysis, CallRecord, Intent, NewCallRecord, Sentiment};

use super::{InsertOutcome, RecordFilter, RecordStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS call_records (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp         TEXT NOT NULL,
    filename          TEXT NOT NULL UNIQUE,
    transcribed_text  TEXT NOT NULL,
    intent            TEXT NOT NULL,
    sentiment         TEXT NOT NULL,
    action_items      TEXT NOT NULL,
    summary           TEXT NOT NULL,
    language          TEXT NOT NULL
);
";

/// SQLite implementation of the record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_record(row: &Row<'_>) -> Result<CallRecord, rusqlite::Error> {
        let timestamp: String = row.get("timestamp")?;
        let intent: String = row.get("intent")?;
        let sentiment: String = row.get("sentiment")?;
        let action_items: String = row.get("action_items")?;

        Ok(CallRecord {
            id: row.get("id")?,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            filename: row.get("filename")?,
            transcribed_text: row.get("transcribed_text")?,
            analysis: Analysis {
                intent: serde_json::from_str::<Intent>(&intent)
                    .unwrap_or(Intent::GeneralInquiry),
                sentiment: serde_json::from_str::<Sentiment>(&sentiment)
                    .unwrap_or(Sentiment::Neutral),
                action_items: serde_json::from_str(&action_items).unwrap_or_default(),
                summary: row.get("summary")?,
            },
            language: row.get("language")?,
        })
    }
}

/// Escape LIKE metacharacters so user queries match substrings literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find_by_filename(&self, filename: &str) -> Result<Option<CallRecord>, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let record = conn
            .query_row(
                "SELECT * FROM call_records WHERE filename = ?1",
                params![filename],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    async fn insert(&self, record: NewCallRecord) -> Result<InsertOutcome, StoreError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let intent = serde_json::to_string(&record.analysis.intent)
            .map_err(|e| StoreError::CorruptRecord {
                filename: record.filename.clone(),
                reason: e.to_string(),
            })?;
        let sentiment = serde_json::to_string(&record.analysis.sentiment)
            .map_err(|e| StoreError::CorruptRecord {
                filename: record.filename.clone(),
                reason: e.to_string(),
            })?;
        let action_items = serde_json::to_string(&record.analysis.action_items)
            .map_err(|e| StoreError::CorruptRecord {
                filename: record.filename.clone(),
                reason: e.to_string(),
            })?;

        let conn = self.conn.lock().expect("store lock poisoned");
        let inserted = conn.execute(
            "INSERT INTO call_records
                 (timestamp, filename, transcribed_text, intent, sentiment,
                  action_items, summary, language)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(filename) DO NOTHING",
            params![
                timestamp,
                record.filename,
                record.transcribed_text,
                intent,
                sentiment,
                action_items,
                record.analysis.summary,
                record.language,
            ],
        )?;

        if inserted > 0 {
            return Ok(InsertOutcome::Inserted(conn.last_insert_rowid()));
        }

        // The lock serializes writers, so the conflicting row is still there.
        let existing: i64 = conn.query_row(
            "SELECT id FROM call_records WHERE filename = ?1",
            params![record.filename],
            |row| row.get(0),
        )?;
        Ok(InsertOutcome::AlreadyPresent(existing))
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "DELETE FROM call_records WHERE filename = ?1",
            params![filename],
        )?;
        Ok(())
    }

    async fn search(&self, filter: &RecordFilter) -> Result<Vec<CallRecord>, StoreError> {
        let mut sql = String::from("SELECT * FROM call_records WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(ref query) = filter.query {
            sql.push_str(
                r" AND (filename LIKE '%' || ? || '%' ESCAPE '\'
                   OR transcribed_text LIKE '%' || ? || '%' ESCAPE '\')",
            );
            let escaped = escape_like(query);
            bindings.push(escaped.clone());
            bindings.push(escaped);
        }

        if let Some(ref date) = filter.date {
            // Timestamps are RFC 3339, so the date is a plain prefix.
            sql.push_str(r" AND timestamp LIKE ? || '%' ESCAPE '\'");
            bindings.push(escape_like(date));
        }

        sql.push_str(" ORDER BY timestamp DESC, id DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(bindings.iter()),
            Self::row_to_record,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;

    fn sample(filename: &str, text: &str) -> NewCallRecord {
        NewCallRecord {
            filename: filename.to_string(),
            transcribed_text: text.to_string(),
            analysis: analyze(text),
            language: "en-US".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = SqliteStore::open_in_memory().unwrap();

        let outcome = store
            .insert(sample("call.wav", "I want to buy a phone"))
            .await
            .unwrap();
        let id = match outcome {
            InsertOutcome::Inserted(id) => id,
            other => panic!("expected fresh insert, got {:?}", other),
        };

        let record = store.find_by_filename("call.wav").await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.filename, "call.wav");
        assert_eq!(record.analysis.intent, Intent::SalesPurchase);
        assert!(!record.analysis.action_items.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_noop() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store
            .insert(sample("call.wav", "original transcript"))
            .await
            .unwrap();
        let second = store
            .insert(sample("call.wav", "different transcript"))
            .await
            .unwrap();

        assert!(matches!(second, InsertOutcome::AlreadyPresent(_)));
        assert_eq!(first.id(), second.id());

        // Original content preserved, not overwritten
        let record = store.find_by_filename("call.wav").await.unwrap().unwrap();
        assert_eq!(record.transcribed_text, "original transcript");
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.insert(sample("call.wav", "hello")).await.unwrap();
        store.delete_by_filename("call.wav").await.unwrap();
        assert!(store.find_by_filename("call.wav").await.unwrap().is_none());

        // Deleting again (or something never present) is fine
        store.delete_by_filename("call.wav").await.unwrap();
        store.delete_by_filename("ghost.mp3").await.unwrap();
    }

    #[tokio::test]
    async fn test_reinsert_after_delete() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.insert(sample("call.wav", "first epoch")).await.unwrap();
        store.delete_by_filename("call.wav").await.unwrap();

        let outcome = store
            .insert(sample("call.wav", "second epoch"))
            .await
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));

        let record = store.find_by_filename("call.wav").await.unwrap().unwrap();
        assert_eq!(record.transcribed_text, "second epoch");
    }

    #[tokio::test]
    async fn test_search_by_substring() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .insert(sample("sales-call.wav", "I want to buy a phone"))
            .await
            .unwrap();
        store
            .insert(sample("support-call.wav", "my router is broken"))
            .await
            .unwrap();

        let filter = RecordFilter {
            query: Some("broken".to_string()),
            ..Default::default()
        };
        let results = store.search(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "support-call.wav");

        let filter = RecordFilter {
            query: Some("CALL".to_string()),
            ..Default::default()
        };
        assert_eq!(store.search(&filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .insert(sample("promo.wav", "we offer a 100% refund"))
            .await
            .unwrap();
        store
            .insert(sample("stats.wav", "the 1000 series launch"))
            .await
            .unwrap();
        store.insert(sample("call_1.wav", "plain talk")).await.unwrap();
        store.insert(sample("callX1.wav", "more talk")).await.unwrap();

        // '%' in the query matches itself, not any run of characters
        let filter = RecordFilter {
            query: Some("100%".to_string()),
            ..Default::default()
        };
        let results = store.search(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "promo.wav");

        // '_' in the query matches itself, not any single character
        let filter = RecordFilter {
            query: Some("call_1".to_string()),
            ..Default::default()
        };
        let results = store.search(&filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "call_1.wav");
    }

    #[tokio::test]
    async fn test_search_by_date_and_limit() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.insert(sample("a.wav", "one")).await.unwrap();
        store.insert(sample("b.wav", "two")).await.unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let filter = RecordFilter {
            date: Some(today),
            ..Default::default()
        };
        assert_eq!(store.search(&filter).await.unwrap().len(), 2);

        let filter = RecordFilter {
            date: Some("1999-01-01".to_string()),
            ..Default::default()
        };
        assert!(store.search(&filter).await.unwrap().is_empty());

        let filter = RecordFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(store.search(&filter).await.unwrap().len(), 1);
    }
}
