//! Durable keyed storage for call records.
//!
//! The store is consumed through a narrow trait so the pipeline and its
//! tests do not care whether records land in SQLite or a mock.

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CallRecord, NewCallRecord};

pub use sqlite::SqliteStore;

/// Errors from the record store. The only failure class that aborts a
/// pipeline attempt without writing a record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Corrupt record {filename}: {reason}")]
    CorruptRecord { filename: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result of an insert attempt. Creating a record for a filename that
/// already has one is a no-op, never an overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was written with the assigned id.
    Inserted(i64),

    /// A live record for this filename already existed.
    AlreadyPresent(i64),
}

impl InsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::AlreadyPresent(id) => *id,
        }
    }
}

/// Filter for listing records (the contract the manual front-end relies on).
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Case-insensitive substring over filename and transcript.
    pub query: Option<String>,

    /// Single day, `YYYY-MM-DD`.
    pub date: Option<String>,

    /// Maximum number of rows, newest first.
    pub limit: Option<usize>,
}

/// Durable keyed call-record storage.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the live record for a filename, if any.
    async fn find_by_filename(&self, filename: &str) -> Result<Option<CallRecord>, StoreError>;

    /// Insert a record; a duplicate filename is reported, not overwritten.
    async fn insert(&self, record: NewCallRecord) -> Result<InsertOutcome, StoreError>;

    /// Remove the record for a filename. Absence is not an error.
    async fn delete_by_filename(&self, filename: &str) -> Result<(), StoreError>;

    /// List records matching a filter, newest first.
    async fn search(&self, filter: &RecordFilter) -> Result<Vec<CallRecord>, StoreError>;
}
