//! Storage error handling
//!
//! Typed errors for engine operations. A full-disk condition is classified
//! separately from every other failure so callers can present the right
//! guidance to the user.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Durable storage is full; user-actionable
    #[error("Storage is full. Free up disk space or delete some data and try again.")]
    QuotaExceeded(#[source] rusqlite::Error),

    /// Any other engine-level failure
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Failed to create the data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Operation named a partition the schema does not define
    #[error("Unknown partition '{0}'")]
    UnknownPartition(String),

    /// Operation not valid for the partition's kind
    #[error("Partition '{partition}' is not a {expected} partition")]
    WrongPartitionKind {
        partition: String,
        expected: &'static str,
    },

    /// Partition has no index with the given name
    #[error("Partition '{partition}' has no index '{index}'")]
    UnknownIndex { partition: String, index: String },

    /// A record put into a record partition must carry a string `id`
    #[error("Record for '{partition}' has no string 'id' field")]
    MissingId { partition: String },

    /// Failed to encode a record as JSON
    #[error("Failed to encode record for '{partition}': {source}")]
    Encode {
        partition: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to decode a stored record
    #[error("Failed to decode record from '{partition}': {source}")]
    Decode {
        partition: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Classify a SQLite error, separating out the quota-exhausted case
    pub fn from_sqlite(error: rusqlite::Error) -> Self {
        if is_storage_full(&error) {
            StorageError::QuotaExceeded(error)
        } else {
            StorageError::Database(error)
        }
    }

    /// Whether this failure means durable storage is out of space
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded(_))
    }
}

/// Check whether a SQLite error indicates a full disk or exhausted quota
fn is_storage_full(error: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(e, _) = error {
        if e.code == rusqlite::ErrorCode::DiskFull {
            return true;
        }
    }
    let msg = error.to_string().to_lowercase();
    msg.contains("database or disk is full") || msg.contains("no space left")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
