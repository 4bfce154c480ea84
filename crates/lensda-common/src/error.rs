//! Error types for the archiver

use thiserror::Error;

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Main error type shared by the build and submit phases
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch for chunk {chunk_id}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        chunk_id: u64,
        expected: String,
        actual: String,
    },

    /// A single record does not fit into an empty chunk
    #[error(
        "Record from {table} is {size} bytes, larger than the chunk ceiling of {ceiling} bytes"
    )]
    OversizeRecord {
        table: String,
        size: usize,
        ceiling: usize,
    },

    #[error("Manifest is not contiguous: expected chunk {expected}, found chunk {found}")]
    NonContiguousManifest { expected: u64, found: u64 },

    #[error("Invalid manifest line {line}: {reason}")]
    InvalidManifest { line: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ArchiveError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}
