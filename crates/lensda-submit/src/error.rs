//! Error types for the submit phase

use lensda_common::ArchiveError;
use thiserror::Error;

/// Result type alias for submit operations
pub type Result<T> = std::result::Result<T, SubmitError>;

/// Failure reported by a ledger call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Network error, HTTP 429 or 5xx: worth another attempt
    #[error("Retryable ledger error: {0}")]
    Retryable(String),

    /// Anything else: retrying will not help
    #[error("Fatal ledger error: {0}")]
    Fatal(String),
}

impl LedgerError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Retryable(_))
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return LedgerError::Fatal(err.to_string());
        }
        match err.status() {
            Some(status) if !is_retryable_status(status) => LedgerError::Fatal(err.to_string()),
            _ => LedgerError::Retryable(err.to_string()),
        }
    }
}

/// 429 and 5xx are transient; every other failure status is not
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Errors that stop the scheduler
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Submission of chunk {chunk_id} failed: {source}")]
    FatalSubmission {
        chunk_id: u64,
        #[source]
        source: LedgerError,
    },

    /// Local failure while handling one chunk (reading it, committing it)
    #[error("Chunk {chunk_id}: {source}")]
    Chunk {
        chunk_id: u64,
        #[source]
        source: ArchiveError,
    },

    #[error("Submission cancelled")]
    Cancelled,
}

impl SubmitError {
    /// Chunk the failure belongs to, when there is one
    pub fn chunk_id(&self) -> Option<u64> {
        match self {
            SubmitError::FatalSubmission { chunk_id, .. } | SubmitError::Chunk { chunk_id, .. } => {
                Some(*chunk_id)
            }
            SubmitError::Archive(ArchiveError::ChecksumMismatch { chunk_id, .. }) => Some(*chunk_id),
            _ => None,
        }
    }

    pub fn chunk(chunk_id: u64, source: impl Into<ArchiveError>) -> Self {
        SubmitError::Chunk {
            chunk_id,
            source: source.into(),
        }
    }
}
