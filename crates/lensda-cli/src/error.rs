//! Error types for the Lens DA CLI
//!
//! Library errors are wrapped with a hint on what to run next.

use lensda_common::ArchiveError;
use lensda_submit::SubmitError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// No manifest in the build directory
    #[error("No manifest at '{0}'. Run 'lensda build' first or pass --build-dir.")]
    ManifestNotFound(String),

    /// Chunk files disagree with the manifest
    #[error("{failed} of {total} chunks failed verification. Rebuild with 'lensda build' before submitting.")]
    VerificationFailed { failed: usize, total: usize },

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the run was stopped by Ctrl-C
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CliError::Submit(SubmitError::Cancelled))
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() {
            130
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensda_submit::LedgerError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::from(SubmitError::Cancelled).exit_code(), 130);
        assert_eq!(CliError::config("x").exit_code(), 1);
    }

    #[test]
    fn test_fatal_submission_names_the_chunk() {
        let err = CliError::from(SubmitError::FatalSubmission {
            chunk_id: 42,
            source: LedgerError::fatal("HTTP 400: bad blob"),
        });
        assert!(err.to_string().contains("chunk 42"));
        assert_eq!(err.exit_code(), 1);
    }
}
