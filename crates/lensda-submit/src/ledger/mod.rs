//! Ledger collaborator
//!
//! The scheduler only talks to the ledger through [`Ledger`]; the HTTP client
//! in [`http`] is the production implementation.

pub mod http;

use crate::error::LedgerError;
use async_trait::async_trait;
use lensda_common::types::FinalityRecord;

pub use http::HttpLedger;

/// Data-availability ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit one chunk, returning the ledger's submission id
    async fn submit(&self, payload: Vec<u8>) -> Result<String, LedgerError>;

    /// Current finality state of a submission
    async fn get_status(&self, submission_id: &str) -> Result<FinalityRecord, LedgerError>;
}
