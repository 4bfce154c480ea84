//! HTTP ledger client
//!
//! Submissions are raw `application/octet-stream` POSTs authenticated with an
//! `x-api-key` header. Status is a GET with the submission id as a query
//! parameter and comes in one of two shapes:
//!
//! ```text
//! {"state":"Finalized","data":{"block_number":812,"block_hash":"0x…","tx_hash":"0x…"}}
//! {"finalized":true,"block":812,"block_hash":"0x…","extrinsic":"812-3"}
//! ```

use super::Ledger;
use crate::config::SubmitConfig;
use crate::error::{is_retryable_status, LedgerError};
use async_trait::async_trait;
use lensda_common::types::{FinalityRecord, Reference, LEDGER_BLOB_LIMIT};
use lensda_common::ArchiveError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    submission_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatusDetails {
    #[serde(default, alias = "block")]
    block_number: Option<Reference>,
    #[serde(default)]
    block_hash: Option<String>,
    #[serde(default, alias = "extrinsic")]
    tx_hash: Option<Reference>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    finalized: Option<bool>,
    #[serde(default)]
    data: Option<StatusDetails>,
    #[serde(flatten)]
    details: StatusDetails,
}

impl StatusResponse {
    fn into_record(self, submission_id: &str) -> FinalityRecord {
        let finalized = self.finalized.unwrap_or(false)
            || self
                .state
                .as_deref()
                .is_some_and(|state| state.eq_ignore_ascii_case("finalized"));
        let nested = self.data.unwrap_or_default();
        let top = self.details;

        FinalityRecord {
            submission_id: submission_id.to_string(),
            finalized,
            block_reference: nested.block_number.or(top.block_number),
            block_hash: nested.block_hash.or(top.block_hash),
            transaction_reference: nested.tx_hash.or(top.tx_hash),
        }
    }
}

/// Ledger reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: Client,
    submit_url: String,
    status_url: String,
    api_key: String,
    submit_timeout: Duration,
    status_timeout: Duration,
}

impl HttpLedger {
    pub fn new(
        submit_url: impl Into<String>,
        status_url: impl Into<String>,
        api_key: impl Into<String>,
        submit_timeout: Duration,
        status_timeout: Duration,
    ) -> lensda_common::Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ArchiveError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            submit_url: submit_url.into(),
            status_url: status_url.into(),
            api_key: api_key.into(),
            submit_timeout,
            status_timeout,
        })
    }

    pub fn from_config(config: &SubmitConfig) -> lensda_common::Result<Self> {
        Self::new(
            &config.submit_endpoint,
            &config.status_endpoint,
            &config.api_key,
            config.submit_timeout(),
            config.status_timeout(),
        )
    }
}

/// Turn a non-success response into a classified error
async fn check_status(response: Response) -> Result<Response, LedgerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("HTTP {}: {}", status, body.trim());
    if is_retryable_status(status) {
        Err(LedgerError::Retryable(message))
    } else {
        Err(LedgerError::Fatal(message))
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn submit(&self, payload: Vec<u8>) -> Result<String, LedgerError> {
        if payload.len() >= LEDGER_BLOB_LIMIT {
            return Err(LedgerError::fatal(format!(
                "Payload of {} bytes reaches the ledger blob limit of {} bytes",
                payload.len(),
                LEDGER_BLOB_LIMIT
            )));
        }

        let response = self
            .client
            .post(&self.submit_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .timeout(self.submit_timeout)
            .body(payload)
            .send()
            .await?;
        let body = check_status(response).await?.bytes().await?;

        let parsed: SubmitResponse = serde_json::from_slice(&body)
            .map_err(|e| LedgerError::fatal(format!("Malformed submit response: {}", e)))?;
        Ok(parsed.submission_id)
    }

    async fn get_status(&self, submission_id: &str) -> Result<FinalityRecord, LedgerError> {
        let response = self
            .client
            .get(&self.status_url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("submission_id", submission_id)])
            .timeout(self.status_timeout)
            .send()
            .await?;

        // Finality polling treats every failure as transient
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::retryable(format!("HTTP {} from status endpoint", status)));
        }
        let body = response.bytes().await?;

        let parsed: StatusResponse = serde_json::from_slice(&body)
            .map_err(|e| LedgerError::retryable(format!("Malformed status response: {}", e)))?;
        let record = parsed.into_record(submission_id);
        debug!(submission_id, finalized = record.finalized, "Status polled");
        Ok(record)
    }
}
