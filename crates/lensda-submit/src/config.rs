//! Submission configuration
//!
//! Loaded from environment variables (a `.env` file is honored by the CLI).
//!
//! | variable | default |
//! |----------|---------|
//! | `LEDGER_TARGET` | `turbo` |
//! | `TURBODA_ENDPOINT` / `TURBODA_KEY` | required for `turbo` |
//! | `HEX_ENDPOINT` / `HEX_KEY` | required for `hex` |
//! | `MAINNET_ENDPOINT` / `MAINNET_KEY` | required for `mainnet` |
//! | `LEDGER_STATUS_ENDPOINT` | derived from the submit endpoint |
//! | `BUILD_DIR` | `build` |
//! | `CONCURRENCY` | 10 |
//! | `MAX_QPS` | 20 |
//! | `SUBMIT_MAX_RETRIES` | 5 |
//! | `SUBMIT_BACKOFF_MS` | 500 |
//! | `SUBMIT_TIMEOUT_SECS` | 30 |
//! | `POLL_INTERVAL_SECS` | 15 |
//! | `POLL_JITTER_SECS` | 3 |
//! | `STATUS_TIMEOUT_SECS` | 10 |
//! | `MAX_TOTAL_BYTES` | unset |

use lensda_common::layout::DEFAULT_BUILD_DIR;
use lensda_common::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_MAX_QPS: u32 = 20;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_MS: u64 = 500;
/// Upper bound for a single backoff sleep
pub const MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_POLL_JITTER_SECS: u64 = 3;
pub const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 10;

/// Path segment of the status call, relative to the submit endpoint
pub const STATUS_PATH_SEGMENT: &str = "get_submission_info";

/// Ledger deployment to submit to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerTarget {
    #[default]
    Turbo,
    Hex,
    Mainnet,
}

impl LedgerTarget {
    /// Prefix of the `<PREFIX>_ENDPOINT` / `<PREFIX>_KEY` variables
    pub fn env_prefix(self) -> &'static str {
        match self {
            LedgerTarget::Turbo => "TURBODA",
            LedgerTarget::Hex => "HEX",
            LedgerTarget::Mainnet => "MAINNET",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerTarget::Turbo => "turbo",
            LedgerTarget::Hex => "hex",
            LedgerTarget::Mainnet => "mainnet",
        }
    }
}

impl FromStr for LedgerTarget {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "turbo" | "turboda" => Ok(LedgerTarget::Turbo),
            "hex" => Ok(LedgerTarget::Hex),
            "mainnet" => Ok(LedgerTarget::Mainnet),
            other => Err(ArchiveError::config(format!("Unknown ledger target: {}", other))),
        }
    }
}

impl std::fmt::Display for LedgerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the submit phase needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    pub target: LedgerTarget,
    pub submit_endpoint: String,
    pub status_endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub build_dir: PathBuf,
    pub concurrency: usize,
    pub max_qps: u32,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub submit_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub poll_jitter_secs: u64,
    pub status_timeout_secs: u64,
    pub max_total_bytes: Option<u64>,
}

impl SubmitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target: LedgerTarget = match lookup("LEDGER_TARGET") {
            Some(value) => value.parse()?,
            None => LedgerTarget::default(),
        };

        let prefix = target.env_prefix();
        let submit_endpoint = lookup(&format!("{}_ENDPOINT", prefix)).unwrap_or_default();
        let api_key = lookup(&format!("{}_KEY", prefix)).unwrap_or_default();
        let status_endpoint = match lookup("LEDGER_STATUS_ENDPOINT") {
            Some(endpoint) => endpoint,
            None => derive_status_endpoint(&submit_endpoint).unwrap_or_default(),
        };

        let config = Self {
            target,
            submit_endpoint,
            status_endpoint,
            api_key,
            build_dir: lookup("BUILD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR)),
            concurrency: parse_or(&lookup, "CONCURRENCY", DEFAULT_CONCURRENCY)?,
            max_qps: parse_or(&lookup, "MAX_QPS", DEFAULT_MAX_QPS)?,
            max_retries: parse_or(&lookup, "SUBMIT_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            initial_backoff_ms: parse_or(&lookup, "SUBMIT_BACKOFF_MS", DEFAULT_BACKOFF_MS)?,
            submit_timeout_secs: parse_or(
                &lookup,
                "SUBMIT_TIMEOUT_SECS",
                DEFAULT_SUBMIT_TIMEOUT_SECS,
            )?,
            poll_interval_secs: parse_or(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            poll_jitter_secs: parse_or(&lookup, "POLL_JITTER_SECS", DEFAULT_POLL_JITTER_SECS)?,
            status_timeout_secs: parse_or(
                &lookup,
                "STATUS_TIMEOUT_SECS",
                DEFAULT_STATUS_TIMEOUT_SECS,
            )?,
            max_total_bytes: lookup("MAX_TOTAL_BYTES")
                .map(|value| parse_value("MAX_TOTAL_BYTES", &value))
                .transpose()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let prefix = self.target.env_prefix();
        if self.submit_endpoint.is_empty() {
            return Err(ArchiveError::config(format!(
                "{}_ENDPOINT must be set for ledger target {}",
                prefix, self.target
            )));
        }
        if self.api_key.is_empty() {
            return Err(ArchiveError::config(format!(
                "{}_KEY must be set for ledger target {}",
                prefix, self.target
            )));
        }
        if self.status_endpoint.is_empty() {
            return Err(ArchiveError::config(
                "Cannot derive a status endpoint; set LEDGER_STATUS_ENDPOINT",
            ));
        }
        if self.concurrency == 0 {
            return Err(ArchiveError::config("CONCURRENCY must be greater than 0"));
        }
        if self.max_qps == 0 {
            return Err(ArchiveError::config("MAX_QPS must be greater than 0"));
        }
        if self.submit_timeout_secs == 0 || self.status_timeout_secs == 0 {
            return Err(ArchiveError::config("Call timeouts must be greater than 0"));
        }
        Ok(())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_jitter(&self) -> Duration {
        Duration::from_secs(self.poll_jitter_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Status endpoint: the submit URL with its last path segment replaced
pub fn derive_status_endpoint(submit_endpoint: &str) -> Option<String> {
    let trimmed = submit_endpoint.trim_end_matches('/');
    let (base, last) = trimmed.rsplit_once('/')?;
    if last.is_empty() || base.ends_with('/') || base.is_empty() {
        return None;
    }
    Some(format!("{}/{}", base, STATUS_PATH_SEGMENT))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ArchiveError::config(format!("Invalid value for {}: {:?}", key, value)))
}
