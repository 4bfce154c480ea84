//! Lens DA Submit Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Concurrent, rate-limited, resumable submission of built chunks to a
//! data-availability ledger.
//!
//! # Components
//!
//! - **Ledger**: the `Ledger` trait and its HTTP client
//! - **Rate limit**: one `governor` limiter shared by every worker
//! - **Retry**: bounded exponential backoff for transient submit failures
//! - **Finality**: jittered polling until the ledger reports a submission final
//! - **Reorder**: releases out-of-order results in chunk-id order
//! - **Progress**: the append-only log a resumed run starts from
//! - **Scheduler**: the bounded worker pool tying the above together
//!
//! # Example
//!
//! ```no_run
//! use lensda_common::manifest::Manifest;
//! use lensda_submit::{HttpLedger, ProgressLog, SchedulerSettings, SubmissionScheduler, SubmitConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SubmitConfig::from_env()?;
//!     let ledger = Arc::new(HttpLedger::from_config(&config)?);
//!     let manifest = Manifest::load("build/manifest.ndjson")?;
//!     let mut progress = ProgressLog::open("build/uploaded.ndjson")?;
//!
//!     let scheduler = SubmissionScheduler::new(ledger, SchedulerSettings::from_config(&config));
//!     let summary = scheduler.run(&manifest, &mut progress).await?;
//!     println!("{} chunks committed", summary.committed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod finality;
pub mod ledger;
pub mod progress;
pub mod rate_limit;
pub mod reorder;
pub mod retry;
pub mod scheduler;

pub use config::{LedgerTarget, SubmitConfig};
pub use error::{LedgerError, Result, SubmitError};
pub use finality::{FinalityTracker, PollSchedule};
pub use ledger::{HttpLedger, Ledger};
pub use progress::{ProgressLog, ProgressSnapshot};
pub use rate_limit::RateLimiter;
pub use reorder::ReorderBuffer;
pub use retry::{submit_with_retry, RetryPolicy};
pub use scheduler::{RunSummary, SchedulerSettings, SubmissionPlan, SubmissionScheduler};
