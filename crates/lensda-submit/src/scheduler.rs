//! Submission scheduler
//!
//! ```text
//!  manifest ──plan──▶ pending ──buffer_unordered(N)──▶ workers ──▶ reorder ──▶ progress log
//!                                  │                     │
//!                                  └── rate limiter ◀────┘
//! ```
//!
//! Each worker reads its chunk, re-checks the digest, submits with bounded
//! retries and waits for finality. Workers finish in any order; the single
//! committing loop releases results through a [`ReorderBuffer`] so the
//! progress log only ever grows by the next chunk id. A fatal error cancels
//! the remaining work and leaves the committed prefix untouched.

use crate::config::{SubmitConfig, MAX_BACKOFF_MS};
use crate::error::{Result, SubmitError};
use crate::finality::{FinalityTracker, PollSchedule};
use crate::ledger::Ledger;
use crate::progress::ProgressLog;
use crate::rate_limit::RateLimiter;
use crate::reorder::ReorderBuffer;
use crate::retry::{submit_with_retry, RetryPolicy};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use lensda_common::checksum::verify_digest;
use lensda_common::manifest::{Manifest, ManifestEntry};
use lensda_common::types::{ProgressEntry, SubmissionRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Tuning knobs of a scheduler run
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub concurrency: usize,
    pub max_qps: u32,
    pub retry: RetryPolicy,
    pub poll: PollSchedule,
    pub max_total_bytes: Option<u64>,
}

impl SchedulerSettings {
    pub fn from_config(config: &SubmitConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            max_qps: config.max_qps,
            retry: RetryPolicy::new(
                config.max_retries,
                config.initial_backoff(),
                Duration::from_millis(MAX_BACKOFF_MS),
            ),
            poll: PollSchedule::new(config.poll_interval(), config.poll_jitter()),
            max_total_bytes: config.max_total_bytes,
        }
    }
}

/// What a run will do, decided before anything is sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPlan {
    pub pending: Vec<ManifestEntry>,
    /// Already in the progress log
    pub already_done: usize,
    /// Beyond the byte quota, left for a later run
    pub deferred: usize,
}

impl SubmissionPlan {
    /// Pick the chunks to submit.
    ///
    /// The quota is applied to cumulative bytes counted from chunk 1 in id
    /// order, committed chunks included, so every run cuts at the same chunk.
    pub fn new(manifest: &Manifest, progress: &ProgressLog, max_total_bytes: Option<u64>) -> Self {
        let mut plan = SubmissionPlan::default();
        let mut cumulative = 0u64;

        for (index, entry) in manifest.iter().enumerate() {
            cumulative = cumulative.saturating_add(entry.byte_length);
            if max_total_bytes.is_some_and(|quota| cumulative > quota) {
                plan.deferred = manifest.len() - index;
                break;
            }
            if progress.is_done(entry.chunk_id) {
                plan.already_done += 1;
            } else {
                plan.pending.push(entry.clone());
            }
        }

        plan
    }

    pub fn bytes(&self) -> u64 {
        self.pending.iter().map(|e| e.byte_length).sum()
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub committed: usize,
    pub already_done: usize,
    pub deferred: usize,
    pub bytes: u64,
}

/// Work shared by every in-flight chunk
struct Worker<L: ?Sized> {
    ledger: Arc<L>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    finality: FinalityTracker<L>,
    cancel: CancellationToken,
}

impl<L> Worker<L>
where
    L: Ledger + ?Sized,
{
    async fn process(&self, entry: &ManifestEntry) -> Result<ProgressEntry> {
        let chunk_id = entry.chunk_id;
        let payload = tokio::fs::read(&entry.storage_location)
            .await
            .map_err(|e| SubmitError::chunk(chunk_id, e))?;
        verify_digest(chunk_id, &payload, &entry.content_digest)?;

        let submission_id = tokio::select! {
            _ = self.cancel.cancelled() => return Err(SubmitError::Cancelled),
            result = submit_with_retry(&*self.ledger, &self.limiter, &self.retry, chunk_id, &payload) => {
                result.map_err(|source| SubmitError::FatalSubmission { chunk_id, source })?
            }
        };
        let submission = SubmissionRecord {
            chunk_id,
            submission_id,
            uploaded_at: Utc::now(),
        };
        info!(
            chunk_id,
            submission_id = %submission.submission_id,
            bytes = payload.len(),
            "Chunk submitted"
        );

        let finality = self
            .finality
            .await_finality(&submission.submission_id, &self.cancel)
            .await?;

        Ok(ProgressEntry::from_parts(submission, finality))
    }
}

/// Drives a manifest through the ledger
pub struct SubmissionScheduler<L: ?Sized> {
    ledger: Arc<L>,
    settings: SchedulerSettings,
    shutdown: CancellationToken,
}

impl<L> SubmissionScheduler<L>
where
    L: Ledger + ?Sized,
{
    pub fn new(ledger: Arc<L>, settings: SchedulerSettings) -> Self {
        Self {
            ledger,
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop the run when `token` is cancelled (e.g. on Ctrl-C)
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Submit every pending chunk of `manifest`, committing to `progress`.
    ///
    /// Returns once all planned chunks are committed. On a fatal error or
    /// shutdown the in-flight work is dropped; everything committed so far is
    /// a prefix of the plan in chunk-id order.
    pub async fn run(&self, manifest: &Manifest, progress: &mut ProgressLog) -> Result<RunSummary> {
        let plan = SubmissionPlan::new(manifest, progress, self.settings.max_total_bytes);
        let mut summary = RunSummary {
            already_done: plan.already_done,
            deferred: plan.deferred,
            ..RunSummary::default()
        };

        info!(
            pending = plan.pending.len(),
            already_done = plan.already_done,
            deferred = plan.deferred,
            bytes = plan.bytes(),
            concurrency = self.settings.concurrency,
            "Submission plan ready"
        );
        if plan.pending.is_empty() {
            return Ok(summary);
        }

        // Child token: a fatal error stops this run without touching the caller's token
        let cancel = self.shutdown.child_token();
        let worker = Arc::new(Worker {
            ledger: self.ledger.clone(),
            limiter: Arc::new(RateLimiter::new(self.settings.max_qps)),
            retry: self.settings.retry,
            finality: FinalityTracker::new(self.ledger.clone(), self.settings.poll),
            cancel: cancel.clone(),
        });

        let mut reorder = ReorderBuffer::new(plan.pending.iter().map(|e| e.chunk_id));
        let results = stream::iter(plan.pending)
            .map(|entry| {
                let worker = worker.clone();
                async move {
                    let outcome = worker.process(&entry).await;
                    (entry, outcome)
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1));
        let mut results = std::pin::pin!(results);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(committed = summary.committed, "Submission cancelled");
                    return Err(SubmitError::Cancelled);
                }
                next = results.next() => next,
            };
            let Some((entry, outcome)) = next else {
                break;
            };

            match outcome {
                Ok(progress_entry) => {
                    for (chunk_id, ready) in reorder.insert(entry.chunk_id, (entry, progress_entry)) {
                        let (entry, progress_entry) = ready;
                        progress
                            .append(&progress_entry)
                            .map_err(|e| SubmitError::chunk(chunk_id, e))?;
                        summary.committed += 1;
                        summary.bytes += entry.byte_length;
                        info!(
                            chunk_id,
                            submission_id = %progress_entry.submission_id,
                            held = reorder.held(),
                            "Chunk committed"
                        );
                    }
                }
                Err(err) => {
                    cancel.cancel();
                    error!(
                        chunk_id = entry.chunk_id,
                        committed = summary.committed,
                        error = %err,
                        "Fatal submission error, stopping"
                    );
                    return Err(err);
                }
            }
        }

        info!(
            committed = summary.committed,
            bytes = summary.bytes,
            "Submission run complete"
        );
        Ok(summary)
    }
}
