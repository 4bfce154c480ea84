//! Shared fixtures for submit integration tests
//!
//! - [`write_build`] lays out chunk files and a manifest in a temp directory
//! - [`MockLedger`] is a scripted ledger with per-chunk latency, transient
//!   failures, fatal failures and a configurable number of pending polls

#![allow(dead_code)]

use async_trait::async_trait;
use lensda_common::checksum::compute_digest;
use lensda_common::layout::BuildLayout;
use lensda_common::manifest::{Manifest, ManifestEntry, ManifestWriter};
use lensda_common::types::{FinalityRecord, Reference};
use lensda_submit::finality::PollSchedule;
use lensda_submit::retry::RetryPolicy;
use lensda_submit::{Ledger, LedgerError, SchedulerSettings};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Chunk payload; the mock ledger recovers the chunk id from it
pub fn chunk_bytes(chunk_id: u64) -> Vec<u8> {
    format!("events:{{\"chunk\":{}}}\n", chunk_id).into_bytes()
}

/// Write `count` chunks plus a manifest; returns the directory guard and layout
pub fn write_build(count: u64) -> (TempDir, BuildLayout, Manifest) {
    let dir = TempDir::new().expect("temp dir");
    let layout = BuildLayout::new(dir.path());
    std::fs::create_dir_all(layout.chunks_dir()).expect("chunks dir");

    let mut writer = ManifestWriter::create(layout.manifest_path()).expect("manifest writer");
    for chunk_id in 1..=count {
        let bytes = chunk_bytes(chunk_id);
        let path = layout.chunk_path(chunk_id);
        std::fs::write(&path, &bytes).expect("chunk file");
        writer
            .append(&ManifestEntry {
                chunk_id,
                content_digest: compute_digest(&bytes),
                byte_length: bytes.len() as u64,
                storage_location: path.to_string_lossy().into_owned(),
            })
            .expect("manifest entry");
    }
    writer.commit().expect("commit manifest");

    let manifest = Manifest::load(layout.manifest_path()).expect("load manifest");
    (dir, layout, manifest)
}

/// Settings that keep paused-clock tests short
pub fn fast_settings(concurrency: usize) -> SchedulerSettings {
    SchedulerSettings {
        concurrency,
        max_qps: 1_000,
        retry: RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(30)),
        poll: PollSchedule::new(Duration::from_secs(15), Duration::from_secs(3)),
        max_total_bytes: None,
    }
}

#[derive(Default)]
struct MockState {
    transient_failures: HashMap<u64, u32>,
    fatal: HashMap<u64, String>,
    latency: HashMap<u64, Duration>,
    pending_polls: u32,
    attempts: HashMap<u64, u32>,
    polls: HashMap<String, u32>,
    submit_calls: u32,
    accepted: Vec<u64>,
}

/// Scripted ledger
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` submissions of `chunk_id` with a retryable error
    pub fn fail_transiently(self, chunk_id: u64, times: u32) -> Self {
        self.state.lock().unwrap().transient_failures.insert(chunk_id, times);
        self
    }

    /// Reject every submission of `chunk_id`
    pub fn fail_fatally(self, chunk_id: u64, reason: &str) -> Self {
        self.state.lock().unwrap().fatal.insert(chunk_id, reason.to_string());
        self
    }

    /// Delay the acknowledgment of `chunk_id`
    pub fn with_latency(self, chunk_id: u64, latency: Duration) -> Self {
        self.state.lock().unwrap().latency.insert(chunk_id, latency);
        self
    }

    /// Report every submission as pending this many times before final
    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.state.lock().unwrap().pending_polls = polls;
        self
    }

    pub fn submit_calls(&self) -> u32 {
        self.state.lock().unwrap().submit_calls
    }

    /// Chunk ids in acknowledgment order
    pub fn accepted(&self) -> Vec<u64> {
        self.state.lock().unwrap().accepted.clone()
    }

    pub fn polls_for(&self, submission_id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(submission_id)
            .copied()
            .unwrap_or(0)
    }
}

fn chunk_id_of(payload: &[u8]) -> u64 {
    let text = std::str::from_utf8(payload).expect("utf-8 payload");
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().expect("chunk id in payload")
}

fn chunk_id_of_submission(submission_id: &str) -> u64 {
    submission_id
        .split('-')
        .nth(1)
        .and_then(|id| id.parse().ok())
        .expect("submission id format sub-<chunk>-<attempt>")
}

#[async_trait]
impl Ledger for MockLedger {
    async fn submit(&self, payload: Vec<u8>) -> Result<String, LedgerError> {
        let chunk_id = chunk_id_of(&payload);
        let latency = {
            let mut state = self.state.lock().unwrap();
            state.submit_calls += 1;
            state.latency.get(&chunk_id).copied()
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        let attempt = {
            let attempts = state.attempts.entry(chunk_id).or_insert(0);
            *attempts += 1;
            *attempts
        };

        if let Some(reason) = state.fatal.get(&chunk_id) {
            return Err(LedgerError::fatal(reason.clone()));
        }
        if let Some(remaining) = state.transient_failures.get_mut(&chunk_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LedgerError::retryable("HTTP 503"));
            }
        }

        state.accepted.push(chunk_id);
        Ok(format!("sub-{}-{}", chunk_id, attempt))
    }

    async fn get_status(&self, submission_id: &str) -> Result<FinalityRecord, LedgerError> {
        let chunk_id = chunk_id_of_submission(submission_id);
        let mut state = self.state.lock().unwrap();
        let pending_polls = state.pending_polls;
        let polls = state.polls.entry(submission_id.to_string()).or_insert(0);
        *polls += 1;

        let finalized = *polls > pending_polls;
        Ok(FinalityRecord {
            submission_id: submission_id.to_string(),
            finalized,
            block_reference: finalized.then_some(Reference::Number(1_000 + chunk_id)),
            block_hash: finalized.then(|| format!("0x{:04x}", chunk_id)),
            transaction_reference: finalized.then(|| Reference::Text(format!("tx-{}", chunk_id))),
        })
    }
}
