//! Finality polling
//!
//! A submission is only worth recording once the ledger reports it final.
//! Polling has no overall deadline: every failure is logged and polled
//! again after the next interval. Only cancellation ends the loop early.

use crate::error::{Result, SubmitError};
use crate::ledger::Ledger;
use lensda_common::types::FinalityRecord;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Fixed interval plus uniform random jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_jitter: Duration,
}

impl PollSchedule {
    pub fn new(interval: Duration, max_jitter: Duration) -> Self {
        Self {
            interval,
            max_jitter,
        }
    }

    /// Delay before the next poll, within `[interval, interval + max_jitter]`
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// Polls the ledger until a submission is final
pub struct FinalityTracker<L: ?Sized> {
    ledger: Arc<L>,
    schedule: PollSchedule,
}

impl<L: ?Sized> Clone for FinalityTracker<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            schedule: self.schedule,
        }
    }
}

impl<L> FinalityTracker<L>
where
    L: Ledger + ?Sized,
{
    pub fn new(ledger: Arc<L>, schedule: PollSchedule) -> Self {
        Self { ledger, schedule }
    }

    /// Wait until `submission_id` is final.
    ///
    /// Returns [`SubmitError::Cancelled`] if `cancel` fires first.
    pub async fn await_finality(
        &self,
        submission_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FinalityRecord> {
        let mut polls = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(SubmitError::Cancelled);
            }

            polls += 1;
            match self.ledger.get_status(submission_id).await {
                Ok(record) if record.finalized => {
                    info!(
                        submission_id,
                        polls,
                        block = ?record.block_reference,
                        "Submission finalized"
                    );
                    return Ok(record);
                }
                Ok(_) => debug!(submission_id, polls, "Submission not final yet"),
                Err(err) => debug!(submission_id, polls, error = %err, "Status poll failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(SubmitError::Cancelled),
                _ = tokio::time::sleep(self.schedule.next_delay()) => {}
            }
        }
    }
}
