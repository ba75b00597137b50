//! On-demand commits that bypass the policies.
//!
//! Rules:
//! - A successful force commit arms a cooldown; calls inside it are rejected
//!   without touching the guard or any state.
//! - `Busy` is retried exactly once after a fixed backoff. The cooldown is
//!   checked again before the retry. Any other failure, or a second `Busy`,
//!   is returned as data.
//! - Force commits are recorded under [`FORCE_SLOT`] and ignore `enabled`.

use chrono::NaiveDateTime;
use executor::CommitReceipt;
use store::Configuration;
use store::model::FORCE_SLOT;
use tracing::{info, instrument, warn};

use crate::engine::Scheduler;
use crate::error::SchedulerError;
use crate::types::ForceOutcome;

impl Scheduler {
    #[instrument(skip(self), target = "scheduler", fields(now = %now))]
    pub async fn force_commit(&self, now: NaiveDateTime) -> ForceOutcome {
        if let Some(rejected) = self.cooldown_rejection() {
            return rejected;
        }

        let cfg = match self.store().configuration().await {
            Ok(Some(cfg)) => cfg,
            Ok(None) => return self.reject("not configured").await,
            Err(e) => return self.reject(&SchedulerError::from(e).to_string()).await,
        };

        let receipt = match self.execute_with_retry(&cfg).await {
            Ok(r) => r,
            Err(rejected) => return rejected,
        };

        // The commit exists upstream from here on, so the cooldown applies
        // even if the bookkeeping below fails.
        self.arm_cooldown();

        if let Err(e) = self
            .record_success(&receipt, now.date(), Some(FORCE_SLOT))
            .await
        {
            let message = format!("commit {} created but not recorded: {e}", receipt.sha);
            return self.reject(&message).await;
        }

        info!(sha = %receipt.sha, "force commit succeeded");
        ForceOutcome::Committed { sha: receipt.sha }
    }

    /// Rejections come back ready to return, already logged where required.
    async fn execute_with_retry(&self, cfg: &Configuration) -> Result<CommitReceipt, ForceOutcome> {
        let result = match self.guard().execute(cfg).await {
            Err(e) if e.is_busy() => {
                let backoff = self.settings().busy_backoff;
                info!(backoff_ms = backoff.as_millis() as u64, "commit in flight; retrying once");
                tokio::time::sleep(backoff).await;

                // The lock holder may have been another force commit.
                if let Some(rejected) = self.cooldown_rejection() {
                    return Err(rejected);
                }
                self.guard().execute(cfg).await
            }
            other => other,
        };

        match result {
            Ok(receipt) => Ok(receipt),
            Err(e) => Err(self.reject(&e.to_string()).await),
        }
    }

    fn cooldown_rejection(&self) -> Option<ForceOutcome> {
        let remaining = self.cooldown_remaining(self.settings().force_cooldown)?;
        let secs = remaining.as_millis().div_ceil(1000).max(1) as u64;
        info!(remaining_secs = secs, "force commit rejected by cooldown");
        Some(ForceOutcome::Rejected {
            error: format!("force commit on cooldown, retry in {secs}s"),
            cooldown: Some(secs),
        })
    }

    async fn reject(&self, message: &str) -> ForceOutcome {
        warn!(error = %message, "force commit failed");
        self.record_error(message).await;
        ForceOutcome::Rejected {
            error: message.to_string(),
            cooldown: None,
        }
    }
}
