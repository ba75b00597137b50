//! Single-flight wrapper around the [`CommitClient`].
//!
//! Design principles:
//! - **Advisory lock**: a single boolean, not a queue. The loser gets
//!   [`CommitError::Busy`] immediately and nothing is awaited.
//! - **Guaranteed release**: the flag is cleared by a drop guard, so success,
//!   failure, panic and cancellation all free it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::logger::warn_if_slow;
use store::Configuration;
use tracing::{debug, instrument, warn};

use crate::client::{CommitClient, CommitReceipt, CommitRequest};
use crate::error::CommitError;

pub struct CommitGuard {
    client: Arc<dyn CommitClient>,
    in_flight: AtomicBool,
}

/// Held for the duration of one commit; clears the flag on drop.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CommitGuard {
    pub fn new(client: Arc<dyn CommitClient>) -> Self {
        Self {
            client,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Creates one commit, or fails with [`CommitError::Busy`] if one is running.
    #[instrument(
        skip_all,
        target = "executor",
        fields(owner = %cfg.owner, repo = %cfg.repo)
    )]
    pub async fn execute(&self, cfg: &Configuration) -> Result<CommitReceipt, CommitError> {
        let Some(_permit) = self.try_acquire() else {
            debug!("commit lock held; rejecting");
            return Err(CommitError::Busy);
        };

        let request = CommitRequest::from(cfg);

        let result = warn_if_slow(
            "create_commit",
            Duration::from_secs(10),
            self.client.create_commit(&request),
        )
        .await;

        match result {
            Ok(receipt) => {
                debug!(sha = %receipt.sha, "commit created");
                Ok(receipt)
            }
            Err(e) => {
                warn!(error = %e, "commit operation failed");
                Err(CommitError::External(e))
            }
        }
    }
}
