//! The tick dispatcher.
//!
//! For each timer wake-up it:
//!   1. Loads the configuration (absent or disabled => no-op).
//!   2. Delegates to the random or fixed policy.
//!   3. Contains any failure: it is traced, appended to the error log and
//!      reported as [`TickReport::Failed`]. Nothing propagates to the timer.
//!
//! [`Scheduler`] also owns the process-local state shared with the force
//! path: the commit guard and the force cooldown stamp.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use executor::{CommitGuard, CommitReceipt};
use parking_lot::{Mutex, RwLock};
use store::{Configuration, LastCommitInfo, ScheduleMode, StateStore};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

use crate::error::SchedulerError;
use crate::policy::{RandomSource, ThreadRandom, fixed, random};
use crate::settings::ScheduleSettings;
use crate::types::TickReport;

pub struct Scheduler {
    store: Arc<StateStore>,
    guard: Arc<CommitGuard>,
    random: Arc<dyn RandomSource>,
    settings: RwLock<ScheduleSettings>,

    /// Instant of the last successful force commit. Not persisted.
    last_force: Mutex<Option<Instant>>,
}

impl Scheduler {
    pub fn new(store: Arc<StateStore>, guard: Arc<CommitGuard>, settings: ScheduleSettings) -> Self {
        Self {
            store,
            guard,
            random: Arc::new(ThreadRandom),
            settings: RwLock::new(settings),
            last_force: Mutex::new(None),
        }
    }

    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn settings(&self) -> ScheduleSettings {
        *self.settings.read()
    }

    /// Keeps the policies' notion of cadence in line with the timer.
    pub fn set_tick_interval(&self, interval: Duration) {
        self.settings.write().tick_interval = interval;
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn guard(&self) -> &CommitGuard {
        &self.guard
    }

    pub(crate) fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    /// Runs one scheduled tick at local time `now`.
    #[instrument(skip(self), target = "scheduler", fields(now = %now))]
    pub async fn tick(&self, now: NaiveDateTime) -> TickReport {
        match self.dispatch(now).await {
            Ok(report) => {
                debug!(?report, "tick complete");
                report
            }
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "scheduled tick failed");
                self.record_error(&message).await;
                TickReport::Failed(message)
            }
        }
    }

    async fn dispatch(&self, now: NaiveDateTime) -> Result<TickReport, SchedulerError> {
        let Some(cfg) = self.store.configuration().await? else {
            debug!("no configuration; skipping tick");
            return Ok(TickReport::NotConfigured);
        };

        if !cfg.enabled {
            debug!("scheduling disabled; skipping tick");
            return Ok(TickReport::Disabled);
        }

        match cfg.schedule_mode {
            ScheduleMode::Random => random::maybe_commit(self, &cfg, now)
                .await
                .map(TickReport::Random),
            ScheduleMode::Fixed => fixed::maybe_commit(self, &cfg, now)
                .await
                .map(TickReport::Fixed),
        }
    }

    /// Creates one commit through the guard, then updates the bookkeeping.
    pub(crate) async fn commit_and_record(
        &self,
        cfg: &Configuration,
        today: NaiveDate,
        slot: Option<&str>,
    ) -> Result<CommitReceipt, SchedulerError> {
        let receipt = self.guard.execute(cfg).await?;
        self.record_success(&receipt, today, slot).await?;
        Ok(receipt)
    }

    pub(crate) async fn record_success(
        &self,
        receipt: &CommitReceipt,
        today: NaiveDate,
        slot: Option<&str>,
    ) -> Result<(), SchedulerError> {
        let state = self.store.record_commit(today, slot).await?;
        self.store
            .set_last_commit(&LastCommitInfo {
                sha: receipt.sha.clone(),
                date: receipt.date,
            })
            .await?;

        info!(
            sha = %receipt.sha,
            slot = slot.unwrap_or("-"),
            count = state.count,
            "commit recorded"
        );
        Ok(())
    }

    /// Appends to the error log. A failing log write is only traced.
    pub(crate) async fn record_error(&self, message: &str) {
        if let Err(e) = self.store.push_error(message, Utc::now()).await {
            error!(error = ?e, "failed to append to error log");
        }
    }

    pub(crate) fn cooldown_remaining(&self, cooldown: Duration) -> Option<Duration> {
        let last = (*self.last_force.lock())?;
        let elapsed = last.elapsed();
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    pub(crate) fn arm_cooldown(&self) {
        *self.last_force.lock() = Some(Instant::now());
    }
}
