use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use common::logger::warn_if_slow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::daily::get_or_reset_daily_state;
use crate::model::{
    CONFIG_KEY, Configuration, DAILY_STATE_KEY, DailyState, ERROR_LOG_KEY, ErrorEntry, ErrorLog,
    LAST_COMMIT_KEY, LastCommitInfo,
};
use crate::repository::KeyValueRepository;

/// Typed access to the scheduler's persisted records.
///
/// Read-modify-write sequences (daily state, error log) are serialised by an
/// internal lock so a force commit and a scheduled tick cannot lose updates.
pub struct StateStore {
    repo: Arc<dyn KeyValueRepository>,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(repo: Arc<dyn KeyValueRepository>) -> Self {
        Self {
            repo,
            write_lock: Mutex::new(()),
        }
    }

    async fn load_raw(&self, key: &'static str) -> Result<Option<String>> {
        warn_if_slow("kv_get", Duration::from_millis(100), self.repo.get(key))
            .await
            .with_context(|| format!("failed to load {key}"))
    }

    async fn load<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>> {
        match self.load_raw(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("stored {key} is not valid JSON"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Like [`Self::load`] but treats an unreadable record as absent.
    async fn load_lenient<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>> {
        let Some(raw) = self.load_raw(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed record");
                Ok(None)
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &'static str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        warn_if_slow("kv_set", Duration::from_millis(100), self.repo.set(key, &raw))
            .await
            .with_context(|| format!("failed to persist {key}"))
    }

    /// Current schedule configuration, or `None` if the dashboard never saved one.
    #[instrument(skip(self), target = "store")]
    pub async fn configuration(&self) -> Result<Option<Configuration>> {
        self.load(CONFIG_KEY).await
    }

    #[instrument(skip_all, target = "store")]
    pub async fn save_configuration(&self, cfg: &Configuration) -> Result<()> {
        self.save(CONFIG_KEY, cfg).await?;
        info!(mode = ?cfg.schedule_mode, enabled = cfg.enabled, "configuration saved");
        Ok(())
    }

    /// Today's state. A stale record is replaced and persisted as a side effect.
    #[instrument(skip(self, today), target = "store", fields(today = %today))]
    pub async fn daily_state(&self, today: NaiveDate) -> Result<DailyState> {
        let _guard = self.write_lock.lock().await;
        self.daily_state_locked(today).await
    }

    /// A caller holding an older date (a tick that started before midnight)
    /// never rewinds a record that has already rolled to a later day.
    async fn daily_state_locked(&self, today: NaiveDate) -> Result<DailyState> {
        let stored = self.load_lenient::<DailyState>(DAILY_STATE_KEY).await?;
        let day = stored.as_ref().map_or(today, |s| s.date.max(today));
        let (state, reset) = get_or_reset_daily_state(stored, day);

        if reset {
            debug!("daily state rolled over");
            self.save(DAILY_STATE_KEY, &state).await?;
        }

        Ok(state)
    }

    /// Counts one commit for `today`, marking `slot` as fired when given.
    #[instrument(skip(self, today), target = "store", fields(today = %today))]
    pub async fn record_commit(&self, today: NaiveDate, slot: Option<&str>) -> Result<DailyState> {
        let _guard = self.write_lock.lock().await;

        let mut state = self.daily_state_locked(today).await?;
        state.record(slot);
        self.save(DAILY_STATE_KEY, &state).await?;

        debug!(count = state.count, "daily state updated");
        Ok(state)
    }

    pub async fn last_commit(&self) -> Result<Option<LastCommitInfo>> {
        self.load_lenient(LAST_COMMIT_KEY).await
    }

    pub async fn set_last_commit(&self, info: &LastCommitInfo) -> Result<()> {
        self.save(LAST_COMMIT_KEY, info).await
    }

    pub async fn error_log(&self) -> Result<ErrorLog> {
        Ok(self
            .load_lenient::<ErrorLog>(ERROR_LOG_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Prepends an entry, dropping the oldest beyond capacity.
    #[instrument(skip(self, message), target = "store")]
    pub async fn push_error(&self, message: impl Into<String>, time: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut log = self
            .load_lenient::<ErrorLog>(ERROR_LOG_KEY)
            .await?
            .unwrap_or_default();
        log.push(ErrorEntry {
            message: message.into(),
            time,
        });
        self.save(ERROR_LOG_KEY, &log).await
    }
}
