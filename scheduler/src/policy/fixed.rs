//! Fixed mode: one commit per configured `HH:MM` slot per day.
//!
//! A slot is due for one tick interval after its nominal time. With the timer
//! running at that interval exactly one tick lands in the window; the fired
//! set in [`store::DailyState`] stops any extra tick from committing twice.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use common::time::minutes_since_midnight;
use store::Configuration;
use store::model::{parse_slot, slot_label};
use tracing::{debug, info, warn};

use crate::engine::Scheduler;
use crate::error::SchedulerError;

/// Whether `now_minutes` falls in `[slot_minutes, slot_minutes + tick_minutes)`.
pub fn slot_due(slot_minutes: u32, now_minutes: u32, tick_minutes: u32) -> bool {
    now_minutes >= slot_minutes && now_minutes < slot_minutes + tick_minutes
}

/// Returns the labels of the slots that fired on this tick.
pub(crate) async fn maybe_commit(
    scheduler: &Scheduler,
    cfg: &Configuration,
    now: NaiveDateTime,
) -> Result<Vec<String>, SchedulerError> {
    let tick_minutes = scheduler.settings().tick_minutes();
    let now_minutes = minutes_since_midnight(now.time());
    let today = now.date();

    let state = scheduler.store().daily_state(today).await?;

    let mut seen = HashSet::new();
    let mut fired = Vec::new();

    for raw in &cfg.fixed_times {
        let Some(slot_time) = parse_slot(raw) else {
            warn!(slot = %raw, "ignoring malformed fixed slot");
            continue;
        };

        let label = slot_label(slot_time);
        if !seen.insert(label.clone()) {
            continue;
        }

        if state.has_fired(&label) {
            continue;
        }

        if !slot_due(minutes_since_midnight(slot_time), now_minutes, tick_minutes) {
            continue;
        }

        debug!(slot = %label, "slot due");
        scheduler.commit_and_record(cfg, today, Some(&label)).await?;
        info!(slot = %label, "fixed slot fired");
        fired.push(label);
    }

    Ok(fired)
}
