//! Random mode: spread the daily target over the active window.
//!
//! Each tick commits with probability `remaining / checks_left`, which rises
//! toward 1 as opportunities run out. The last hour of the window skips the
//! draw entirely so the target is still met after a run of unlucky draws.

use chrono::{NaiveDateTime, Timelike};
use store::Configuration;
use tracing::debug;

use crate::engine::Scheduler;
use crate::error::SchedulerError;
use crate::types::Decision;

/// Uniform source of values in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn sample(&self) -> f64;
}

pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Probability that this tick should commit.
///
/// `count` doubles as the number of opportunities already consumed, matching
/// the reference estimator.
pub fn commit_probability(target: u32, count: u32, checks_per_day: u32) -> f64 {
    let remaining = target.saturating_sub(count);
    let checks_left = checks_per_day.saturating_sub(count).max(1);
    f64::from(remaining) / f64::from(checks_left)
}

pub(crate) async fn maybe_commit(
    scheduler: &Scheduler,
    cfg: &Configuration,
    now: NaiveDateTime,
) -> Result<Decision, SchedulerError> {
    let settings = scheduler.settings();
    let today = now.date();
    let target = cfg.daily_target();

    let state = scheduler.store().daily_state(today).await?;
    if state.count >= target {
        debug!(count = state.count, target, "daily quota met");
        return Ok(Decision::QuotaMet);
    }

    let probability = commit_probability(target, state.count, settings.checks_per_day());

    let hour = now.hour();
    if !settings.in_window(hour) {
        return Ok(Decision::OutsideWindow);
    }

    if settings.in_final_hour(hour) {
        debug!(count = state.count, target, "final hour; committing unconditionally");
    } else {
        let draw = scheduler.random().sample();
        if draw > probability {
            debug!(probability, draw, "draw above probability; skipping tick");
            return Ok(Decision::Skipped { probability, draw });
        }
    }

    let receipt = scheduler.commit_and_record(cfg, today, None).await?;
    Ok(Decision::Committed { sha: receipt.sha })
}
