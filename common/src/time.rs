//! Wall-clock helpers.
//!
//! Scheduling decisions are made against *local* time because the daily
//! window and fixed slots are expressed in the user's timezone.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn minutes_since_midnight(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}
