//! Timing knobs shared by the policies and the force path.

use std::time::Duration;

/// Scheduling parameters.
///
/// The random policy derives its opportunity count from the window and the
/// tick interval, so both must describe the cadence the timer actually runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Wake-up cadence of the periodic timer.
    pub tick_interval: Duration,

    /// First hour (inclusive) of the active window, local time.
    pub window_start_hour: u32,

    /// Hour (exclusive) at which the active window closes, local time.
    pub window_end_hour: u32,

    /// Minimum spacing between two successful force commits.
    pub force_cooldown: Duration,

    /// Wait before the single retry when a force commit finds the lock held.
    pub busy_backoff: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5 * 60),
            window_start_hour: 6,
            window_end_hour: 22,
            force_cooldown: Duration::from_secs(4),
            busy_backoff: Duration::from_secs(2),
        }
    }
}

impl ScheduleSettings {
    pub fn window_minutes(&self) -> u32 {
        self.window_end_hour.saturating_sub(self.window_start_hour) * 60
    }

    /// Tick interval rounded up to whole minutes, never zero.
    /// The fixed-slot tolerance must cover the whole wake cadence.
    pub fn tick_minutes(&self) -> u32 {
        (self.tick_interval.as_secs().div_ceil(60) as u32).max(1)
    }

    /// Number of ticks that land inside one day's window.
    pub fn checks_per_day(&self) -> u32 {
        self.window_minutes() / self.tick_minutes()
    }

    pub fn in_window(&self, hour: u32) -> bool {
        hour >= self.window_start_hour && hour < self.window_end_hour
    }

    /// True during the last hour of the window, when random mode stops drawing.
    pub fn in_final_hour(&self, hour: u32) -> bool {
        self.in_window(hour) && hour + 1 >= self.window_end_hour
    }
}
