use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use executor::github::DEFAULT_API_BASE;
use scheduler::ScheduleSettings;
use scheduler::controller::TickIntervals;

/// Process settings read from the environment.
///
/// User-facing schedule configuration lives in the state store; this only
/// covers how the process itself runs.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// `APP_ENV=production` switches logs to JSON.
    pub production: bool,

    pub github_api_url: String,
    pub http_timeout: Duration,

    // =========================
    // Timer configuration
    // =========================
    /// Timer cadence in fixed mode. Also the slot tolerance.
    pub fixed_tick: Duration,

    /// Timer cadence in random mode.
    pub random_tick: Duration,

    /// Delay before the first tick after registration.
    pub initial_delay: Duration,

    // =========================
    // Policy configuration
    // =========================
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    pub force_cooldown: Duration,
    pub busy_backoff: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let secs = |key: &str, default: u64| -> anyhow::Result<Duration> {
            parse_or(&get, key, default).map(Duration::from_secs)
        };

        let cfg = Self {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://streak.db?mode=rwc".to_string()),
            production: get("APP_ENV").is_some_and(|v| v == "production"),

            github_api_url: get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            http_timeout: secs("STREAK_HTTP_TIMEOUT_SECS", 20)?,

            fixed_tick: secs("STREAK_FIXED_TICK_SECS", 5 * 60)?,
            random_tick: secs("STREAK_RANDOM_TICK_SECS", 5 * 60)?,
            initial_delay: secs("STREAK_INITIAL_DELAY_SECS", 60)?,

            window_start_hour: parse_or(&get, "STREAK_WINDOW_START_HOUR", 6)?,
            window_end_hour: parse_or(&get, "STREAK_WINDOW_END_HOUR", 22)?,
            force_cooldown: secs("STREAK_FORCE_COOLDOWN_SECS", 4)?,
            busy_backoff: secs("STREAK_BUSY_BACKOFF_SECS", 2)?,
        };

        if cfg.window_start_hour >= cfg.window_end_hour || cfg.window_end_hour > 24 {
            bail!(
                "invalid active window {}..{}",
                cfg.window_start_hour,
                cfg.window_end_hour
            );
        }
        if cfg.fixed_tick.is_zero() || cfg.random_tick.is_zero() {
            bail!("tick intervals must be positive");
        }

        Ok(cfg)
    }

    /// Policy settings; the tick interval is replaced whenever the timer registers.
    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            tick_interval: self.random_tick,
            window_start_hour: self.window_start_hour,
            window_end_hour: self.window_end_hour,
            force_cooldown: self.force_cooldown,
            busy_backoff: self.busy_backoff,
        }
    }

    pub fn tick_intervals(&self) -> TickIntervals {
        TickIntervals {
            fixed: self.fixed_tick,
            random: self.random_tick,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}
