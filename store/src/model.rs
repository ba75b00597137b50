//! Persisted records shared by the scheduler, the executor and the CLI.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key of the schedule configuration record.
pub const CONFIG_KEY: &str = "config";
/// Storage key of today's [`DailyState`].
pub const DAILY_STATE_KEY: &str = "daily_state";
/// Storage key of the [`LastCommitInfo`] cache.
pub const LAST_COMMIT_KEY: &str = "last_commit";
/// Storage key of the bounded [`ErrorLog`].
pub const ERROR_LOG_KEY: &str = "error_log";

/// Slot label recorded for force commits. Never a valid `HH:MM`.
pub const FORCE_SLOT: &str = "force";

pub const ERROR_LOG_CAPACITY: usize = 20;

pub const MIN_COMMITS_PER_DAY: u32 = 1;
pub const MAX_COMMITS_PER_DAY: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Spread `commits_per_day` probabilistically across the waking window.
    #[default]
    Random,
    /// Fire once per configured `HH:MM` slot.
    Fixed,
}

/// Schedule configuration, written by the dashboard and read on every tick.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub schedule_mode: ScheduleMode,

    #[serde(default = "default_commits_per_day")]
    pub commits_per_day: u32,

    /// Ordered `HH:MM` slot times used by fixed mode.
    #[serde(default)]
    pub fixed_times: Vec<String>,

    /// API token for the hosting service. Opaque to the scheduler.
    pub token: String,
    pub owner: String,
    pub repo: String,

    /// File inside the target repository that each commit touches.
    #[serde(default = "default_file_path")]
    pub file_path: String,

    pub email: String,
    pub author_name: String,
}

fn default_commits_per_day() -> u32 {
    3
}

fn default_file_path() -> String {
    "activity.md".to_string()
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("enabled", &self.enabled)
            .field("schedule_mode", &self.schedule_mode)
            .field("commits_per_day", &self.commits_per_day)
            .field("fixed_times", &self.fixed_times)
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("file_path", &self.file_path)
            .field("email", &self.email)
            .field("author_name", &self.author_name)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("commitsPerDay must be between 1 and 20, got {0}")]
    CommitsPerDayOutOfRange(u32),

    #[error("fixed time {0:?} is not a valid HH:MM value")]
    InvalidSlot(String),

    #[error("fixed mode requires at least one entry in fixedTimes")]
    NoFixedTimes,

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl Configuration {
    /// Daily commit target, clamped into the supported range.
    pub fn daily_target(&self) -> u32 {
        self.commits_per_day
            .clamp(MIN_COMMITS_PER_DAY, MAX_COMMITS_PER_DAY)
    }

    /// Rejects records the dashboard should never have produced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_COMMITS_PER_DAY..=MAX_COMMITS_PER_DAY).contains(&self.commits_per_day) {
            return Err(ConfigError::CommitsPerDayOutOfRange(self.commits_per_day));
        }

        if let Some(bad) = self.fixed_times.iter().find(|t| parse_slot(t).is_none()) {
            return Err(ConfigError::InvalidSlot(bad.clone()));
        }

        if self.schedule_mode == ScheduleMode::Fixed && self.fixed_times.is_empty() {
            return Err(ConfigError::NoFixedTimes);
        }

        let required = [
            ("token", &self.token),
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("filePath", &self.file_path),
            ("email", &self.email),
            ("authorName", &self.author_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }

        Ok(())
    }
}

/// Parses an `HH:MM` slot. Single-digit hours are accepted.
pub fn parse_slot(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Canonical `HH:MM` label used in [`DailyState::fired_slots`].
pub fn slot_label(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Commit bookkeeping for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyState {
    pub date: NaiveDate,
    pub count: u32,
    #[serde(default)]
    pub fired_slots: BTreeSet<String>,
}

impl DailyState {
    pub fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            count: 0,
            fired_slots: BTreeSet::new(),
        }
    }

    pub fn has_fired(&self, slot: &str) -> bool {
        self.fired_slots.contains(slot)
    }

    pub fn record(&mut self, slot: Option<&str>) {
        self.count += 1;
        if let Some(slot) = slot {
            self.fired_slots.insert(slot.to_string());
        }
    }
}

/// Display-only cache of the most recent successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCommitInfo {
    pub sha: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
    pub time: DateTime<Utc>,
}

/// Newest-first diagnostics log holding at most [`ERROR_LOG_CAPACITY`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    pub fn push(&mut self, entry: ErrorEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(ERROR_LOG_CAPACITY);
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Configuration {
        Configuration {
            enabled: true,
            schedule_mode: ScheduleMode::Fixed,
            commits_per_day: 3,
            fixed_times: vec!["09:00".into(), "15:30".into()],
            token: "ghp_secret".into(),
            owner: "octo".into(),
            repo: "pulse".into(),
            file_path: "activity.md".into(),
            email: "octo@example.com".into(),
            author_name: "Octo".into(),
        }
    }

    #[test]
    fn parses_camel_case_json_with_defaults() {
        let raw = r#"{
            "enabled": true,
            "token": "t", "owner": "o", "repo": "r",
            "email": "e@x", "authorName": "A"
        }"#;
        let parsed: Configuration = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.schedule_mode, ScheduleMode::Random);
        assert_eq!(parsed.commits_per_day, 3);
        assert_eq!(parsed.file_path, "activity.md");
        assert!(parsed.fixed_times.is_empty());
    }

    #[test]
    fn schedule_mode_is_lowercase_on_the_wire() {
        let mut c = cfg();
        c.schedule_mode = ScheduleMode::Fixed;
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["scheduleMode"], "fixed");
        assert_eq!(json["fixedTimes"][1], "15:30");
    }

    #[test]
    fn debug_redacts_token() {
        let out = format!("{:?}", cfg());
        assert!(!out.contains("ghp_secret"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn validate_accepts_good_record() {
        assert_eq!(cfg().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_out_of_range_target() {
        let mut c = cfg();
        c.commits_per_day = 21;
        assert_eq!(c.validate(), Err(ConfigError::CommitsPerDayOutOfRange(21)));

        c.commits_per_day = 0;
        assert_eq!(c.validate(), Err(ConfigError::CommitsPerDayOutOfRange(0)));
    }

    #[test]
    fn validate_rejects_bad_slot() {
        let mut c = cfg();
        c.fixed_times.push("25:00".into());
        assert_eq!(c.validate(), Err(ConfigError::InvalidSlot("25:00".into())));
    }

    #[test]
    fn validate_requires_slots_in_fixed_mode() {
        let mut c = cfg();
        c.fixed_times.clear();
        assert_eq!(c.validate(), Err(ConfigError::NoFixedTimes));
    }

    #[test]
    fn validate_requires_credentials() {
        let mut c = cfg();
        c.token = "  ".into();
        assert_eq!(c.validate(), Err(ConfigError::MissingField("token")));
    }

    #[test]
    fn daily_target_is_clamped() {
        let mut c = cfg();
        c.commits_per_day = 50;
        assert_eq!(c.daily_target(), 20);
        c.commits_per_day = 0;
        assert_eq!(c.daily_target(), 1);
    }

    #[test]
    fn slot_parsing_normalises_label() {
        let t = parse_slot(" 9:05 ").unwrap();
        assert_eq!(slot_label(t), "09:05");
        assert!(parse_slot("force").is_none());
        assert!(parse_slot("12:60").is_none());
    }

    #[test]
    fn error_log_is_newest_first_and_bounded() {
        let mut log = ErrorLog::default();
        for i in 0..25 {
            log.push(ErrorEntry {
                message: format!("e{i}"),
                time: Utc::now(),
            });
        }

        assert_eq!(log.len(), ERROR_LOG_CAPACITY);
        assert_eq!(log.entries()[0].message, "e24");
        assert_eq!(log.entries()[ERROR_LOG_CAPACITY - 1].message, "e5");
    }

    #[test]
    fn daily_state_record_tracks_slots() {
        let mut s = DailyState::fresh(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
        s.record(None);
        s.record(Some("09:00"));
        s.record(Some(FORCE_SLOT));

        assert_eq!(s.count, 3);
        assert!(s.has_fired("09:00"));
        assert!(s.has_fired(FORCE_SLOT));
        assert!(!s.has_fired("15:00"));
    }
}
