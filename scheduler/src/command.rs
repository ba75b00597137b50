//! Inbound commands from the interactive surface.

use std::str::FromStr;

use serde::Serialize;
use store::{DailyState, LastCommitInfo};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::timer::TimerStatus;
use crate::types::ForceOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Register the periodic tick.
    Start,
    /// Deregister the periodic tick.
    Stop,
    ForceCommit,
    /// The configuration changed; re-evaluate whether and how often to tick.
    ScheduleUpdated,
    /// Report timer, lock and today's state.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command {0:?} (expected start, stop, force, reload or status)")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Accepts both the short CLI words and the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "force" | "force_commit" => Ok(Command::ForceCommit),
            "reload" | "schedule_updated" => Ok(Command::ScheduleUpdated),
            "status" => Ok(Command::Status),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub timer: Option<TimerStatus>,
    pub commit_in_flight: bool,
    pub today: DailyState,
    pub last_commit: Option<LastCommitInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reply", rename_all = "camelCase")]
pub enum Reply {
    Started {
        #[serde(rename = "intervalSecs")]
        interval_secs: u64,
    },
    Stopped {
        #[serde(rename = "wasRunning")]
        was_running: bool,
    },
    Force(ForceOutcome),
    Status(StatusReport),
    Error {
        message: String,
    },
}

/// A command paired with the channel its reply goes back on.
pub struct Envelope {
    pub command: Command,
    pub reply_tx: oneshot::Sender<Reply>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_wire_names() {
        assert_eq!("start".parse(), Ok(Command::Start));
        assert_eq!("STOP".parse(), Ok(Command::Stop));
        assert_eq!("FORCE_COMMIT".parse(), Ok(Command::ForceCommit));
        assert_eq!(" force ".parse(), Ok(Command::ForceCommit));
        assert_eq!("SCHEDULE_UPDATED".parse(), Ok(Command::ScheduleUpdated));
        assert_eq!("reload".parse(), Ok(Command::ScheduleUpdated));
        assert_eq!("status".parse(), Ok(Command::Status));
    }

    #[test]
    fn rejects_unknown() {
        let err = "launch".parse::<Command>().unwrap_err();
        assert!(err.to_string().contains("launch"));
    }
}
