//! Maps inbound [`Command`]s onto the timer, dispatcher and force path.

use std::sync::Arc;

use common::time::local_now;
use store::ScheduleMode;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::command::{Command, Envelope, Reply, StatusReport};
use crate::engine::Scheduler;
use crate::timer::{Timer, TimerStatus};

pub const TICK_TIMER_NAME: &str = "streak-tick";

/// Timer cadence per schedule mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickIntervals {
    /// Must not exceed the slot tolerance, or slots can be skipped.
    pub fixed: Duration,
    pub random: Duration,
}

impl Default for TickIntervals {
    fn default() -> Self {
        Self {
            fixed: Duration::from_secs(5 * 60),
            random: Duration::from_secs(5 * 60),
        }
    }
}

impl TickIntervals {
    pub fn for_mode(&self, mode: ScheduleMode) -> Duration {
        match mode {
            ScheduleMode::Fixed => self.fixed,
            ScheduleMode::Random => self.random,
        }
    }
}

pub struct Controller {
    scheduler: Arc<Scheduler>,
    timer: Timer,
    intervals: TickIntervals,
    initial_delay: Duration,
}

impl Controller {
    pub fn new(scheduler: Arc<Scheduler>, intervals: TickIntervals, initial_delay: Duration) -> Self {
        Self {
            scheduler,
            timer: Timer::new(),
            intervals,
            initial_delay,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn timer_status(&self) -> Option<TimerStatus> {
        self.timer.status()
    }

    pub async fn handle(&self, command: Command) -> Reply {
        info!(?command, "handling command");

        match command {
            Command::Start => self.start().await,
            Command::Stop => Reply::Stopped {
                was_running: self.timer.deregister(),
            },
            Command::ForceCommit => Reply::Force(self.scheduler.force_commit(local_now()).await),
            Command::ScheduleUpdated => self.reschedule().await,
            Command::Status => self.status().await,
        }
    }

    /// Serves commands until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { command, reply_tx }) = rx.recv().await {
            let reply = self.handle(command).await;
            if reply_tx.send(reply).is_err() {
                warn!(?command, "command reply dropped; caller went away");
            }
        }
        info!("command channel closed");
    }

    async fn start(&self) -> Reply {
        // Registration does not depend on `enabled`; ticks check it themselves.
        match self.scheduler.store().configuration().await {
            Ok(cfg) => {
                let mode = cfg.map(|c| c.schedule_mode).unwrap_or_default();
                Reply::Started {
                    interval_secs: self.register(mode).as_secs(),
                }
            }
            Err(e) => Reply::Error {
                message: format!("{e:#}"),
            },
        }
    }

    async fn reschedule(&self) -> Reply {
        match self.scheduler.store().configuration().await {
            Ok(Some(cfg)) if cfg.enabled => Reply::Started {
                interval_secs: self.register(cfg.schedule_mode).as_secs(),
            },
            Ok(_) => Reply::Stopped {
                was_running: self.timer.deregister(),
            },
            Err(e) => Reply::Error {
                message: format!("{e:#}"),
            },
        }
    }

    fn register(&self, mode: ScheduleMode) -> Duration {
        let interval = self.intervals.for_mode(mode);
        self.scheduler.set_tick_interval(interval);

        let scheduler = Arc::clone(&self.scheduler);
        self.timer
            .register(TICK_TIMER_NAME, interval, self.initial_delay, move || {
                let scheduler = Arc::clone(&scheduler);
                async move {
                    scheduler.tick(local_now()).await;
                }
            });

        interval
    }

    async fn status(&self) -> Reply {
        let store = self.scheduler.store();

        let today = match store.daily_state(local_now().date()).await {
            Ok(s) => s,
            Err(e) => {
                return Reply::Error {
                    message: format!("{e:#}"),
                };
            }
        };

        let last_commit = match store.last_commit().await {
            Ok(l) => l,
            Err(e) => {
                return Reply::Error {
                    message: format!("{e:#}"),
                };
            }
        };

        Reply::Status(StatusReport {
            timer: self.timer.status(),
            commit_in_flight: self.scheduler.guard().is_busy(),
            today,
            last_commit,
        })
    }
}
