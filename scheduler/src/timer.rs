//! Named periodic wake-up backed by a tokio task.
//!
//! At most one registration exists at a time; registering again replaces it.
//! Each firing is awaited before the next sleep, so callbacks never overlap,
//! and runs in its own task so a panicking callback cannot end the timer.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{error, info};

struct Registration {
    name: String,
    interval: Duration,
    next_fire: Arc<Mutex<Instant>>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerStatus {
    pub name: String,
    #[serde(rename = "intervalSecs", serialize_with = "as_secs")]
    pub interval: Duration,
    #[serde(skip)]
    pub next_fire_in: Duration,
    #[serde(rename = "nextFireAt")]
    pub next_fire_at: DateTime<Local>,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

#[derive(Default)]
pub struct Timer {
    current: Mutex<Option<Registration>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `on_fire` to run every `interval`, first after `initial_delay`.
    pub fn register<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        initial_delay: Duration,
        mut on_fire: F,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let interval = interval.max(Duration::from_millis(1));
        let first = Instant::now() + initial_delay;
        let next_fire = Arc::new(Mutex::new(first));

        let next = Arc::clone(&next_fire);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let fired_at = ticker.tick().await;
                *next.lock() = fired_at + interval;

                if let Err(e) = tokio::spawn(on_fire()).await {
                    error!(timer = %task_name, error = %e, "timer callback panicked");
                }
            }
        });

        let previous = self.current.lock().replace(Registration {
            name: name.clone(),
            interval,
            next_fire,
            handle,
        });
        if let Some(prev) = previous {
            prev.handle.abort();
        }

        info!(
            timer = %name,
            interval_secs = interval.as_secs(),
            initial_delay_secs = initial_delay.as_secs(),
            "timer registered"
        );
    }

    /// Cancels the registration. Returns whether one existed.
    pub fn deregister(&self) -> bool {
        match self.current.lock().take() {
            Some(reg) => {
                reg.handle.abort();
                info!(timer = %reg.name, "timer deregistered");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub fn status(&self) -> Option<TimerStatus> {
        let guard = self.current.lock();
        let reg = guard.as_ref().filter(|r| !r.handle.is_finished())?;

        let next_fire_in = reg.next_fire.lock().saturating_duration_since(Instant::now());
        let delta = TimeDelta::from_std(next_fire_in).unwrap_or(TimeDelta::zero());

        Some(TimerStatus {
            name: reg.name.clone(),
            interval: reg.interval,
            next_fire_in,
            next_fire_at: Local::now() + delta,
        })
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(reg) = self.current.get_mut().take() {
            reg.handle.abort();
        }
    }
}
