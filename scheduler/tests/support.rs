#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use tokio::time::Duration;

use executor::{CommitClient, CommitGuard, CommitReceipt, CommitRequest};
use scheduler::policy::RandomSource;
use scheduler::{ScheduleSettings, Scheduler};
use store::memory::MemoryRepository;
use store::{Configuration, ScheduleMode, StateStore};

/// Counts calls; optionally sleeps and/or fails the first `n` calls.
#[derive(Default)]
pub struct MockCommitClient {
    calls: AtomicUsize,
    fail_remaining: AtomicUsize,
    delay: Duration,
}

impl MockCommitClient {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(times: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_remaining: AtomicUsize::new(times),
            ..Default::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommitClient for MockCommitClient {
    async fn create_commit(&self, _req: &CommitRequest) -> anyhow::Result<CommitReceipt> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            anyhow::bail!("rate limited");
        }

        Ok(CommitReceipt {
            sha: format!("sha-{n}"),
            date: Utc::now(),
        })
    }
}

/// Always returns the same draw.
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn sample(&self) -> f64 {
        self.0
    }
}

pub struct Harness {
    pub repo: Arc<MemoryRepository>,
    pub client: Arc<MockCommitClient>,
    pub scheduler: Arc<Scheduler>,
}

impl Harness {
    pub fn new(client: Arc<MockCommitClient>, draw: f64) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let store = Arc::new(StateStore::new(repo.clone()));
        let guard = Arc::new(CommitGuard::new(client.clone()));

        let scheduler = Scheduler::new(store, guard, ScheduleSettings::default())
            .with_random_source(Arc::new(FixedRandom(draw)));

        Self {
            repo,
            client,
            scheduler: Arc::new(scheduler),
        }
    }

    pub async fn configure(&self, cfg: &Configuration) {
        self.scheduler
            .store()
            .save_configuration(cfg)
            .await
            .expect("save configuration");
    }

    pub async fn count(&self, date: NaiveDate) -> u32 {
        self.scheduler
            .store()
            .daily_state(date)
            .await
            .expect("daily state")
            .count
    }

    /// Holds the commit lock from a background task until the client returns.
    pub async fn occupy_guard(&self, cfg: &Configuration) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        let cfg = cfg.clone();
        let handle = tokio::spawn(async move {
            let _ = scheduler.guard().execute(&cfg).await;
        });

        while !self.scheduler.guard().is_busy() {
            tokio::task::yield_now().await;
        }
        handle
    }
}

pub fn config(mode: ScheduleMode) -> Configuration {
    Configuration {
        enabled: true,
        schedule_mode: mode,
        commits_per_day: 3,
        fixed_times: vec!["09:00".into(), "15:00".into()],
        token: "ghp_test".into(),
        owner: "octo".into(),
        repo: "pulse".into(),
        file_path: "activity.md".into(),
        email: "octo@example.com".into(),
        author_name: "Octo".into(),
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    day(14).and_hms_opt(h, m, 0).unwrap()
}
