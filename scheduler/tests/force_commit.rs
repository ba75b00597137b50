mod support;

use std::sync::Arc;

use scheduler::ForceOutcome;
use store::ScheduleMode;
use store::model::FORCE_SLOT;
use support::{Harness, MockCommitClient, at, config, day};
use tokio::time::{Duration, Instant};

#[tokio::test(start_paused = true)]
async fn records_commit_under_the_force_slot() {
    let h = Harness::new(MockCommitClient::ok(), 0.0);
    h.configure(&config(ScheduleMode::Random)).await;

    let outcome = h.scheduler.force_commit(at(3, 0)).await;

    assert_eq!(outcome, ForceOutcome::Committed { sha: "sha-0".into() });
    let state = h.scheduler.store().daily_state(day(14)).await.unwrap();
    assert_eq!(state.count, 1);
    assert!(state.has_fired(FORCE_SLOT));
    assert_eq!(
        h.scheduler.store().last_commit().await.unwrap().unwrap().sha,
        "sha-0"
    );
}

#[tokio::test(start_paused = true)]
async fn ignores_the_enabled_flag() {
    let h = Harness::new(MockCommitClient::ok(), 0.0);
    let mut cfg = config(ScheduleMode::Fixed);
    cfg.enabled = false;
    h.configure(&cfg).await;

    assert!(h.scheduler.force_commit(at(12, 0)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn second_call_inside_cooldown_is_rejected() {
    let h = Harness::new(MockCommitClient::ok(), 0.0);
    h.configure(&config(ScheduleMode::Random)).await;

    assert!(h.scheduler.force_commit(at(12, 0)).await.is_ok());

    let outcome = h.scheduler.force_commit(at(12, 0)).await;
    let ForceOutcome::Rejected { cooldown, .. } = outcome else {
        panic!("expected cooldown rejection, got {outcome:?}");
    };
    assert_eq!(cooldown, Some(4));
    assert_eq!(h.client.calls(), 1);

    // Cooldown rejections are not errors.
    assert!(h.scheduler.store().error_log().await.unwrap().is_empty());

    tokio::time::advance(Duration::from_millis(2500)).await;
    let outcome = h.scheduler.force_commit(at(12, 0)).await;
    assert!(matches!(outcome, ForceOutcome::Rejected { cooldown: Some(2), .. }));

    tokio::time::advance(Duration::from_millis(1500)).await;
    assert!(h.scheduler.force_commit(at(12, 0)).await.is_ok());
    assert_eq!(h.client.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn busy_lock_is_retried_once_after_backoff() {
    let h = Harness::new(MockCommitClient::slow(Duration::from_secs(1)), 0.0);
    let cfg = config(ScheduleMode::Random);
    h.configure(&cfg).await;

    let background = h.occupy_guard(&cfg).await;
    let started = Instant::now();

    let outcome = h.scheduler.force_commit(at(12, 0)).await;

    assert_eq!(outcome, ForceOutcome::Committed { sha: "sha-1".into() });
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(h.client.calls(), 2);
    background.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn still_busy_after_retry_is_rejected() {
    let h = Harness::new(MockCommitClient::slow(Duration::from_secs(5)), 0.0);
    let cfg = config(ScheduleMode::Random);
    h.configure(&cfg).await;

    let background = h.occupy_guard(&cfg).await;

    let outcome = h.scheduler.force_commit(at(12, 0)).await;
    let ForceOutcome::Rejected { error, cooldown } = outcome else {
        panic!("expected busy rejection, got {outcome:?}");
    };
    assert!(error.contains("in flight"));
    assert_eq!(cooldown, None);
    assert_eq!(h.client.calls(), 1);
    assert_eq!(h.scheduler.store().error_log().await.unwrap().len(), 1);

    // A rejected force does not arm the cooldown.
    background.await.unwrap();
    assert!(h.scheduler.force_commit(at(12, 0)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn not_configured_is_rejected_and_logged() {
    let h = Harness::new(MockCommitClient::ok(), 0.0);

    let outcome = h.scheduler.force_commit(at(12, 0)).await;

    assert_eq!(
        outcome,
        ForceOutcome::Rejected {
            error: "not configured".into(),
            cooldown: None,
        }
    );
    assert_eq!(h.client.calls(), 0);
    let log = h.scheduler.store().error_log().await.unwrap();
    assert_eq!(log.entries()[0].message, "not configured");
}

#[tokio::test(start_paused = true)]
async fn external_failure_does_not_arm_cooldown() {
    let h = Harness::new(MockCommitClient::failing(1), 0.0);
    h.configure(&config(ScheduleMode::Random)).await;

    let outcome = h.scheduler.force_commit(at(12, 0)).await;
    assert!(matches!(
        outcome,
        ForceOutcome::Rejected { ref error, cooldown: None } if error.contains("rate limited")
    ));
    assert_eq!(h.count(day(14)).await, 0);

    assert!(h.scheduler.force_commit(at(12, 0)).await.is_ok());
    assert_eq!(h.client.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_does_not_consume_fixed_slots() {
    let h = Harness::new(MockCommitClient::ok(), 0.0);
    let mut cfg = config(ScheduleMode::Fixed);
    cfg.fixed_times = vec!["09:00".into()];
    h.configure(&cfg).await;

    assert!(h.scheduler.force_commit(at(9, 0)).await.is_ok());
    assert_eq!(
        h.scheduler.tick(at(9, 1)).await,
        scheduler::TickReport::Fixed(vec!["09:00".into()])
    );
    assert_eq!(h.count(day(14)).await, 2);
}

#[tokio::test(start_paused = true)]
async fn overlapping_force_sees_cooldown_armed_by_the_first() {
    let h = Harness::new(MockCommitClient::slow(Duration::from_secs(1)), 0.0);
    h.configure(&config(ScheduleMode::Random)).await;

    let scheduler = Arc::clone(&h.scheduler);
    let first = tokio::spawn(async move { scheduler.force_commit(at(12, 0)).await });
    while !h.scheduler.guard().is_busy() {
        tokio::task::yield_now().await;
    }

    // Backs off for 2s; the first call lands and arms the cooldown at 1s.
    let second = h.scheduler.force_commit(at(12, 0)).await;

    assert_eq!(
        first.await.unwrap(),
        ForceOutcome::Committed { sha: "sha-0".into() }
    );
    assert!(matches!(second, ForceOutcome::Rejected { cooldown: Some(3), .. }));
    assert_eq!(h.client.calls(), 1);
    assert_eq!(h.count(day(14)).await, 1);
}
