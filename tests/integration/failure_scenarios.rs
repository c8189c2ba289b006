//! Failure tests for the check pipeline
//!
//! These tests verify that the system handles failures gracefully:
//! - Notification sink failures never fail or hold up a check
//! - Repository failures abort a run without partial writes
//! - Stalled repository calls time out
//! - Manual runs always answer with a structured response

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use service_watch::{
    ServiceType, Status,
    monitor::{Monitor, MonitorSettings},
    notifications::events,
    storage::{MemoryRepository, Repository},
};

use crate::helpers::*;

#[tokio::test]
async fn test_sink_failure_does_not_fail_check() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let sink = FailingSink::new();
    let monitor = Monitor::spawn(
        MonitorSettings::default(),
        repository.clone(),
        sink.clone(),
        ScriptedProber::always(Status::Healthy),
    );

    let response = monitor.run_check_now(check.id).await;
    monitor.flush_notifications().await;

    assert!(response.ok);
    assert_eq!(response.new_status, Status::Healthy);
    // status-changed, count-changed, schedule-changed
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        repository.load_check(check.id).await.unwrap().status,
        Status::Healthy
    );
    assert_eq!(repository.list_events().await.unwrap().len(), 1);

    monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_sink_does_not_hold_check() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let sink = StallingSink::new(Duration::from_secs(2));
    let monitor = Monitor::spawn(
        MonitorSettings::default(),
        repository.clone(),
        sink.clone(),
        ScriptedProber::always(Status::Healthy),
    );

    let started = tokio::time::Instant::now();
    let response = monitor.run_check_now(check.id).await;
    assert!(response.ok);
    assert!(started.elapsed() < Duration::from_secs(2));

    // the registry keeps answering while deliveries are pending
    assert!(monitor.activate_check(check.id).await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(2));

    monitor.flush_notifications().await;
    // status-changed, count-changed, schedule-changed, scheduling
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_unknown_check_reports_generic_failure() {
    let repository = Arc::new(MemoryRepository::new());
    let prober = ScriptedProber::always(Status::Healthy);
    let mut harness = TestMonitor::spawn(repository, prober.clone());

    let response = harness.monitor.run_check_now(99).await;

    assert!(!response.ok);
    assert_eq!(response.message, "Something went wrong");
    assert_eq!(response.host_service_id, 99);
    assert_eq!(prober.calls(), 0);
    assert!(harness.drain().await.is_empty());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_result_write_failure_writes_nothing() {
    let inner = MemoryRepository::new();
    let check = seed_check(&inner, "web", "http://web", ServiceType::Http, Status::Pending).await;
    let repository = Arc::new(FaultyRepository {
        inner,
        fault: Fault::RecordResult,
    });

    let mut harness =
        TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Problem));
    let response = harness.monitor.run_check_now(check.id).await;

    assert!(!response.ok);
    assert!(harness.drain().await.is_empty());
    assert!(repository.list_events().await.unwrap().is_empty());

    let stored = repository.load_check(check.id).await.unwrap();
    assert_eq!(stored.status, Status::Pending);
    assert!(stored.last_check.is_none());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_event_append_failure_keeps_status_change() {
    let inner = MemoryRepository::new();
    let check = seed_check(&inner, "web", "http://web", ServiceType::Http, Status::Pending).await;
    let repository = Arc::new(FaultyRepository {
        inner,
        fault: Fault::AppendEvent,
    });

    let mut harness =
        TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Warning));
    let response = harness.monitor.run_check_now(check.id).await;

    assert!(response.ok);
    assert_eq!(response.new_status, Status::Warning);
    assert_eq!(
        repository.load_check(check.id).await.unwrap().status,
        Status::Warning
    );

    let notifications = harness.drain().await;
    assert_eq!(named(&notifications, events::STATUS_CHANGED).len(), 1);
    assert_eq!(named(&notifications, events::COUNT_CHANGED).len(), 1);

    harness.monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_repository_times_out() {
    let inner = MemoryRepository::new();
    let check = seed_check(&inner, "web", "http://web", ServiceType::Http, Status::Pending).await;
    let repository = Arc::new(FaultyRepository {
        inner,
        fault: Fault::StallLoad,
    });

    let prober = ScriptedProber::always(Status::Healthy);
    let harness = TestMonitor::spawn(repository, prober.clone());

    let started = tokio::time::Instant::now();
    let response = harness.monitor.run_check_now(check.id).await;

    assert!(!response.ok);
    assert_eq!(prober.calls(), 0);
    assert!(started.elapsed() < Duration::from_secs(60));

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_manual_run_after_shutdown_still_answers() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let mut harness = TestMonitor::spawn(repository, ScriptedProber::always(Status::Healthy));
    harness.monitor.shutdown().await;

    let response = harness.monitor.run_check_now(check.id).await;
    assert!(response.ok);

    let notifications = harness.drain().await;
    let schedule_changed = named(&notifications, events::SCHEDULE_CHANGED);
    assert_eq!(schedule_changed.len(), 1);
    assert_eq!(schedule_changed[0].data["next_run"], "Pending");
}
