//! Schedule registry lifecycle tests
//!
//! These tests verify that:
//! - Bootstrap schedules exactly the active checks on active hosts
//! - Activation replaces instead of stacking jobs
//! - Deactivation is idempotent
//! - The monitoring toggle removes and restores every entry
//! - Scheduled jobs fire and survive a panicking run

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use service_watch::{
    Host, Interval, ScheduleUnit, ServiceType, Status,
    monitor::{MonitorError, MonitorSettings},
    notifications::events,
    storage::{MemoryRepository, Repository},
};

use crate::helpers::*;

#[tokio::test]
async fn test_bootstrap_schedules_active_checks_only() {
    let repository = Arc::new(MemoryRepository::new());
    let live = repository.insert_host(Host::new("live", "http://live")).await;
    let retired = repository
        .insert_host(Host::new("retired", "http://retired"))
        .await;

    let scheduled =
        seed_check_on(&repository, &live, ServiceType::Http, every_minutes(5), Status::Pending)
            .await;
    let paused =
        seed_check_on(&repository, &live, ServiceType::Https, every_minutes(5), Status::Pending)
            .await;
    repository.set_check_active(paused.id, false).await.unwrap();
    seed_check_on(&repository, &retired, ServiceType::Http, every_minutes(5), Status::Pending)
        .await;
    repository.set_host_active(retired.id, false).await.unwrap();

    let mut harness =
        TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Healthy));
    let count = harness.monitor.bootstrap().await.unwrap();
    assert_eq!(count, 1);

    let notifications = harness.drain().await;
    assert_eq!(notifications[0].event, events::APP_STARTING);
    assert_eq!(notifications[0].data["message"], "Monitoring is starting...");

    let scheduling = named(&notifications, events::SCHEDULE_CHANGED);
    assert_eq!(scheduling.len(), 1);
    assert_eq!(scheduling[0].data["host_service_id"], scheduled.id.to_string());
    assert_eq!(scheduling[0].data["next_run"], "Pending");
    assert_eq!(scheduling[0].data["last_run"], "Pending");
    assert_eq!(scheduling[0].data["message"], "scheduling");

    let schedule = harness.monitor.schedule().await.unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].host_service_id, scheduled.id);
    assert_ne!(schedule[0].next_run, "Pending");

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_activate_twice_keeps_one_entry() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let harness = TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Healthy));
    assert!(harness.monitor.activate_check(check.id).await.unwrap());

    assert!(harness.monitor.activate_check(check.id).await.unwrap());
    let rescheduled = harness
        .monitor
        .set_check_interval(check.id, Interval::new(2, ScheduleUnit::Hours))
        .await
        .unwrap();
    assert!(rescheduled);

    let schedule = harness.monitor.schedule().await.unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].schedule, "@every 2h");

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_deactivate_is_idempotent() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let mut harness =
        TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Healthy));
    harness.monitor.activate_check(check.id).await.unwrap();
    harness.drain().await;

    assert!(harness.monitor.deactivate_check(check.id).await.unwrap());
    assert!(!harness.monitor.deactivate_check(check.id).await.unwrap());

    let notifications = harness.drain().await;
    let removed = named(&notifications, events::SCHEDULE_REMOVED);
    assert_eq!(removed.len(), 2);
    assert_eq!(removed[0].data["host_service_id"], check.id.to_string());

    assert!(!repository.load_check(check.id).await.unwrap().active);
    assert!(harness.monitor.schedule().await.unwrap().is_empty());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_unknown_check_is_not_found() {
    let repository = Arc::new(MemoryRepository::new());
    let harness = TestMonitor::spawn(repository, ScriptedProber::always(Status::Healthy));

    assert_matches!(
        harness.monitor.activate_check(404).await,
        Err(MonitorError::NotFound(404))
    );
    assert_matches!(
        harness.monitor.deactivate_check(404).await,
        Err(MonitorError::NotFound(404))
    );

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_zero_interval_fails_registration() {
    let repository = Arc::new(MemoryRepository::new());
    let host = repository.insert_host(Host::new("web", "http://web")).await;
    let broken = seed_check_on(
        &repository,
        &host,
        ServiceType::Http,
        Interval::new(0, ScheduleUnit::Minutes),
        Status::Pending,
    )
    .await;

    repository.set_check_active(broken.id, false).await.unwrap();

    let harness = TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Healthy));
    assert_matches!(
        harness.monitor.activate_check(broken.id).await,
        Err(MonitorError::Schedule(_))
    );
    assert!(harness.monitor.schedule().await.unwrap().is_empty());
    // a check that cannot be scheduled is not marked active
    assert!(!repository.load_check(broken.id).await.unwrap().active);

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_oversized_interval_leaves_registry_running() {
    let repository = Arc::new(MemoryRepository::new());
    let host = repository.insert_host(Host::new("web", "http://web")).await;
    let huge = seed_check_on(
        &repository,
        &host,
        ServiceType::Http,
        Interval::new(u32::MAX, ScheduleUnit::Hours),
        Status::Pending,
    )
    .await;
    let normal =
        seed_check_on(&repository, &host, ServiceType::Https, every_minutes(5), Status::Pending)
            .await;

    let harness = TestMonitor::spawn(repository, ScriptedProber::always(Status::Healthy));

    // bootstrap hands the oversized interval straight to the registry
    assert_eq!(harness.monitor.bootstrap().await.unwrap(), 1);
    assert_matches!(
        harness.monitor.activate_check(huge.id).await,
        Err(MonitorError::Schedule(_))
    );
    assert!(harness.monitor.activate_check(normal.id).await.unwrap());

    let schedule = harness.monitor.schedule().await.unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].host_service_id, normal.id);
    assert!(harness.monitor.is_monitoring().await.unwrap());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_deactivate_during_run_keeps_check_inactive() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let prober = SlowProber::new(Duration::from_millis(300), Status::Problem);
    let harness = TestMonitor::spawn(repository.clone(), prober);
    harness.monitor.activate_check(check.id).await.unwrap();

    let run = tokio::spawn({
        let monitor = harness.monitor.clone();
        async move { monitor.run_check_now(check.id).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(harness.monitor.deactivate_check(check.id).await.unwrap());
    let edited = harness
        .monitor
        .set_check_interval(check.id, Interval::new(1, ScheduleUnit::Hours))
        .await
        .unwrap();
    assert!(!edited);

    let response = run.await.unwrap();
    assert!(response.ok);

    // the in-flight run writes its result and nothing else
    let stored = repository.load_check(check.id).await.unwrap();
    assert!(!stored.active);
    assert_eq!(stored.interval, Interval::new(1, ScheduleUnit::Hours));
    assert_eq!(stored.status, Status::Problem);
    assert_eq!(stored.last_message, "http://web - slow answer");

    assert!(repository.list_active_checks().await.unwrap().is_empty());
    assert_eq!(repository.aggregate_status_counts().await.unwrap().problem, 0);
    assert!(harness.monitor.schedule().await.unwrap().is_empty());
    assert_eq!(harness.monitor.bootstrap().await.unwrap(), 0);

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_monitoring_toggle() {
    let repository = Arc::new(MemoryRepository::new());
    let host = repository.insert_host(Host::new("web", "http://web")).await;
    for service_type in [ServiceType::Http, ServiceType::Https, ServiceType::TlsCertificate] {
        seed_check_on(&repository, &host, service_type, every_minutes(10), Status::Pending).await;
    }

    let mut harness =
        TestMonitor::spawn(repository.clone(), ScriptedProber::always(Status::Healthy));
    assert_eq!(harness.monitor.bootstrap().await.unwrap(), 3);
    harness.drain().await;

    assert_eq!(harness.monitor.set_monitoring(false).await.unwrap(), 3);
    assert!(!harness.monitor.is_monitoring().await.unwrap());
    assert!(harness.monitor.schedule().await.unwrap().is_empty());
    assert_eq!(named(&harness.drain().await, events::SCHEDULE_REMOVED).len(), 3);

    // Activation is a no-op while monitoring is off
    assert!(!harness.monitor.activate_check(1).await.unwrap());
    assert!(harness.monitor.schedule().await.unwrap().is_empty());

    assert_eq!(harness.monitor.set_monitoring(true).await.unwrap(), 3);
    assert_eq!(harness.monitor.schedule().await.unwrap().len(), 3);

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_disabled_at_start_schedules_nothing() {
    let repository = Arc::new(MemoryRepository::new());
    seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let settings = MonitorSettings {
        monitoring_live: false,
        ..Default::default()
    };
    let mut harness =
        TestMonitor::spawn_with(settings, repository, ScriptedProber::always(Status::Healthy));

    assert_eq!(harness.monitor.bootstrap().await.unwrap(), 0);
    assert!(harness.drain().await.is_empty());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_schedule_is_sorted_by_host() {
    let repository = Arc::new(MemoryRepository::new());
    for name in ["zulu", "alpha", "mike"] {
        seed_check(
            &repository,
            name,
            &format!("http://{name}"),
            ServiceType::Http,
            Status::Pending,
        )
        .await;
    }

    let harness = TestMonitor::spawn(repository, ScriptedProber::always(Status::Healthy));
    harness.monitor.bootstrap().await.unwrap();

    let hosts: Vec<String> = harness
        .monitor
        .schedule()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.host)
        .collect();
    assert_eq!(hosts, vec!["alpha", "mike", "zulu"]);

    harness.monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_job_runs_the_check() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let prober = ScriptedProber::always(Status::Healthy);
    let harness = TestMonitor::spawn(repository.clone(), prober.clone());
    harness.monitor.bootstrap().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;

    assert_eq!(prober.calls(), 1);
    let stored = repository.load_check(check.id).await.unwrap();
    assert_eq!(stored.status, Status::Healthy);

    let schedule = harness.monitor.schedule().await.unwrap();
    assert_ne!(schedule[0].last_run, "Pending");

    harness.monitor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_panicking_run_keeps_job_scheduled() {
    let repository = Arc::new(MemoryRepository::new());
    let check =
        seed_check(&repository, "web", "http://web", ServiceType::Http, Status::Pending).await;

    let prober = PanicOnceProber::new();
    let harness = TestMonitor::spawn(repository.clone(), prober.clone());
    harness.monitor.bootstrap().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(prober.calls(), 1);
    assert_eq!(
        repository.load_check(check.id).await.unwrap().status,
        Status::Pending
    );

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(prober.calls(), 2);
    assert_eq!(
        repository.load_check(check.id).await.unwrap().status,
        Status::Healthy
    );

    harness.monitor.shutdown().await;
}
