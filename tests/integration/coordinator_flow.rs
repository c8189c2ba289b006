//! End-to-end check runs through the coordinator
//!
//! These tests verify that:
//! - A transition appends one event and emits status and count notifications
//! - An unchanged status only refreshes the last check time
//! - Counts are read fresh after every transition

use std::sync::Arc;

use pretty_assertions::assert_eq;
use service_watch::{
    Host, ServiceType, Status,
    monitors::NetworkProber,
    notifications::events,
    storage::{MemoryRepository, Repository},
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn healthy_target() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn network_prober() -> Arc<NetworkProber> {
    Arc::new(NetworkProber::new(Default::default()).unwrap())
}

#[tokio::test]
async fn test_pending_check_becomes_healthy() {
    let server = healthy_target().await;
    let repository = Arc::new(MemoryRepository::new());
    let check = seed_check(
        &repository,
        "web",
        &server.uri(),
        ServiceType::Http,
        Status::Pending,
    )
    .await;

    let mut harness = TestMonitor::spawn(repository.clone(), network_prober());
    let response = harness.monitor.run_check_now(check.id).await;

    assert!(response.ok, "check should succeed: {}", response.message);
    assert_eq!(response.old_status, Status::Pending);
    assert_eq!(response.new_status, Status::Healthy);
    assert_eq!(response.host_service_id, check.id);
    assert_eq!(response.service_id, 1);
    assert!(response.message.ends_with("200 OK"), "{}", response.message);

    let notifications = harness.drain().await;
    let status_changed = named(&notifications, events::STATUS_CHANGED);
    assert_eq!(status_changed.len(), 1);
    assert_eq!(status_changed[0].data["status"], "Healthy");
    assert_eq!(status_changed[0].data["last_run"], "Pending");
    assert_eq!(status_changed[0].channel, "public-channel");
    assert_eq!(named(&notifications, events::COUNT_CHANGED).len(), 1);
    assert_eq!(named(&notifications, events::SCHEDULE_CHANGED).len(), 1);

    let history = repository.list_events().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event_type, Status::Healthy);
    assert_eq!(history[0].host_service_id, check.id);
    // history keeps the probe's own message
    assert_eq!(history[0].message, format!("{} - 200 OK", server.uri()));

    let stored = repository.load_check(check.id).await.unwrap();
    assert_eq!(stored.status, Status::Healthy);
    assert!(stored.last_check.is_some());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_unchanged_status_only_refreshes_last_check() {
    let server = healthy_target().await;
    let repository = Arc::new(MemoryRepository::new());
    let check = seed_check(
        &repository,
        "web",
        &server.uri(),
        ServiceType::Http,
        Status::Healthy,
    )
    .await;
    assert!(check.last_check.is_none());

    let mut harness = TestMonitor::spawn(repository.clone(), network_prober());
    let response = harness.monitor.run_check_now(check.id).await;

    assert!(response.ok);
    assert_eq!(response.old_status, Status::Healthy);
    assert_eq!(response.new_status, Status::Healthy);

    let notifications = harness.drain().await;
    assert!(named(&notifications, events::STATUS_CHANGED).is_empty());
    assert!(named(&notifications, events::COUNT_CHANGED).is_empty());

    let schedule_changed = named(&notifications, events::SCHEDULE_CHANGED);
    assert_eq!(schedule_changed.len(), 1);
    assert_eq!(schedule_changed[0].data["status"], "Healthy");
    assert_eq!(schedule_changed[0].data["next_run"], "Pending");
    assert_eq!(schedule_changed[0].data["last_run"], response.last_check);

    assert!(repository.list_events().await.unwrap().is_empty());
    let stored = repository.load_check(check.id).await.unwrap();
    assert!(stored.last_check.is_some());

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_target_changes_status_once() {
    let repository = Arc::new(MemoryRepository::new());
    let check = seed_check(
        &repository,
        "gone",
        "http://127.0.0.1:1",
        ServiceType::Http,
        Status::Healthy,
    )
    .await;

    let mut harness = TestMonitor::spawn(repository.clone(), network_prober());

    let first = harness.monitor.run_check_now(check.id).await;
    let second = harness.monitor.run_check_now(check.id).await;

    assert_eq!(first.new_status, Status::Problem);
    assert_eq!(second.new_status, Status::Problem);
    assert!(first.message.ends_with("error connecting"), "{}", first.message);

    let notifications = harness.drain().await;
    let status_changed = named(&notifications, events::STATUS_CHANGED);
    assert_eq!(status_changed.len(), 1);
    assert_eq!(status_changed[0].data["status"], "Problem");
    assert_eq!(repository.list_events().await.unwrap().len(), 1);

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_counts_are_read_after_each_transition() {
    let repository = Arc::new(MemoryRepository::new());
    let host = repository
        .insert_host(Host::new("farm", "https://farm.example"))
        .await;
    for status in [Status::Healthy, Status::Healthy, Status::Warning] {
        seed_check_on(&repository, &host, ServiceType::Https, every_minutes(5), status).await;
    }
    let pending =
        seed_check_on(&repository, &host, ServiceType::Http, every_minutes(5), Status::Pending)
            .await;

    let prober = ScriptedProber::always(Status::Healthy);
    let mut harness = TestMonitor::spawn(repository.clone(), prober);
    harness.monitor.run_check_now(pending.id).await;

    let notifications = harness.drain().await;
    let counts = named(&notifications, events::COUNT_CHANGED);
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].data["healthy_count"], "3");
    assert_eq!(counts[0].data["warning_count"], "1");
    assert_eq!(counts[0].data["pending_count"], "0");
    assert_eq!(counts[0].data["problem_count"], "0");

    harness.monitor.shutdown().await;
}

#[tokio::test]
async fn test_second_transition_reports_last_run() {
    let repository = Arc::new(MemoryRepository::new());
    let check = seed_check(
        &repository,
        "flappy",
        "http://flappy",
        ServiceType::Http,
        Status::Pending,
    )
    .await;

    let prober = ScriptedProber::sequence(vec![Status::Healthy, Status::Problem]);
    let mut harness = TestMonitor::spawn(repository.clone(), prober);

    harness.monitor.run_check_now(check.id).await;
    let second = harness.monitor.run_check_now(check.id).await;

    let notifications = harness.drain().await;
    let status_changed = named(&notifications, events::STATUS_CHANGED);
    assert_eq!(status_changed.len(), 2);
    assert_eq!(status_changed[0].data["last_run"], "Pending");
    assert_ne!(status_changed[1].data["last_run"], "Pending");
    assert_eq!(second.old_status, Status::Healthy);
    assert_eq!(second.new_status, Status::Problem);

    harness.monitor.shutdown().await;
}
