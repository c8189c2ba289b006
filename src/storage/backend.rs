//! Repository trait definition
//!
//! The repository is the source of truth for hosts, checks and their status.
//! Callers re-read checks on every run instead of caching them.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::{StorageError, StorageResult};
use crate::{Event, Host, HostService, Interval, Status, StatusCounts};

/// Persistence operations used by the monitoring core
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared between the
/// registry actor, scheduled check runs and API handlers.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Load one check together with its service and host names
    async fn load_check(&self, id: i64) -> StorageResult<HostService>;

    async fn load_host(&self, id: i64) -> StorageResult<Host>;

    async fn set_check_interval(&self, id: i64, interval: Interval) -> StorageResult<()>;

    /// Store the outcome of a run, leaving the active flag and interval alone
    async fn record_result(
        &self,
        id: i64,
        status: Status,
        last_check: DateTime<Utc>,
        message: &str,
    ) -> StorageResult<()>;

    async fn set_check_active(&self, id: i64, active: bool) -> StorageResult<()>;

    /// Append to the event history. Returns the new event id.
    async fn append_event(&self, event: &Event) -> StorageResult<i64>;

    /// Event history, oldest first
    async fn list_events(&self) -> StorageResult<Vec<Event>>;

    /// Active checks on active hosts, ordered by check id
    async fn list_active_checks(&self) -> StorageResult<Vec<HostService>>;

    /// Status counts over active checks
    async fn aggregate_status_counts(&self) -> StorageResult<StatusCounts>;
}

/// Bound a repository call by `limit`
pub async fn with_timeout<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = StorageResult<T>>,
) -> StorageResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(operation)),
    }
}
