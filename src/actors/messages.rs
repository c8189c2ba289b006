//! Message types for actor communication
//!
//! Commands travel over the registry's mpsc channel; every query carries a
//! oneshot sender for its reply.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::HostService;
use crate::scheduler::{JobId, JobState, ScheduleError};
use crate::storage::StorageResult;

/// Commands that can be sent to the RegistryActor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Schedule a check, replacing any job it already has
    ///
    /// Replies `Ok(false)` when global monitoring is disabled and nothing was
    /// scheduled.
    Activate {
        check: HostService,
        respond_to: oneshot::Sender<Result<bool, ScheduleError>>,
    },

    /// Stop scheduling a check
    ///
    /// Replies whether an entry existed. Always publishes one removal event.
    Deactivate {
        check_id: i64,
        respond_to: oneshot::Sender<bool>,
    },

    /// Schedule every active check from the repository
    ///
    /// Replies with the number of checks scheduled.
    Bootstrap {
        respond_to: oneshot::Sender<StorageResult<usize>>,
    },

    /// Toggle global monitoring
    ///
    /// Enabling bootstraps and replies with the number scheduled; disabling
    /// removes every entry and replies with the number removed.
    SetMonitoring {
        enabled: bool,
        respond_to: oneshot::Sender<StorageResult<usize>>,
    },

    /// Whether global monitoring is enabled
    IsMonitoring { respond_to: oneshot::Sender<bool> },

    /// Next fire time of a check's job
    NextRun {
        check_id: i64,
        respond_to: oneshot::Sender<Option<DateTime<Utc>>>,
    },

    /// Snapshot of every live schedule entry
    Entries {
        respond_to: oneshot::Sender<Vec<ScheduleEntry>>,
    },

    /// Remove every job and stop the actor
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Live binding between a check and its recurring job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub check_id: i64,
    pub job_id: JobId,
    /// Normalized interval handed to the job engine
    pub spec: String,
    pub state: JobState,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
}
