//! API shared state

use tokio::sync::broadcast;

use crate::monitor::Monitor;
use crate::notifications::Notification;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Running monitoring core
    pub monitor: Monitor,

    /// Notification stream forwarded to WebSocket clients
    pub notifications: broadcast::Sender<Notification>,
}

impl ApiState {
    pub fn new(monitor: Monitor, notifications: broadcast::Sender<Notification>) -> Self {
        Self {
            monitor,
            notifications,
        }
    }
}
