//! Actor-based scheduling core
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  Monitor facade  │◀──── API / binary
//!                 └────────┬─────────┘
//!                          │ RegistryCommand (mpsc + oneshot)
//!                 ┌────────▼─────────┐
//!                 │  RegistryActor   │ owns check id → job id
//!                 └────────┬─────────┘
//!                          │ add / remove
//!                 ┌────────▼─────────┐
//!                 │    JobEngine     │ one driver task per job
//!                 └────────┬─────────┘
//!                          │ CheckJob::run
//!                 ┌────────▼─────────┐
//!                 │ CheckCoordinator │──▶ Repository, Prober, Notifier
//!                 └──────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the registry has an mpsc command channel
//! 2. **Request/Response**: oneshot channels carry every reply
//! 3. **Events**: schedule and status changes go out through the [`Notifier`]
//!
//! [`Notifier`]: crate::notifications::Notifier

pub mod coordinator;
pub mod messages;
pub mod registry;

pub use coordinator::{CheckCoordinator, CheckNowResponse, CheckOutcome};
pub use messages::{RegistryCommand, ScheduleEntry};
pub use registry::{CheckJob, RegistryActor, RegistryHandle};
