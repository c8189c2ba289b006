//! Repository backends for hosts, checks and event history
//!
//! ## Design
//!
//! - **Trait-based**: `Repository` allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Authoritative**: status lives here only; the core never caches it
//!
//! ## Backends
//!
//! - **SQLite** (feature `storage-sqlite`): embedded database with migrations
//! - **In-Memory**: no persistence, for tests or config-seeded runs
//!
//! ## Usage
//!
//! ```no_run
//! use service_watch::storage::sqlite::SqliteRepository;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repository = SqliteRepository::new("./service-watch.db").await?;
//!     // Hand to Monitor::spawn
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{Repository, with_timeout};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryRepository;
