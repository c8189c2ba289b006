//! SQLite repository implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers (API, counts) do not block the check writers
//! - **Connection pooling**: Shared between scheduled runs and API handlers
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Timestamps are stored as Unix milliseconds.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::Repository;
use super::error::{StorageError, StorageResult};
use crate::{Event, Host, HostService, Interval, ServiceType, Status, StatusCounts};

const CHECK_COLUMNS: &str = r#"
    hs.id, hs.host_id, hs.service_id, hs.active, hs.schedule_number, hs.schedule_unit,
    hs.last_check, hs.status, hs.last_message,
    s.service_name, s.icon, h.host_name
"#;

/// SQLite-backed repository
pub struct SqliteRepository {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteRepository {
    /// Open (or create) the database and run migrations
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite repository at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Insert a host, returning it with its id
    pub async fn insert_host(&self, mut host: Host) -> StorageResult<Host> {
        let result = sqlx::query(
            "INSERT INTO hosts (host_name, canonical_name, url, active) VALUES (?, ?, ?, ?)",
        )
        .bind(&host.host_name)
        .bind(&host.canonical_name)
        .bind(&host.url)
        .bind(host.active)
        .execute(&self.pool)
        .await?;

        host.id = result.last_insert_rowid();
        Ok(host)
    }

    /// Insert a check, returning it with its id
    pub async fn insert_check(&self, check: HostService) -> StorageResult<HostService> {
        let result = sqlx::query(
            r#"
            INSERT INTO host_services (
                host_id, service_id, active, schedule_number, schedule_unit,
                last_check, status, last_message
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(check.host_id)
        .bind(check.service_id())
        .bind(check.active)
        .bind(i64::from(check.interval.number))
        .bind(check.interval.unit.as_str())
        .bind(check.last_check.as_ref().map(timestamp_to_millis))
        .bind(check.status.as_db_str())
        .bind(&check.last_message)
        .execute(&self.pool)
        .await?;

        self.load_check(result.last_insert_rowid()).await
    }

    pub async fn set_host_active(&self, id: i64, active: bool) -> StorageResult<()> {
        let result = sqlx::query("UPDATE hosts SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound { entity: "host", id });
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn check_from_row(row: &SqliteRow) -> StorageResult<HostService> {
    let id: i64 = row.try_get("id")?;

    let service_id: i64 = row.try_get("service_id")?;
    let service_type = ServiceType::from_service_id(service_id).ok_or_else(|| {
        StorageError::InvalidRecord(format!("host service {id}: unknown service id {service_id}"))
    })?;

    let number: i64 = row.try_get("schedule_number")?;
    let number = u32::try_from(number)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            StorageError::InvalidRecord(format!("host service {id}: bad schedule number {number}"))
        })?;
    let unit: String = row.try_get("schedule_unit")?;
    let unit = unit
        .parse()
        .map_err(|e| StorageError::InvalidRecord(format!("host service {id}: {e}")))?;

    let status: String = row.try_get("status")?;
    let status: Status = status
        .parse()
        .map_err(|e| StorageError::InvalidRecord(format!("host service {id}: {e}")))?;

    Ok(HostService {
        id,
        host_id: row.try_get("host_id")?,
        host_name: row.try_get("host_name")?,
        service_type,
        service_name: row.try_get("service_name")?,
        icon: row.try_get("icon")?,
        active: row.try_get("active")?,
        interval: Interval::new(number, unit),
        status,
        last_check: row
            .try_get::<Option<i64>, _>("last_check")?
            .map(millis_to_timestamp),
        last_message: row.try_get("last_message")?,
    })
}

fn event_from_row(row: &SqliteRow) -> StorageResult<Event> {
    let event_type: String = row.try_get("event_type")?;
    let event_type = event_type
        .parse()
        .map_err(|e| StorageError::InvalidRecord(format!("event: {e}")))?;

    Ok(Event {
        id: Some(row.try_get("id")?),
        host_service_id: row.try_get("host_service_id")?,
        event_type,
        host_id: row.try_get("host_id")?,
        service_name: row.try_get("service_name")?,
        host_name: row.try_get("host_name")?,
        message: row.try_get("message")?,
        created_at: millis_to_timestamp(row.try_get("created_at")?),
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    #[instrument(skip(self))]
    async fn load_check(&self, id: i64) -> StorageResult<HostService> {
        let sql = format!(
            r#"
            SELECT {CHECK_COLUMNS}
            FROM host_services hs
                JOIN services s ON (s.id = hs.service_id)
                JOIN hosts h ON (h.id = hs.host_id)
            WHERE hs.id = ?
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound {
                entity: "host service",
                id,
            })?;

        check_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn load_host(&self, id: i64) -> StorageResult<Host> {
        let row = sqlx::query(
            "SELECT id, host_name, canonical_name, url, active FROM hosts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound { entity: "host", id })?;

        Ok(Host {
            id: row.try_get("id")?,
            host_name: row.try_get("host_name")?,
            canonical_name: row.try_get("canonical_name")?,
            url: row.try_get("url")?,
            active: row.try_get("active")?,
        })
    }

    #[instrument(skip(self))]
    async fn set_check_interval(&self, id: i64, interval: Interval) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE host_services SET schedule_number = ?, schedule_unit = ? WHERE id = ?",
        )
        .bind(i64::from(interval.number))
        .bind(interval.unit.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "host service",
                id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn record_result(
        &self,
        id: i64,
        status: Status,
        last_check: DateTime<Utc>,
        message: &str,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE host_services SET status = ?, last_check = ?, last_message = ? WHERE id = ?",
        )
        .bind(status.as_db_str())
        .bind(timestamp_to_millis(&last_check))
        .bind(message)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "host service",
                id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_check_active(&self, id: i64, active: bool) -> StorageResult<()> {
        let result = sqlx::query("UPDATE host_services SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "host service",
                id,
            });
        }
        Ok(())
    }

    #[instrument(skip(self, event), fields(host_service_id = event.host_service_id))]
    async fn append_event(&self, event: &Event) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO events (
                host_service_id, event_type, host_id, service_name, host_name,
                message, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.host_service_id)
        .bind(event.event_type.as_db_str())
        .bind(event.host_id)
        .bind(&event.service_name)
        .bind(&event.host_name)
        .bind(&event.message)
        .bind(timestamp_to_millis(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_events(&self) -> StorageResult<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, host_service_id, event_type, host_id, service_name, host_name,
                   message, created_at
            FROM events
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn list_active_checks(&self) -> StorageResult<Vec<HostService>> {
        let sql = format!(
            r#"
            SELECT {CHECK_COLUMNS}
            FROM host_services hs
                JOIN services s ON (s.id = hs.service_id)
                JOIN hosts h ON (h.id = hs.host_id)
            WHERE h.active = 1 AND hs.active = 1
            ORDER BY hs.id ASC
            "#
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let checks = rows
            .iter()
            .map(check_from_row)
            .collect::<StorageResult<Vec<_>>>()?;

        debug!("{} active checks", checks.len());
        Ok(checks)
    }

    #[instrument(skip(self))]
    async fn aggregate_status_counts(&self) -> StorageResult<StatusCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(status = 'pending'), 0) AS pending,
                COALESCE(SUM(status = 'healthy'), 0) AS healthy,
                COALESCE(SUM(status = 'warning'), 0) AS warning,
                COALESCE(SUM(status = 'problem'), 0) AS problem
            FROM host_services
            WHERE active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            pending: row.try_get("pending")?,
            healthy: row.try_get("healthy")?,
            warning: row.try_get("warning")?,
            problem: row.try_get("problem")?,
        })
    }
}
