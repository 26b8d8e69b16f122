//! PostgreSQL implementations of the ledger and the schema target.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Row};

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::{Ledger, LedgerEntry, LedgerRecord};
use crate::target::SchemaTarget;
use crate::version::Version;

/// Opens a small connection pool for migration work.
pub async fn connect(database_url: &str) -> MigrateResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| MigrateError::LedgerUnavailable(format!("failed to connect: {e}")))
}

fn ledger_err(context: &str, err: sqlx::Error) -> MigrateError {
    MigrateError::LedgerUnavailable(format!("{context}: {err}"))
}

/// Ledger stored in a table of the target database itself.
///
/// The table name comes from configuration and is interpolated, not bound;
/// it is an operator-controlled identifier, not user input.
pub struct PgLedger {
    pool: PgPool,
    table: String,
}

impl PgLedger {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version VARCHAR(16) PRIMARY KEY,
                applied BOOLEAN NOT NULL DEFAULT FALSE,
                executed_at TIMESTAMPTZ,
                execution_ms BIGINT,
                success BOOLEAN,
                error_message TEXT
            )
            "#,
            self.table
        )
    }

    fn record_attempt_sql(&self) -> String {
        format!(
            r#"
            INSERT INTO {} (version, applied, executed_at, execution_ms, success, error_message)
            VALUES ($1, FALSE, $2, $3, $4, $5)
            ON CONFLICT (version) DO UPDATE SET
                executed_at = EXCLUDED.executed_at,
                execution_ms = EXCLUDED.execution_ms,
                success = EXCLUDED.success,
                error_message = EXCLUDED.error_message
            "#,
            self.table
        )
    }

    fn set_applied_sql(&self) -> String {
        format!("UPDATE {} SET applied = $2 WHERE version = $1", self.table)
    }

    fn select_applied_sql(&self) -> String {
        format!(
            "SELECT version FROM {} WHERE applied = TRUE ORDER BY version ASC",
            self.table
        )
    }

    fn select_entries_sql(&self) -> String {
        format!(
            "SELECT version, applied, executed_at, execution_ms, success, error_message FROM {} ORDER BY version ASC",
            self.table
        )
    }

    async fn set_applied(&self, version: &Version, applied: bool) -> MigrateResult<()> {
        let result = sqlx::query(&self.set_applied_sql())
            .bind(version.as_str())
            .bind(applied)
            .execute(&self.pool)
            .await
            .map_err(|e| ledger_err("failed to update applied flag", e))?;
        if result.rows_affected() == 0 {
            return Err(MigrateError::LedgerEntryMissing(version.clone()));
        }
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> Result<LedgerEntry, String> {
    let version_text: String = row
        .try_get("version")
        .map_err(|e| format!("version column: {e}"))?;
    let version =
        Version::parse(&version_text).map_err(|e| format!("unparseable version: {e}"))?;
    let applied: bool = row
        .try_get("applied")
        .map_err(|e| format!("applied column: {e}"))?;
    let executed_at: Option<DateTime<Utc>> = row
        .try_get("executed_at")
        .map_err(|e| format!("executed_at column: {e}"))?;
    let execution_ms: Option<i64> = row
        .try_get("execution_ms")
        .map_err(|e| format!("execution_ms column: {e}"))?;
    let success: Option<bool> = row
        .try_get("success")
        .map_err(|e| format!("success column: {e}"))?;
    let error_message: Option<String> = row
        .try_get("error_message")
        .map_err(|e| format!("error_message column: {e}"))?;

    let execution_time = match execution_ms {
        Some(ms) if ms < 0 => return Err(format!("negative execution time ({ms} ms)")),
        Some(ms) => Some(Duration::from_millis(ms as u64)),
        None => None,
    };

    Ok(LedgerEntry {
        version,
        applied,
        executed_at,
        execution_time,
        success,
        error_message,
    })
}

#[async_trait]
impl Ledger for PgLedger {
    async fn ensure_table(&self) -> MigrateResult<()> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| ledger_err("failed to create ledger table", e))?;
        Ok(())
    }

    async fn entries(&self) -> MigrateResult<Vec<LedgerRecord>> {
        let rows = sqlx::query(&self.select_entries_sql())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ledger_err("failed to read ledger", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_row(row) {
                Ok(entry) => records.push(LedgerRecord::Entry(entry)),
                Err(reason) => {
                    let version = row
                        .try_get::<String, _>("version")
                        .unwrap_or_else(|_| "<unknown>".to_string());
                    records.push(LedgerRecord::Corrupt { version, reason });
                }
            }
        }
        Ok(records)
    }

    async fn get_applied(&self) -> MigrateResult<Vec<Version>> {
        let rows = sqlx::query(&self.select_applied_sql())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ledger_err("failed to read applied versions", e))?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in &rows {
            let text: String = row
                .try_get("version")
                .map_err(|e| ledger_err("failed to decode version", e))?;
            let version = Version::parse(&text).map_err(|e| {
                MigrateError::LedgerUnavailable(format!(
                    "ledger contains unusable version '{text}': {e}"
                ))
            })?;
            versions.push(version);
        }
        versions.sort();
        Ok(versions)
    }

    async fn record_attempt(
        &self,
        version: &Version,
        success: bool,
        duration: Duration,
        error: Option<&str>,
    ) -> MigrateResult<()> {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        sqlx::query(&self.record_attempt_sql())
            .bind(version.as_str())
            .bind(Utc::now())
            .bind(millis)
            .bind(success)
            .bind(error)
            .execute(&self.pool)
            .await
            .map_err(|e| ledger_err("failed to record attempt", e))?;
        Ok(())
    }

    async fn mark_applied(&self, version: &Version) -> MigrateResult<()> {
        self.set_applied(version, true).await
    }

    async fn mark_reverted(&self, version: &Version) -> MigrateResult<()> {
        self.set_applied(version, false).await
    }
}

/// Runs migration scripts against a PostgreSQL database.
pub struct PgTarget {
    pool: PgPool,
}

impl PgTarget {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaTarget for PgTarget {
    /// Executes the script through the simple query protocol, so a body with
    /// several statements runs as one batch.
    async fn run_script(&self, script: &str) -> MigrateResult<()> {
        self.pool
            .execute(script)
            .await
            .map_err(|e| MigrateError::Target(e.to_string()))?;
        Ok(())
    }
}
