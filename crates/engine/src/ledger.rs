//! The migration ledger: the persistent record of every attempt.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MigrateResult;
use crate::version::Version;

/// One well-formed row of the ledger table.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub version: Version,
    /// Whether the migration's schema changes are currently in effect.
    pub applied: bool,
    /// When the most recent attempt finished.
    pub executed_at: Option<DateTime<Utc>>,
    /// How long the most recent attempt took.
    pub execution_time: Option<Duration>,
    /// Whether the most recent attempt succeeded.
    pub success: Option<bool>,
    /// Failure message of the most recent attempt, if it failed.
    pub error_message: Option<String>,
}

impl LedgerEntry {
    /// A fresh row for a version that has been attempted but whose flags have
    /// not been set yet.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            applied: false,
            executed_at: None,
            execution_time: None,
            success: None,
            error_message: None,
        }
    }
}

/// A ledger row as read back from storage.
///
/// Rows that cannot be decoded are reported rather than dropped, so status
/// output can flag them for a human instead of silently hiding history.
#[derive(Debug, Clone)]
pub enum LedgerRecord {
    Entry(LedgerEntry),
    Corrupt { version: String, reason: String },
}

/// Persistent store tracking which migrations have been attempted and which
/// are currently applied.
///
/// The engine drives this interface with a fixed write order per attempt:
/// `record_attempt` lands first with the outcome, then `mark_applied` or
/// `mark_reverted` flips the applied flag only when the attempt succeeded.
/// Implementations must keep `get_applied` sorted ascending by version.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Creates the ledger table if it does not exist. Safe to call on every
    /// start-up.
    async fn ensure_table(&self) -> MigrateResult<()>;

    /// All rows, ordered ascending by version, with undecodable rows
    /// surfaced as [`LedgerRecord::Corrupt`].
    async fn entries(&self) -> MigrateResult<Vec<LedgerRecord>>;

    /// Versions whose applied flag is currently set, ascending.
    async fn get_applied(&self) -> MigrateResult<Vec<Version>>;

    /// Upserts the outcome of an attempt without touching the applied flag.
    async fn record_attempt(
        &self,
        version: &Version,
        success: bool,
        duration: Duration,
        error: Option<&str>,
    ) -> MigrateResult<()>;

    /// Sets the applied flag. Fails if the version has no row.
    async fn mark_applied(&self, version: &Version) -> MigrateResult<()>;

    /// Clears the applied flag. Fails if the version has no row.
    async fn mark_reverted(&self, version: &Version) -> MigrateResult<()>;
}
