//! In-memory ledger and target implementations.
//!
//! Used by this crate's own tests and by downstream crates that need an
//! engine without a running PostgreSQL. Both doubles support fault
//! injection so halt-on-failure behavior can be exercised.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::{Ledger, LedgerEntry, LedgerRecord};
use crate::target::SchemaTarget;
use crate::version::Version;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct MemoryLedgerState {
    rows: BTreeMap<Version, LedgerEntry>,
    corrupt: Vec<(String, String)>,
    fail_next_record: Option<String>,
}

/// Ledger kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryLedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row that will surface as [`LedgerRecord::Corrupt`].
    pub fn inject_corrupt(&self, version: &str, reason: &str) {
        lock(&self.state)
            .corrupt
            .push((version.to_string(), reason.to_string()));
    }

    /// Makes the next `record_attempt` call fail with the given message.
    pub fn fail_next_record_attempt(&self, message: &str) {
        lock(&self.state).fail_next_record = Some(message.to_string());
    }

    /// Copy of the row for `version`, if any.
    pub fn entry(&self, version: &str) -> Option<LedgerEntry> {
        let version = Version::parse(version).ok()?;
        lock(&self.state).rows.get(&version).cloned()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn ensure_table(&self) -> MigrateResult<()> {
        Ok(())
    }

    async fn entries(&self) -> MigrateResult<Vec<LedgerRecord>> {
        let state = lock(&self.state);
        let mut records: Vec<LedgerRecord> = state
            .rows
            .values()
            .cloned()
            .map(LedgerRecord::Entry)
            .collect();
        records.extend(state.corrupt.iter().map(|(version, reason)| {
            LedgerRecord::Corrupt {
                version: version.clone(),
                reason: reason.clone(),
            }
        }));
        Ok(records)
    }

    async fn get_applied(&self) -> MigrateResult<Vec<Version>> {
        Ok(lock(&self.state)
            .rows
            .values()
            .filter(|entry| entry.applied)
            .map(|entry| entry.version.clone())
            .collect())
    }

    async fn record_attempt(
        &self,
        version: &Version,
        success: bool,
        duration: Duration,
        error: Option<&str>,
    ) -> MigrateResult<()> {
        let mut state = lock(&self.state);
        if let Some(message) = state.fail_next_record.take() {
            return Err(MigrateError::LedgerUnavailable(message));
        }
        let entry = state
            .rows
            .entry(version.clone())
            .or_insert_with(|| LedgerEntry::new(version.clone()));
        entry.executed_at = Some(Utc::now());
        entry.execution_time = Some(duration);
        entry.success = Some(success);
        entry.error_message = error.map(str::to_string);
        Ok(())
    }

    async fn mark_applied(&self, version: &Version) -> MigrateResult<()> {
        let mut state = lock(&self.state);
        let entry = state
            .rows
            .get_mut(version)
            .ok_or_else(|| MigrateError::LedgerEntryMissing(version.clone()))?;
        entry.applied = true;
        Ok(())
    }

    async fn mark_reverted(&self, version: &Version) -> MigrateResult<()> {
        let mut state = lock(&self.state);
        let entry = state
            .rows
            .get_mut(version)
            .ok_or_else(|| MigrateError::LedgerEntryMissing(version.clone()))?;
        entry.applied = false;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryTargetState {
    executed: Vec<String>,
    fail_contains: Option<String>,
}

/// Schema target that records the scripts it receives.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    state: Mutex<MemoryTargetState>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every script containing `marker` fail until cleared.
    pub fn fail_when_contains(&self, marker: &str) {
        lock(&self.state).fail_contains = Some(marker.to_string());
    }

    pub fn clear_failure(&self) {
        lock(&self.state).fail_contains = None;
    }

    /// Scripts executed so far, in order. Failed scripts are not included.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.state).executed.clone()
    }
}

#[async_trait]
impl SchemaTarget for MemoryTarget {
    async fn run_script(&self, script: &str) -> MigrateResult<()> {
        let mut state = lock(&self.state);
        if let Some(marker) = &state.fail_contains {
            if script.contains(marker.as_str()) {
                return Err(MigrateError::Target(format!(
                    "injected failure: script contains '{marker}'"
                )));
            }
        }
        state.executed.push(script.to_string());
        Ok(())
    }
}
