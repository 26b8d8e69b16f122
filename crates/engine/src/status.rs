//! Status reporting: a pure merge of the catalog with the ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::{LedgerEntry, LedgerRecord};
use crate::unit::MigrationUnit;
use crate::version::Version;

/// Where a cataloged version currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionState {
    /// Not currently in effect: never attempted, or the last apply failed.
    Pending,
    /// Schema changes are in effect.
    Applied,
    /// Was applied once and later rolled back.
    Reverted,
    /// The ledger row for this version could not be decoded.
    Corrupt,
}

/// Per-version line of the status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionStatus {
    pub version: String,
    pub description: String,
    pub filename: String,
    pub state: VersionState,
    pub executed_at: Option<DateTime<Utc>>,
    pub execution_ms: Option<u64>,
    pub success: Option<bool>,
    pub error_message: Option<String>,
}

/// Everything the catalog knows, annotated with everything the ledger knows.
///
/// Built deterministically: the same catalog and ledger contents always
/// produce an identical report, so repeated status calls are byte-identical
/// once serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// One line per catalog version, ascending.
    pub versions: Vec<VersionStatus>,
    /// Filenames of versions awaiting apply, ascending. Versions whose ledger
    /// row is corrupt are excluded until the row is repaired.
    pub pending: Vec<String>,
}

/// Merges ordered catalog units with ledger records.
///
/// The catalog is the authority on which versions exist; ledger rows without
/// a matching file do not appear. Versions with no ledger row are pending.
/// Corrupt rows are flagged per version but never listed as pending, since
/// what the engine would do with them is not knowable from a broken row.
pub fn build_report(units: &[MigrationUnit], records: &[LedgerRecord]) -> StatusReport {
    let mut by_version: HashMap<u64, &LedgerRecord> = HashMap::new();
    for record in records {
        let key = match record {
            LedgerRecord::Entry(entry) => Some(entry.version.number()),
            LedgerRecord::Corrupt { version, .. } => {
                Version::parse(version).ok().map(|v| v.number())
            }
        };
        if let Some(key) = key {
            by_version.insert(key, record);
        }
    }

    let mut versions = Vec::with_capacity(units.len());
    let mut pending = Vec::new();
    for unit in units {
        let status = match by_version.get(&unit.version.number()) {
            Some(LedgerRecord::Entry(entry)) => from_entry(unit, entry),
            Some(LedgerRecord::Corrupt { reason, .. }) => VersionStatus {
                version: unit.version.as_str().to_string(),
                description: unit.description.clone(),
                filename: unit.filename.clone(),
                state: VersionState::Corrupt,
                executed_at: None,
                execution_ms: None,
                success: None,
                error_message: Some(reason.clone()),
            },
            None => from_entry(unit, &LedgerEntry::new(unit.version.clone())),
        };
        if matches!(status.state, VersionState::Pending | VersionState::Reverted) {
            pending.push(unit.filename.clone());
        }
        versions.push(status);
    }

    StatusReport { versions, pending }
}

fn from_entry(unit: &MigrationUnit, entry: &LedgerEntry) -> VersionStatus {
    let state = if entry.applied {
        VersionState::Applied
    } else if entry.success == Some(true) {
        VersionState::Reverted
    } else {
        VersionState::Pending
    };
    VersionStatus {
        version: unit.version.as_str().to_string(),
        description: unit.description.clone(),
        filename: unit.filename.clone(),
        state,
        executed_at: entry.executed_at,
        execution_ms: entry.execution_time.map(|d| d.as_millis() as u64),
        success: entry.success,
        error_message: entry.error_message.clone(),
    }
}
