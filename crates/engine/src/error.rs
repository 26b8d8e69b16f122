//! Error types for the migration engine.

use thiserror::Error;

use crate::version::Version;

/// Convenience alias used throughout the engine.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// All failures the engine can surface.
///
/// Every variant is fatal for the operation that produced it: the engine
/// never swallows an error and continues with later versions.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A file in the migrations directory does not follow the
    /// `<version>_<description>.<ext>` naming convention.
    #[error("unrecognized migration filename '{filename}': {reason}")]
    Parse { filename: String, reason: String },

    /// Two catalog files carry the same numeric version.
    #[error("duplicate migration version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: Version,
        first: String,
        second: String,
    },

    /// A version string supplied by a caller could not be parsed.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// Allocating the next version would not fit in the configured
    /// zero-padded width.
    #[error("next migration version {next} does not fit in {width} digits")]
    VersionOverflow { next: u64, width: usize },

    /// A requested description normalizes to nothing usable.
    #[error("invalid migration description '{0}'")]
    InvalidDescription(String),

    /// The upgrade script or native upgrade handler failed.
    #[error("migration {version} failed to apply: {reason}")]
    Apply { version: Version, reason: String },

    /// The downgrade script or native downgrade handler failed.
    #[error("rollback of migration {version} failed: {reason}")]
    Rollback { version: Version, reason: String },

    /// The ledger table cannot be created, read, or written.
    #[error("migration ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// A ledger flag update targeted a version with no ledger row.
    #[error("no ledger entry for version {0}")]
    LedgerEntryMissing(Version),

    /// The requested version has no file in the catalog.
    #[error("version {0} has no migration file in the catalog")]
    UnknownVersion(Version),

    /// Rollback was requested for a version that is not applied.
    #[error("migration {0} is not currently applied")]
    NotApplied(Version),

    /// Rollback of the latest migration was requested on an empty ledger.
    #[error("no migrations are currently applied")]
    NothingApplied,

    /// A native handler was registered twice for the same version.
    #[error("native migration already registered for version {0}")]
    DuplicateRegistration(Version),

    /// A schema script failed against the target database.
    #[error("schema script failed: {0}")]
    Target(String),

    /// Reading or writing the migrations directory failed.
    #[error("migration directory error: {0}")]
    Io(#[from] std::io::Error),
}
