//! # tidemark-engine
//!
//! Versioned schema migrations for PostgreSQL, tracked in a persistent
//! ledger table.
//!
//! Migrations are plain SQL files named `<version>_<description>.sql` with
//! `-- up` and `-- down` sections. The [`Engine`] applies pending versions in
//! strictly ascending order, records every attempt in the ledger, and stops
//! at the first failure so later versions never run on top of a broken
//! schema. Steps that SQL cannot express can be registered as native
//! [`registry::NativeMigration`] handlers.
//!
//! ```no_run
//! use tidemark_engine::{Engine, MigratorConfig};
//!
//! # async fn run() -> Result<(), tidemark_engine::MigrateError> {
//! let engine = Engine::postgres(
//!     MigratorConfig::default(),
//!     "postgres://localhost/app",
//! )
//! .await?;
//!
//! let outcome = engine.migrate(None).await?;
//! println!("applied {} migrations", outcome.applied.len());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod postgres;
pub mod registry;
pub mod status;
pub mod target;
pub mod testing;
pub mod unit;
pub mod version;

pub use catalog::Catalog;
pub use config::MigratorConfig;
pub use engine::{Engine, MigrateOutcome, RollbackOutcome};
pub use error::{MigrateError, MigrateResult};
pub use ledger::{Ledger, LedgerEntry, LedgerRecord};
pub use registry::{NativeMigration, Registry};
pub use status::{StatusReport, VersionState, VersionStatus};
pub use target::SchemaTarget;
pub use unit::MigrationUnit;
pub use version::{Version, MAX_VERSION_DIGITS};
