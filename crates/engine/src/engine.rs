//! The migration engine: ordering, execution, and ledger bookkeeping.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::MigratorConfig;
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::postgres::{connect, PgLedger, PgTarget};
use crate::registry::{NativeMigration, Registry};
use crate::status::{build_report, StatusReport};
use crate::target::SchemaTarget;
use crate::unit::MigrationUnit;
use crate::version::Version;

/// Dropped and recreated by `reset_schema` unless configuration supplies its
/// own script.
const DEFAULT_RESET_SCRIPT: &str = "DROP SCHEMA public CASCADE;\nCREATE SCHEMA public;";

/// Result of a `migrate` run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrateOutcome {
    /// Versions applied by this run, in apply order.
    pub applied: Vec<String>,
    /// Catalog versions skipped because they were already applied.
    pub skipped: usize,
    pub execution_time_ms: u64,
}

/// Result of rolling back a single migration.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    pub version: String,
    pub execution_time_ms: u64,
}

/// Applies and reverts migrations against a schema target while keeping the
/// ledger truthful.
///
/// Per attempt the engine writes in a fixed order: the schema script runs
/// first, the outcome lands in the ledger second, and the applied flag flips
/// last. A crash between those steps leaves the ledger behind reality, never
/// ahead of it; re-running against idempotent scripts converges.
///
/// Mutating operations serialize behind an internal lock, so one engine
/// shared across concurrent callers applies each version at most once.
/// Status reads and `create_migration` take no lock.
pub struct Engine {
    catalog: Catalog,
    ledger: Arc<dyn Ledger>,
    target: Arc<dyn SchemaTarget>,
    registry: Registry,
    config: MigratorConfig,
    run_lock: Mutex<()>,
}

impl Engine {
    pub fn new(
        config: MigratorConfig,
        ledger: Arc<dyn Ledger>,
        target: Arc<dyn SchemaTarget>,
    ) -> Self {
        Self {
            catalog: Catalog::new(&config),
            ledger,
            target,
            registry: Registry::new(),
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Connects to PostgreSQL and wires up the ledger and target against the
    /// same pool.
    pub async fn postgres(config: MigratorConfig, database_url: &str) -> MigrateResult<Self> {
        let pool = connect(database_url).await?;
        let ledger = Arc::new(PgLedger::new(pool.clone(), config.ledger_table.clone()));
        let target = Arc::new(PgTarget::new(pool));
        Ok(Self::new(config, ledger, target))
    }

    /// Installs a native handler for one version. The version's file must
    /// still exist in the catalog; only its execution is overridden.
    pub fn register_native(
        &mut self,
        version: &str,
        handler: Arc<dyn NativeMigration>,
    ) -> MigrateResult<()> {
        self.registry.register(version, handler)
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Applies every pending migration in ascending version order, stopping
    /// at the first failure.
    ///
    /// `target_version` is an inclusive upper bound; pending versions above
    /// it are left untouched. A failure is recorded in the ledger for the
    /// version that caused it and no later version is attempted.
    pub async fn migrate(
        &self,
        target_version: Option<&Version>,
    ) -> MigrateResult<MigrateOutcome> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        self.ledger.ensure_table().await?;

        let units = self.catalog.ordered_units()?;
        let total = units.len();
        let applied_set = self.ledger.get_applied().await?;
        let mut pending: Vec<MigrationUnit> = units
            .into_iter()
            .filter(|unit| !applied_set.contains(&unit.version))
            .collect();
        let skipped = total - pending.len();
        if let Some(bound) = target_version {
            pending.retain(|unit| unit.version <= *bound);
        }

        if pending.is_empty() {
            info!(skipped, "no pending migrations");
            return Ok(MigrateOutcome {
                applied: Vec::new(),
                skipped,
                execution_time_ms: started.elapsed().as_millis() as u64,
            });
        }

        let mut applied = Vec::with_capacity(pending.len());
        for unit in &pending {
            info!(version = %unit.version, description = %unit.description, "applying migration");
            let attempt = Instant::now();
            let result = self.run_upgrade(unit).await;
            let elapsed = attempt.elapsed();

            match result {
                Ok(()) => {
                    self.ledger
                        .record_attempt(&unit.version, true, elapsed, None)
                        .await?;
                    self.ledger.mark_applied(&unit.version).await?;
                    info!(
                        version = %unit.version,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "migration applied"
                    );
                    applied.push(unit.version.as_str().to_string());
                }
                Err(err) => {
                    let reason = err.to_string();
                    if let Err(ledger_err) = self
                        .ledger
                        .record_attempt(&unit.version, false, elapsed, Some(&reason))
                        .await
                    {
                        warn!(
                            version = %unit.version,
                            error = %ledger_err,
                            "could not record failed attempt in ledger"
                        );
                    }
                    return Err(MigrateError::Apply {
                        version: unit.version.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(MigrateOutcome {
            applied,
            skipped,
            execution_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Reverts one applied migration by running its downgrade.
    ///
    /// The version must exist in the catalog and be currently applied. When
    /// the downgrade fails, the applied flag is left set; the schema may be
    /// partially reverted and needs a human decision, so pretending the
    /// migration is gone would be worse.
    pub async fn rollback_migration(&self, version: &Version) -> MigrateResult<RollbackOutcome> {
        let _guard = self.run_lock.lock().await;
        self.ledger.ensure_table().await?;
        self.rollback_locked(version).await
    }

    /// Reverts the highest currently applied version.
    pub async fn rollback_latest(&self) -> MigrateResult<RollbackOutcome> {
        let _guard = self.run_lock.lock().await;
        self.ledger.ensure_table().await?;
        let applied_set = self.ledger.get_applied().await?;
        let latest = applied_set
            .last()
            .cloned()
            .ok_or(MigrateError::NothingApplied)?;
        self.rollback_locked(&latest).await
    }

    /// Caller holds the run lock and has ensured the ledger table.
    async fn rollback_locked(&self, version: &Version) -> MigrateResult<RollbackOutcome> {
        let units = self.catalog.ordered_units()?;
        let unit = units
            .iter()
            .find(|unit| unit.version == *version)
            .ok_or_else(|| MigrateError::UnknownVersion(version.clone()))?;

        let applied_set = self.ledger.get_applied().await?;
        if !applied_set.contains(&unit.version) {
            return Err(MigrateError::NotApplied(unit.version.clone()));
        }

        info!(version = %unit.version, description = %unit.description, "rolling back migration");
        let attempt = Instant::now();
        let result = self.run_downgrade(unit).await;
        let elapsed = attempt.elapsed();

        match result {
            Ok(()) => {
                self.ledger
                    .record_attempt(&unit.version, true, elapsed, None)
                    .await?;
                self.ledger.mark_reverted(&unit.version).await?;
                info!(
                    version = %unit.version,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "migration rolled back"
                );
                Ok(RollbackOutcome {
                    version: unit.version.as_str().to_string(),
                    execution_time_ms: elapsed.as_millis() as u64,
                })
            }
            Err(err) => {
                let reason = err.to_string();
                if let Err(ledger_err) = self
                    .ledger
                    .record_attempt(&unit.version, false, elapsed, Some(&reason))
                    .await
                {
                    warn!(
                        version = %unit.version,
                        error = %ledger_err,
                        "could not record failed rollback in ledger"
                    );
                }
                Err(MigrateError::Rollback {
                    version: unit.version.clone(),
                    reason,
                })
            }
        }
    }

    /// Builds the status report by merging the catalog with the ledger.
    pub async fn get_migration_status(&self) -> MigrateResult<StatusReport> {
        self.ledger.ensure_table().await?;
        let units = self.catalog.ordered_units()?;
        let records = self.ledger.entries().await?;
        Ok(build_report(&units, &records))
    }

    /// Creates a new migration file. Purely a file-system operation; works
    /// without a reachable database.
    pub fn create_migration(&self, description: &str) -> MigrateResult<String> {
        self.catalog.create(description)
    }

    /// Applies the optional baseline schema script, then creates the ledger
    /// table.
    pub async fn init_schema(&self) -> MigrateResult<()> {
        let _guard = self.run_lock.lock().await;
        self.init_locked().await
    }

    /// Drops everything and re-initializes. Destructive; callers are
    /// responsible for confirmation.
    pub async fn reset_schema(&self) -> MigrateResult<()> {
        let _guard = self.run_lock.lock().await;
        let script = self
            .config
            .reset_script
            .as_deref()
            .unwrap_or(DEFAULT_RESET_SCRIPT);
        self.target.run_script(script).await?;
        warn!("schema reset");
        self.init_locked().await
    }

    /// Caller holds the run lock.
    async fn init_locked(&self) -> MigrateResult<()> {
        if let Some(path) = &self.config.baseline_path {
            let script = std::fs::read_to_string(path)?;
            self.target.run_script(&script).await?;
            info!(path = %path.display(), "baseline schema applied");
        }
        self.ledger.ensure_table().await?;
        Ok(())
    }

    async fn run_upgrade(&self, unit: &MigrationUnit) -> MigrateResult<()> {
        if let Some(handler) = self.registry.get(&unit.version) {
            return handler.upgrade(self.target.as_ref()).await;
        }
        if unit.is_empty_up() {
            return Ok(());
        }
        self.target.run_script(&unit.up_sql).await
    }

    async fn run_downgrade(&self, unit: &MigrationUnit) -> MigrateResult<()> {
        if let Some(handler) = self.registry.get(&unit.version) {
            return handler.downgrade(self.target.as_ref()).await;
        }
        if unit.is_empty_down() {
            return Ok(());
        }
        self.target.run_script(&unit.down_sql).await
    }
}
