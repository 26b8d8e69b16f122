//! Engine configuration.

use std::path::PathBuf;

/// Settings shared by the catalog, the ledger, and the engine.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Directory scanned for migration files.
    pub migrations_dir: PathBuf,
    /// Name of the ledger table created in the target database.
    pub ledger_table: String,
    /// Zero-padded width of version prefixes in generated filenames, at most
    /// [`crate::version::MAX_VERSION_DIGITS`].
    pub version_width: usize,
    /// Extension of migration files, without the leading dot.
    pub source_extension: String,
    /// Optional baseline schema script applied by `init_schema` before the
    /// ledger table is created.
    pub baseline_path: Option<PathBuf>,
    /// Optional script run by `reset_schema` in place of the default
    /// drop-and-recreate of the `public` schema.
    pub reset_script: Option<String>,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            ledger_table: "tidemark_ledger".to_string(),
            version_width: 3,
            source_extension: "sql".to_string(),
            baseline_path: None,
            reset_script: None,
        }
    }
}

impl MigratorConfig {
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    pub fn with_ledger_table(mut self, table: impl Into<String>) -> Self {
        self.ledger_table = table.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_conventions() {
        let config = MigratorConfig::default();
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
        assert_eq!(config.ledger_table, "tidemark_ledger");
        assert_eq!(config.version_width, 3);
        assert_eq!(config.source_extension, "sql");
        assert!(config.baseline_path.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let config = MigratorConfig::default()
            .with_migrations_dir("db/changes")
            .with_ledger_table("schema_history");
        assert_eq!(config.migrations_dir, PathBuf::from("db/changes"));
        assert_eq!(config.ledger_table, "schema_history");
    }
}
