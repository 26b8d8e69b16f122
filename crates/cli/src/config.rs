//! CLI configuration: flags and environment over `tidemark.toml` over
//! defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tidemark_engine::{Engine, MigratorConfig, MAX_VERSION_DIGITS};

/// Looked for in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "tidemark.toml";

/// Contents of `tidemark.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub migrations_dir: Option<PathBuf>,
    pub ledger_table: Option<String>,
    pub version_width: Option<usize>,
    /// Schema script applied by `init-db` before the ledger table.
    pub baseline_schema: Option<PathBuf>,
    /// Script used by `reset-db` instead of dropping the `public` schema.
    pub reset_script: Option<String>,
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub admin_token: Option<String>,
}

impl FileConfig {
    /// Loads an explicit config file (which must exist) or the default one
    /// (which may be absent).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                anyhow::bail!("config file {} not found", path.display());
            }
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub engine: MigratorConfig,
    pub admin_token: Option<String>,
}

impl Settings {
    pub fn resolve(
        config_path: Option<&Path>,
        database_url: Option<String>,
        migrations_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let file = FileConfig::load(config_path)?;

        let mut engine = MigratorConfig::default();
        if let Some(dir) = migrations_dir.or(file.migrations_dir) {
            engine.migrations_dir = dir;
        }
        if let Some(table) = file.ledger_table {
            engine.ledger_table = table;
        }
        if let Some(width) = file.version_width {
            if !(1..=MAX_VERSION_DIGITS).contains(&width) {
                anyhow::bail!(
                    "version_width must be between 1 and {MAX_VERSION_DIGITS}, got {width}"
                );
            }
            engine.version_width = width;
        }
        engine.baseline_path = file.baseline_schema;
        engine.reset_script = file.reset_script;

        Ok(Self {
            database_url: database_url.or(file.database_url),
            engine,
            admin_token: file.api.and_then(|api| api.admin_token),
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "no database URL configured; pass --database-url, set DATABASE_URL, \
                 or add database_url to tidemark.toml"
            )
        })
    }

    /// Connects and builds an engine from these settings.
    pub async fn connect(&self) -> anyhow::Result<Engine> {
        let url = self.require_database_url()?;
        Ok(Engine::postgres(self.engine.clone(), url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("tidemark.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let settings = Settings::resolve(None, None, None).unwrap();
        assert!(settings.database_url.is_none());
        assert_eq!(settings.engine.ledger_table, "tidemark_ledger");
        assert_eq!(settings.engine.version_width, 3);
        assert!(settings.admin_token.is_none());
        assert!(settings.require_database_url().is_err());
    }

    #[test]
    fn file_values_are_picked_up() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
database_url = "postgres://file/app"
migrations_dir = "db/changes"
ledger_table = "schema_history"
version_width = 4

[api]
admin_token = "sekrit"
"#,
        );

        let settings = Settings::resolve(Some(path.as_path()), None, None).unwrap();
        assert_eq!(settings.database_url.as_deref(), Some("postgres://file/app"));
        assert_eq!(settings.engine.migrations_dir, PathBuf::from("db/changes"));
        assert_eq!(settings.engine.ledger_table, "schema_history");
        assert_eq!(settings.engine.version_width, 4);
        assert_eq!(settings.admin_token.as_deref(), Some("sekrit"));
    }

    #[test]
    fn flags_win_over_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
database_url = "postgres://file/app"
migrations_dir = "db/changes"
"#,
        );

        let settings = Settings::resolve(
            Some(path.as_path()),
            Some("postgres://flag/app".to_string()),
            Some(PathBuf::from("elsewhere")),
        )
        .unwrap();
        assert_eq!(settings.database_url.as_deref(), Some("postgres://flag/app"));
        assert_eq!(settings.engine.migrations_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn version_width_outside_the_supported_range_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "version_width = 10\n");
        let err = Settings::resolve(Some(path.as_path()), None, None).unwrap_err();
        assert!(err.to_string().contains("version_width"));

        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "version_width = 0\n");
        assert!(Settings::resolve(Some(path.as_path()), None, None).is_err());
    }

    #[test]
    fn an_explicit_config_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::resolve(Some(missing.as_path()), None, None).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn malformed_toml_is_reported_with_the_path() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "database_url = [not toml");
        let err = Settings::resolve(Some(path.as_path()), None, None).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
