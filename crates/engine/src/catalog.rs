//! The migration catalog: discovery, ordering, and creation of migration
//! files on disk.
//!
//! The catalog never talks to a database. Everything here works against the
//! migrations directory alone, so `create` and `list_files` stay usable when
//! no database is reachable.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::MigratorConfig;
use crate::error::{MigrateError, MigrateResult};
use crate::unit::{split_sections, MigrationUnit};
use crate::version::Version;

/// Discovers and creates migration files in the configured directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
    width: usize,
    extension: String,
}

impl Catalog {
    pub fn new(config: &MigratorConfig) -> Self {
        Self {
            dir: config.migrations_dir.clone(),
            width: config.version_width,
            extension: config.source_extension.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists migration files sorted by filename.
    ///
    /// A missing directory is an empty catalog, not an error; version gaps
    /// are likewise fine.
    pub fn list_files(&self) -> MigrateResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str()) {
                files.push(path);
            }
        }
        files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
        Ok(files)
    }

    /// Recovers `(version, description)` from a migration filename.
    ///
    /// The inverse of [`Catalog::create`]: the version prefix keeps its
    /// padding and underscores in the description become spaces again.
    pub fn parse_filename(&self, filename: &str) -> MigrateResult<(Version, String)> {
        let parse_err = |reason: &str| MigrateError::Parse {
            filename: filename.to_string(),
            reason: reason.to_string(),
        };

        let suffix = format!(".{}", self.extension);
        let stem = filename
            .strip_suffix(&suffix)
            .ok_or_else(|| parse_err(&format!("expected a '{suffix}' file")))?;

        let bytes = stem.as_bytes();
        if bytes.len() < self.width + 2 {
            return Err(parse_err(&format!(
                "expected '<{}-digit version>_<description>'",
                self.width
            )));
        }
        if !bytes[..self.width].iter().all(u8::is_ascii_digit) {
            return Err(parse_err(&format!(
                "version prefix must be {} digits",
                self.width
            )));
        }
        if bytes[self.width] != b'_' {
            return Err(parse_err("expected '_' after the version prefix"));
        }

        let version = Version::parse(&stem[..self.width])?;
        let slug = &stem[self.width + 1..];
        if slug.is_empty() {
            return Err(parse_err("missing description"));
        }
        Ok((version, slug.replace('_', " ")))
    }

    /// Loads all migrations, sorted ascending by version.
    ///
    /// Fails on the first unparseable filename or duplicate version; the
    /// catalog must be unambiguous before anything runs.
    pub fn ordered_units(&self) -> MigrateResult<Vec<MigrationUnit>> {
        let mut units = Vec::new();
        for path in self.list_files()? {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| MigrateError::Parse {
                    filename: path.display().to_string(),
                    reason: "filename is not valid UTF-8".to_string(),
                })?;
            let (version, description) = self.parse_filename(&filename)?;
            let content = fs::read_to_string(&path)?;
            let (up_sql, down_sql) = split_sections(&content);
            units.push(MigrationUnit {
                version,
                description,
                filename,
                up_sql,
                down_sql,
            });
        }

        units.sort_by(|a, b| a.version.cmp(&b.version));
        for pair in units.windows(2) {
            if pair[0].version == pair[1].version {
                return Err(MigrateError::DuplicateVersion {
                    version: pair[0].version.clone(),
                    first: pair[0].filename.clone(),
                    second: pair[1].filename.clone(),
                });
            }
        }
        Ok(units)
    }

    /// Creates a new migration file with stub sections and returns its
    /// filename.
    ///
    /// The version is one past the highest already in the catalog, regardless
    /// of gaps below it.
    pub fn create(&self, description: &str) -> MigrateResult<String> {
        let slug = normalize_description(description)?;
        let version = self.next_version()?;
        let filename = format!("{}_{}.{}", version.as_str(), slug, self.extension);

        fs::create_dir_all(&self.dir)?;
        let content = format!(
            "-- Migration: {slug}\n-- Created at: {}\n\n-- up\n-- Add forward schema changes here.\n\n\n-- down\n-- Add statements that undo the section above.\n\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        fs::write(self.dir.join(&filename), content)?;
        Ok(filename)
    }

    fn next_version(&self) -> MigrateResult<Version> {
        let mut highest = 0u64;
        for path in self.list_files()? {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| MigrateError::Parse {
                    filename: path.display().to_string(),
                    reason: "filename is not valid UTF-8".to_string(),
                })?;
            let (version, _) = self.parse_filename(&filename)?;
            highest = highest.max(version.number());
        }
        Version::from_number(highest + 1, self.width)
    }
}

/// Lowercases a description and collapses runs of non-alphanumeric
/// characters into single underscores.
fn normalize_description(raw: &str) -> MigrateResult<String> {
    let mut slug = String::new();
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        return Err(MigrateError::InvalidDescription(raw.to_string()));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog_in(dir: &TempDir) -> Catalog {
        let config = MigratorConfig::default().with_migrations_dir(dir.path());
        Catalog::new(&config)
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn missing_directory_is_an_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let config =
            MigratorConfig::default().with_migrations_dir(dir.path().join("does_not_exist"));
        let catalog = Catalog::new(&config);
        assert!(catalog.list_files().unwrap().is_empty());
        assert!(catalog.ordered_units().unwrap().is_empty());
    }

    #[test]
    fn create_then_parse_round_trips() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);

        let filename = catalog.create("add users table").unwrap();
        assert_eq!(filename, "001_add_users_table.sql");

        let (version, description) = catalog.parse_filename(&filename).unwrap();
        assert_eq!(version.as_str(), "001");
        assert_eq!(description, "add users table");
    }

    #[test]
    fn create_allocates_past_the_highest_version() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);
        write_file(&dir, "001_first.sql", "-- up\n");
        write_file(&dir, "002_second.sql", "-- up\n");
        write_file(&dir, "004_fourth.sql", "-- up\n");

        let filename = catalog.create("fifth").unwrap();
        assert_eq!(filename, "005_fifth.sql");
    }

    #[test]
    fn create_normalizes_messy_descriptions() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);

        let filename = catalog.create("  Add   Users & Roles! ").unwrap();
        assert_eq!(filename, "001_add_users_roles.sql");

        let err = catalog.create("!!!").unwrap_err();
        assert!(matches!(err, MigrateError::InvalidDescription(_)));
    }

    #[test]
    fn create_fails_when_width_is_exhausted() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);
        write_file(&dir, "999_last.sql", "-- up\n");

        let err = catalog.create("one too many").unwrap_err();
        assert!(matches!(
            err,
            MigrateError::VersionOverflow { next: 1000, width: 3 }
        ));
    }

    #[test]
    fn ordered_units_sorts_by_version_with_gaps_allowed() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);
        write_file(&dir, "004_d.sql", "-- up\nSELECT 4;\n");
        write_file(&dir, "001_a.sql", "-- up\nSELECT 1;\n");
        write_file(&dir, "002_b.sql", "-- up\nSELECT 2;\n");

        let units = catalog.ordered_units().unwrap();
        let versions: Vec<_> = units.iter().map(|u| u.version.as_str().to_string()).collect();
        assert_eq!(versions, vec!["001", "002", "004"]);
        assert_eq!(units[2].up_sql, "SELECT 4;");
    }

    #[test]
    fn duplicate_versions_are_rejected() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);
        write_file(&dir, "003_one.sql", "-- up\n");
        write_file(&dir, "003_two.sql", "-- up\n");

        let err = catalog.ordered_units().unwrap_err();
        match err {
            MigrateError::DuplicateVersion { version, first, second } => {
                assert_eq!(version.as_str(), "003");
                assert_eq!(first, "003_one.sql");
                assert_eq!(second, "003_two.sql");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_filenames_are_rejected() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);

        for bad in ["nounderscore.sql", "01_short.sql", "abc_letters.sql", "001_.sql"] {
            assert!(
                catalog.parse_filename(bad).is_err(),
                "expected '{bad}' to be rejected"
            );
        }
        assert!(catalog.parse_filename("001_ok.txt").is_err());
        assert!(catalog.parse_filename("001_ok.sql").is_ok());
    }

    #[test]
    fn non_sql_files_are_ignored_by_discovery() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir);
        write_file(&dir, "001_real.sql", "-- up\n");
        write_file(&dir, "README.md", "notes\n");

        let files = catalog.list_files().unwrap();
        assert_eq!(files.len(), 1);
    }
}
