//! A single versioned migration and its SQL section parsing.

use crate::version::Version;

/// One migration loaded from the catalog.
///
/// The upgrade and downgrade bodies are opaque SQL scripts. They are never
/// inspected beyond the section split below; whatever they contain is handed
/// to the target database as-is.
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    pub version: Version,
    /// Human-readable description recovered from the filename,
    /// underscores replaced with spaces.
    pub description: String,
    /// The file name this unit was loaded from, including extension.
    pub filename: String,
    pub up_sql: String,
    pub down_sql: String,
}

impl MigrationUnit {
    /// True when the upgrade body contains no statements. Empty stubs are
    /// applied as no-ops and still recorded in the ledger.
    pub fn is_empty_up(&self) -> bool {
        self.up_sql.trim().is_empty()
    }

    /// True when the downgrade body contains no statements.
    pub fn is_empty_down(&self) -> bool {
        self.down_sql.trim().is_empty()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Up,
    Down,
}

fn section_marker(line: &str) -> Option<Section> {
    let rest = line.trim().strip_prefix("--")?.trim().to_lowercase();
    match rest.as_str() {
        "up" | "up migration" => Some(Section::Up),
        "down" | "down migration" => Some(Section::Down),
        _ => None,
    }
}

/// Splits a migration file body into its upgrade and downgrade scripts.
///
/// Lines before the first marker are ignored, as are blank lines and plain
/// comment lines. Everything else accumulates into the current section.
pub fn split_sections(content: &str) -> (String, String) {
    let mut up = String::new();
    let mut down = String::new();
    let mut current: Option<Section> = None;

    for line in content.lines() {
        if let Some(section) = section_marker(line) {
            current = Some(section);
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        match current {
            Some(Section::Up) => {
                up.push_str(line);
                up.push('\n');
            }
            Some(Section::Down) => {
                down.push_str(line);
                down.push('\n');
            }
            None => {}
        }
    }

    (up.trim().to_string(), down.trim().to_string())
}
