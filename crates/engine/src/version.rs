//! Numeric migration versions with their on-disk textual form.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{MigrateError, MigrateResult};

/// Longest version string accepted from filenames, callers, or the ledger.
/// Also caps the configurable filename width; anything wider could never be
/// parsed back.
pub const MAX_VERSION_DIGITS: usize = 9;

/// A migration version.
///
/// Versions compare numerically, so `"4"` and `"004"` are the same version,
/// while the original text is kept for display and for ledger keys. Versions
/// read from filenames are zero-padded, which keeps the ledger's lexicographic
/// ordering identical to the numeric one.
#[derive(Debug, Clone)]
pub struct Version {
    number: u64,
    text: String,
}

impl Version {
    /// Parses a version from caller input or a filename prefix.
    ///
    /// Accepts only ASCII digits. The text is preserved as given (after
    /// trimming), so `parse("004")` displays as `004`.
    pub fn parse(input: &str) -> MigrateResult<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(MigrateError::InvalidVersion {
                input: input.to_string(),
                reason: "empty version".to_string(),
            });
        }
        if text.len() > MAX_VERSION_DIGITS {
            return Err(MigrateError::InvalidVersion {
                input: input.to_string(),
                reason: format!("more than {MAX_VERSION_DIGITS} digits"),
            });
        }
        if !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MigrateError::InvalidVersion {
                input: input.to_string(),
                reason: "expected ASCII digits only".to_string(),
            });
        }
        let number = text.parse::<u64>().map_err(|e| MigrateError::InvalidVersion {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            number,
            text: text.to_string(),
        })
    }

    /// Builds a zero-padded version, failing when `number` needs more than
    /// `width` digits or when `width` itself exceeds [`MAX_VERSION_DIGITS`].
    pub fn from_number(number: u64, width: usize) -> MigrateResult<Self> {
        if width > MAX_VERSION_DIGITS {
            return Err(MigrateError::InvalidVersion {
                input: number.to_string(),
                reason: format!("width {width} exceeds the {MAX_VERSION_DIGITS}-digit maximum"),
            });
        }
        let text = format!("{number:0width$}");
        if text.len() > width {
            return Err(MigrateError::VersionOverflow { next: number, width });
        }
        Ok(Self { number, text })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// The textual form, as read from the filename or caller.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
