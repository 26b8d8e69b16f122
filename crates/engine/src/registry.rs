//! Native migrations: compiled-in handlers that override SQL sections.
//!
//! Most migrations are plain SQL files. When a step needs logic SQL cannot
//! express (backfills computed in application code, conditional DDL), a
//! handler is registered here against the version it implements. The file
//! for that version must still exist; it keeps the version's place in the
//! catalog and documents the step, while execution goes through the handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{MigrateError, MigrateResult};
use crate::target::SchemaTarget;
use crate::version::Version;

/// Code-defined upgrade and downgrade for one version.
#[async_trait]
pub trait NativeMigration: Send + Sync {
    async fn upgrade(&self, target: &dyn SchemaTarget) -> MigrateResult<()>;
    async fn downgrade(&self, target: &dyn SchemaTarget) -> MigrateResult<()>;
}

/// Explicit version-to-handler map consulted by the engine before it falls
/// back to a unit's SQL sections.
#[derive(Default)]
pub struct Registry {
    handlers: BTreeMap<Version, Arc<dyn NativeMigration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `version`. Registering the same version twice
    /// is a configuration bug and is rejected.
    pub fn register(
        &mut self,
        version: &str,
        handler: Arc<dyn NativeMigration>,
    ) -> MigrateResult<()> {
        let version = Version::parse(version)?;
        if self.handlers.contains_key(&version) {
            return Err(MigrateError::DuplicateRegistration(version));
        }
        self.handlers.insert(version, handler);
        Ok(())
    }

    pub fn get(&self, version: &Version) -> Option<&Arc<dyn NativeMigration>> {
        self.handlers.get(version)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("versions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl NativeMigration for Noop {
        async fn upgrade(&self, _target: &dyn SchemaTarget) -> MigrateResult<()> {
            Ok(())
        }

        async fn downgrade(&self, _target: &dyn SchemaTarget) -> MigrateResult<()> {
            Ok(())
        }
    }

    #[test]
    fn lookup_is_numeric_across_paddings() {
        let mut registry = Registry::new();
        registry.register("004", Arc::new(Noop)).unwrap();

        let bare = Version::parse("4").unwrap();
        assert!(registry.get(&bare).is_some());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register("002", Arc::new(Noop)).unwrap();

        let err = registry.register("2", Arc::new(Noop)).unwrap_err();
        assert!(matches!(err, MigrateError::DuplicateRegistration(_)));
    }
}
