//! The schema target: where migration scripts actually run.

use async_trait::async_trait;

use crate::error::MigrateResult;

/// A database that migration scripts are executed against.
///
/// Scripts are opaque to the engine. A script may contain several statements;
/// implementations run it as one batch and report the first failure.
#[async_trait]
pub trait SchemaTarget: Send + Sync {
    async fn run_script(&self, script: &str) -> MigrateResult<()>;
}
