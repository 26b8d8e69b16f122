use tidemark_engine::Version;

use crate::config::Settings;

pub async fn run(settings: &Settings, version: Option<&str>) -> anyhow::Result<()> {
    let engine = settings.connect().await?;
    let outcome = match version {
        Some(text) => engine.rollback_migration(&Version::parse(text)?).await?,
        None => engine.rollback_latest().await?,
    };
    println!(
        "⏪ Rolled back {} in {}ms",
        outcome.version, outcome.execution_time_ms
    );
    Ok(())
}
