use tidemark_engine::Version;

use crate::config::Settings;

pub async fn run(settings: &Settings, target: Option<&str>) -> anyhow::Result<()> {
    let target = target.map(Version::parse).transpose()?;
    let engine = settings.connect().await?;
    let outcome = engine.migrate(target.as_ref()).await?;

    if outcome.applied.is_empty() {
        println!(
            "✅ Nothing to do, {} migration(s) already applied",
            outcome.skipped
        );
        return Ok(());
    }
    for version in &outcome.applied {
        println!("✅ Applied {version}");
    }
    println!(
        "🗄️  {} migration(s) applied in {}ms ({} skipped)",
        outcome.applied.len(),
        outcome.execution_time_ms,
        outcome.skipped
    );
    Ok(())
}
