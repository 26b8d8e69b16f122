use tidemark_engine::Catalog;

use crate::config::Settings;

/// Works without a database; only the migrations directory is touched.
pub fn run(settings: &Settings, description: &str) -> anyhow::Result<()> {
    let catalog = Catalog::new(&settings.engine);
    let filename = catalog.create(description)?;
    println!(
        "📝 Created {}",
        settings.engine.migrations_dir.join(&filename).display()
    );
    println!("   Fill in the up and down sections, then run `tidemark migrate`.");
    Ok(())
}
