use std::sync::Arc;

use tidemark_api::{AdminApi, StaticAdminToken};

use crate::commands::db::mask_url;
use crate::config::Settings;

pub async fn run(
    settings: &Settings,
    host: &str,
    port: u16,
    admin_token: Option<String>,
) -> anyhow::Result<()> {
    let token = admin_token
        .or_else(|| settings.admin_token.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no admin token configured; pass --admin-token, set TIDEMARK_ADMIN_TOKEN, \
                 or add admin_token under [api] in tidemark.toml"
            )
        })?;

    let url = settings.require_database_url()?.to_string();
    let engine = Arc::new(settings.connect().await?);
    let api = AdminApi::new(engine, Arc::new(StaticAdminToken::new(token)));

    println!("🚀 Admin API on http://{host}:{port} ({})", mask_url(&url));
    api.serve(host, port).await?;
    Ok(())
}
