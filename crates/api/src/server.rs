//! Standalone server wrapping the migration routes.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use tidemark_engine::Engine;

use crate::auth::AdminSessions;
use crate::routes;
use crate::state::AppState;

/// The admin API over one engine.
///
/// Embedders usually mount [`AdminApi::router`] into their own application;
/// [`AdminApi::serve`] runs it standalone for operator use.
pub struct AdminApi {
    state: Arc<AppState>,
}

impl AdminApi {
    pub fn new(engine: Arc<Engine>, sessions: Arc<dyn AdminSessions>) -> Self {
        Self {
            state: Arc::new(AppState { engine, sessions }),
        }
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Binds `host:port` and serves until the process stops.
    pub async fn serve(&self, host: &str, port: u16) -> std::io::Result<()> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr).await?;
        info!(%addr, "migration admin api listening");
        axum::serve(listener, self.router()).await
    }
}
