//! Migration endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use tidemark_engine::Version;

use crate::auth::require_admin;
use crate::response::{bad_request, engine_error, ok};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/migrations/status", get(migration_status))
        .route("/api/migrations/run", post(run_migrations))
        .route("/api/migrations/rollback", post(rollback_migration))
        .route("/api/migrations/create", post(create_migration))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn migration_status(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.get_migration_status().await {
        Ok(report) => ok(report),
        Err(err) => engine_error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    /// Inclusive upper bound; everything pending when omitted.
    #[serde(default)]
    target_version: Option<String>,
}

async fn run_migrations(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RunRequest>,
) -> Response {
    let target = match body.target_version.as_deref().map(Version::parse).transpose() {
        Ok(target) => target,
        Err(err) => return bad_request(&err.to_string()),
    };
    match state.engine.migrate(target.as_ref()).await {
        Ok(outcome) => ok(outcome),
        Err(err) => engine_error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct RollbackRequest {
    version: String,
}

async fn rollback_migration(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RollbackRequest>,
) -> Response {
    let version = match Version::parse(&body.version) {
        Ok(version) => version,
        Err(err) => return bad_request(&err.to_string()),
    };
    match state.engine.rollback_migration(&version).await {
        Ok(outcome) => ok(outcome),
        Err(err) => engine_error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    description: String,
}

async fn create_migration(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRequest>,
) -> Response {
    match state.engine.create_migration(&body.description) {
        Ok(filename) => ok(serde_json::json!({ "filename": filename })),
        Err(err) => engine_error(&err),
    }
}
