//! HTTP admin surface for [`tidemark_engine`].
//!
//! Exposes migration status, run, rollback, and create as JSON endpoints
//! behind an admin session check. Every response uses the same envelope:
//! `{"success": ..., "data": ...}` or `{"success": false, "error": ...}`.

pub mod auth;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{AdminSessions, StaticAdminToken};
pub use response::ApiResponse;
pub use server::AdminApi;
pub use state::AppState;
