//! Shared state handed to every handler.

use std::sync::Arc;

use tidemark_engine::Engine;

use crate::auth::AdminSessions;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<dyn AdminSessions>,
}
