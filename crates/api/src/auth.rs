//! Admin session checks for every migration endpoint.
//!
//! Callers present a token either as `Authorization: Bearer <token>` or as a
//! `session` cookie. What a valid token looks like is up to the embedding
//! application; it plugs in its own [`AdminSessions`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::response::ApiResponse;
use crate::state::AppState;

/// Decides whether a presented token carries admin rights.
#[async_trait]
pub trait AdminSessions: Send + Sync {
    async fn authorize_admin(&self, token: &str) -> bool;
}

/// Single shared secret, suitable for operator tooling and tests.
pub struct StaticAdminToken {
    token: String,
}

impl StaticAdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AdminSessions for StaticAdminToken {
    async fn authorize_admin(&self, token: &str) -> bool {
        token == self.token
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("session="))
}

/// Rejects the request unless it carries an authorized admin token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let token = bearer_token(headers).or_else(|| session_cookie(headers));

    let Some(token) = token else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("authentication required")),
        )
            .into_response();
    };
    if !state.sessions.authorize_admin(token).await {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("admin access required")),
        )
            .into_response();
    }

    next.run(request).await
}
