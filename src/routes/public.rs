use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Every path registered here must also appear in `auth::PUBLIC_PATHS`,
/// otherwise the identity layer will demand a token for it.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Store connectivity check for monitoring and load balancers.
        .route("/health", get(handlers::health))
        // POST /api/register
        .route("/api/register", post(handlers::register))
        // POST /api/login
        // Sets the HTTP-only `token` cookie on success.
        .route("/api/login", post(handlers::login))
        // POST /api/logout
        .route("/api/logout", post(handlers::logout))
}
