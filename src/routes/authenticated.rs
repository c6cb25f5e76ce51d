use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Routes for any caller with a verified token. Each handler takes `AuthUser`
/// and scopes its store calls to that user's id.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/me
        .route("/api/me", get(handlers::me))
        // GET/POST /api/listings
        // Paginated own listings (10 per page, optional title/city filter) and creation.
        .route(
            "/api/listings",
            get(handlers::get_listings).post(handlers::create_listing),
        )
        // PUT/DELETE /api/listings/{id}
        // Ownership is enforced in the repository query.
        .route(
            "/api/listings/{id}",
            put(handlers::update_listing).delete(handlers::delete_listing),
        )
        // GET /api/cities
        .route("/api/cities", get(handlers::get_cities))
        // GET /api/analytics
        .route("/api/analytics", get(handlers::get_analytics))
}
