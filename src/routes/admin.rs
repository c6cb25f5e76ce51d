use crate::{AppState, auth, handlers};
use axum::{
    Router,
    middleware,
    routing::{get, post},
};

/// Admin Router Module
///
/// Moderation endpoints. The whole router sits behind `auth::admin_gate`, which
/// runs after the identity layer has attached the caller's claims and rejects
/// anyone whose token does not carry the admin role with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/users
        // Every account with its listing count.
        .route("/api/admin/users", get(handlers::admin_users))
        // GET /api/admin/listings
        // Every listing, regardless of owner.
        .route("/api/admin/listings", get(handlers::admin_listings))
        // POST /api/admin/set-role
        .route("/api/admin/set-role", post(handlers::admin_set_role))
        // POST /api/admin/delete-user
        .route("/api/admin/delete-user", post(handlers::admin_delete_user))
        .route_layer(middleware::from_fn(auth::admin_gate))
}
