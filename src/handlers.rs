use crate::{
    AppState,
    auth::{self, AuthUser},
    config::Env,
    error::ApiError,
    models::{
        DeleteUserRequest, HealthReport, Listing, ListingAnalytics, LoginRequest, MeResponse,
        NewListing, RegisterRequest, SetRoleRequest, UpdateListingRequest, UserAdmin,
    },
    password,
    repository::PAGE_SIZE,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

// --- Filter Structs ---

/// ListingQuery
///
/// Query parameters for `GET /api/listings`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListingQuery {
    /// 1-based page number; anything below 1 is treated as 1.
    pub page: Option<i64>,
    /// Case-insensitive substring matched against title and city.
    pub filter: Option<String>,
}

// --- Public Handlers ---

/// health
///
/// [Public Route] Reports store connectivity and pool statistics.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store reachable", body = HealthReport),
        (status = 503, description = "Store unreachable", body = HealthReport)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.repo.health().await;
    let status = if report.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// register
///
/// [Public Route] Creates an account with role `user`. The password is bcrypt
/// hashed before it reaches the store.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered"),
        (status = 400, description = "Missing field"),
        (status = 409, description = "Login taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let login = payload.login.trim();
    let name = payload.name.trim();
    if login.is_empty() || name.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("login, password and name are required"));
    }

    let hash = password::hash_password(payload.password).await?;
    let id = state.repo.create_user(login, name, &hash).await?;

    tracing::info!(user_id = id, "user created");
    Ok(StatusCode::CREATED)
}

/// login
///
/// [Public Route] Checks the password and, on success, sets the `token`
/// cookie. An unknown login and a wrong password produce the same response.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, token cookie set"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, &'static str), ApiError> {
    let user = state
        .repo
        .user_by_login(payload.login.trim())
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if !password::verify_password(payload.password, user.password_hash.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.codec.issue(&user, state.config.token_ttl)?;
    let secure = state.config.env == Env::Production;

    tracing::info!(user_id = user.id, "user logged in");
    Ok((jar.add(auth::session_cookie(token, secure)), "Login successful"))
}

/// logout
///
/// [Public Route] Expires the `token` cookie and sends the browser home.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 303, description = "Cookie cleared, redirect to /"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.add(auth::cleared_cookie()), Redirect::to("/"))
}

// --- Authenticated Handlers ---

/// me
///
/// [Authenticated Route] Echoes the identity baked into the caller's token.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Current identity", body = MeResponse))
)]
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        login: user.login,
        name: user.name,
        role: user.role,
    })
}

/// get_listings
///
/// [Authenticated Route] One page of the caller's own listings.
#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingQuery),
    responses((status = 200, description = "My listings", body = [Listing]))
)]
pub async fn get_listings(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(PAGE_SIZE);
    let listings = state
        .repo
        .listings_for_user(id, offset, query.filter)
        .await?;
    Ok(Json(listings))
}

/// create_listing
///
/// [Authenticated Route] The owner is always the caller, never the payload.
#[utoipa::path(
    post,
    path = "/api/listings",
    request_body = NewListing,
    responses(
        (status = 201, description = "Created", body = Listing),
        (status = 400, description = "Missing title")
    )
)]
pub async fn create_listing(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NewListing>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required"));
    }
    let listing = state.repo.create_listing(id, payload).await?;
    tracing::info!(listing_id = listing.id, user_id = id, "listing created");
    Ok((StatusCode::CREATED, Json(listing)))
}

/// update_listing
///
/// [Authenticated Route] Partial update of one of the caller's listings.
/// Someone else's listing is reported as not found.
#[utoipa::path(
    put,
    path = "/api/listings/{id}",
    params(("id" = i64, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 204, description = "Updated"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn update_listing(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<StatusCode, ApiError> {
    if state.repo.update_listing(id, user_id, payload).await? {
        tracing::info!(listing_id = id, "listing updated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// delete_listing
///
/// [Authenticated Route] Deletes one of the caller's listings.
#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    params(("id" = i64, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn delete_listing(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_listing(id, user_id).await? {
        tracing::info!(listing_id = id, "listing deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// get_cities
///
/// [Authenticated Route] Distinct cities across the caller's listings.
#[utoipa::path(
    get,
    path = "/api/cities",
    responses((status = 200, description = "Cities", body = [String]))
)]
pub async fn get_cities(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.repo.cities_for_user(id).await?))
}

/// get_analytics
///
/// [Authenticated Route] Count, average price and most common city of the
/// caller's listings.
#[utoipa::path(
    get,
    path = "/api/analytics",
    responses((status = 200, description = "Summary", body = ListingAnalytics))
)]
pub async fn get_analytics(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ListingAnalytics>, ApiError> {
    Ok(Json(state.repo.analytics_for_user(id).await?))
}

// --- Admin Handlers ---
// The role check lives in `auth::admin_gate`, layered on the admin router.

/// admin_users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserAdmin]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserAdmin>>, ApiError> {
    Ok(Json(state.repo.all_users().await?))
}

/// admin_listings
#[utoipa::path(
    get,
    path = "/api/admin/listings",
    responses(
        (status = 200, description = "All listings", body = [Listing]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_listings(
    State(state): State<AppState>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    Ok(Json(state.repo.all_listings().await?))
}

/// admin_set_role
///
/// [Admin Route] Changes a user's role. Tokens already issued to that user
/// keep their old role until they expire.
#[utoipa::path(
    post,
    path = "/api/admin/set-role",
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role changed"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn admin_set_role(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<StatusCode, ApiError> {
    if !state.repo.set_user_role(payload.user_id, payload.role).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(
        admin_id = admin.id,
        user_id = payload.user_id,
        role = payload.role.as_str(),
        "user role changed"
    );
    Ok(StatusCode::OK)
}

/// admin_delete_user
///
/// [Admin Route] Removes an account and all of its listings.
#[utoipa::path(
    post,
    path = "/api/admin/delete-user",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn admin_delete_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteUserRequest>,
) -> Result<StatusCode, ApiError> {
    if !state.repo.delete_user(payload.user_id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(admin_id = admin.id, user_id = payload.user_id, "user deleted");
    Ok(StatusCode::OK)
}
