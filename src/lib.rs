use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, Method, header},
    middleware,
};
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod token;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{RepositoryState, SqliteRepository};
pub use token::TokenCodec;

/// ApiDoc
///
/// The OpenAPI document for every handler, served by Swagger UI in local mode
/// to signed-in callers.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::register, handlers::login, handlers::logout,
        handlers::me, handlers::get_listings, handlers::create_listing,
        handlers::update_listing, handlers::delete_listing, handlers::get_cities,
        handlers::get_analytics, handlers::admin_users, handlers::admin_listings,
        handlers::admin_set_role, handlers::admin_delete_user
    ),
    components(
        schemas(
            models::Role, models::Listing, models::RegisterRequest, models::LoginRequest,
            models::NewListing, models::UpdateListingRequest, models::SetRoleRequest,
            models::DeleteUserRequest, models::UserAdmin, models::MeResponse,
            models::ListingAnalytics, models::HealthReport,
        )
    ),
    tags(
        (name = "classifieds", description = "Classifieds API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services. The store handle and
/// the token codec are constructed once by the process entry point and live
/// as long as the server.
#[derive(Clone)]
pub struct AppState {
    /// Credential and listing store.
    pub repo: RepositoryState,
    /// Token issuance and verification under the server-wide secret.
    pub codec: TokenCodec,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let codec = TokenCodec::new(&config.jwt_secret);
        Self {
            repo,
            codec,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(app_state: &AppState) -> TokenCodec {
        app_state.codec.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing table and the layer stack. From the outside in:
/// CORS, request id, tracing, identity verification, then per-route gates.
pub fn create_router(state: AppState) -> Router {
    // Cookies only travel cross-origin with credentials allowed, which in turn
    // rules out a wildcard origin; echo the caller's origin instead.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300));

    let x_request_id = HeaderName::from_static("x-request-id");

    let mut routes = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes());
    if state.config.env == config::Env::Local {
        routes = routes.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
    }

    // Everything sits behind the identity layer, the docs and the static
    // fallback included; only `auth::PUBLIC_PATHS` gets through without a token.
    routes
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(middleware::from_fn_with_state(
            state.codec.clone(),
            auth::identity_middleware,
        ))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: every log line of a request carries its
/// method, URI and `x-request-id`. Headers, and so cookies, are never recorded.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
