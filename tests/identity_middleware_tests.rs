use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    routing::{any, get},
};
use chrono::Duration;
use classifieds_backend::{
    auth::{self, AuthUser, PUBLIC_PATHS},
    models::{Role, User},
    token::TokenCodec,
};
use tower::ServiceExt;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn user(role: Role) -> User {
    User {
        id: 9,
        login: "carol".to_string(),
        name: "Carol".to_string(),
        password_hash: String::new(),
        role,
    }
}

fn token_for(role: Role) -> String {
    TokenCodec::new(TEST_JWT_SECRET)
        .issue(&user(role), Duration::hours(1))
        .unwrap()
}

/// A router shaped like the real one, but every handler is a stub that
/// answers 200 so the tests observe only the identity and admin layers.
fn stub_router() -> Router {
    let mut router = Router::new();
    for path in PUBLIC_PATHS {
        router = router.route(path, any(|| async { "public" }));
    }

    let admin = Router::new()
        .route("/api/admin/users", get(|| async { "admin" }))
        .route_layer(middleware::from_fn(auth::admin_gate));

    router
        .route("/api/me", get(|user: AuthUser| async move { user.login }))
        .route("/api/listings", get(|| async { "listings" }))
        .route("/register/index.html", get(|| async { "unlisted" }))
        .route("/health/", get(|| async { "unlisted" }))
        .merge(admin)
        .layer(middleware::from_fn_with_state(
            TokenCodec::new(TEST_JWT_SECRET),
            auth::identity_middleware,
        ))
}

fn request(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(value) = cookie {
        builder = builder.header(header::COOKIE, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn status_of(path: &str, cookie: Option<&str>) -> StatusCode {
    stub_router()
        .oneshot(request(path, cookie))
        .await
        .unwrap()
        .status()
}

// --- Tests ---

#[tokio::test]
async fn test_every_public_path_passes_without_cookie() {
    for path in PUBLIC_PATHS {
        assert_eq!(status_of(path, None).await, StatusCode::OK, "path {}", path);
    }
}

#[tokio::test]
async fn test_allow_list_is_exact_match() {
    for path in [
        "/api/me",
        "/api/listings",
        "/register/index.html",
        "/health/",
        "/api/admin/users",
    ] {
        assert!(!auth::is_public_path(path));
        assert_eq!(
            status_of(path, None).await,
            StatusCode::UNAUTHORIZED,
            "path {}",
            path
        );
    }
}

#[tokio::test]
async fn test_valid_cookie_reaches_handler_with_identity() {
    let cookie = format!("token={}", token_for(Role::User));
    let response = stub_router()
        .oneshot(request("/api/me", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"carol");
}

#[tokio::test]
async fn test_cookie_among_others_is_found() {
    let cookie = format!("theme=dark; token={}; lang=en", token_for(Role::User));
    assert_eq!(status_of("/api/listings", Some(&cookie)).await, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_or_wrong_cookie_is_unauthorized() {
    for cookie in ["token=", "session=abc", "token=garbage"] {
        assert_eq!(
            status_of("/api/listings", Some(cookie)).await,
            StatusCode::UNAUTHORIZED,
            "cookie {}",
            cookie
        );
    }
}

#[tokio::test]
async fn test_token_signed_with_wrong_secret_is_unauthorized() {
    let forged = TokenCodec::new("attacker-secret")
        .issue(&user(Role::Admin), Duration::hours(1))
        .unwrap();
    let cookie = format!("token={forged}");

    assert_eq!(status_of("/api/listings", Some(&cookie)).await, StatusCode::UNAUTHORIZED);
    assert_eq!(status_of("/api/admin/users", Some(&cookie)).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let expired = TokenCodec::new(TEST_JWT_SECRET)
        .issue(&user(Role::User), Duration::seconds(-1))
        .unwrap();
    let cookie = format!("token={expired}");
    assert_eq!(status_of("/api/listings", Some(&cookie)).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejections_do_not_reveal_the_reason() {
    let expired = TokenCodec::new(TEST_JWT_SECRET)
        .issue(&user(Role::User), Duration::seconds(-1))
        .unwrap();
    let forged = TokenCodec::new("attacker-secret")
        .issue(&user(Role::User), Duration::hours(1))
        .unwrap();

    let mut bodies = Vec::new();
    for cookie in [None, Some(format!("token={expired}")), Some(format!("token={forged}"))] {
        let response = stub_router()
            .oneshot(request("/api/listings", cookie.as_deref()))
            .await
            .unwrap();
        bodies.push(axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap());
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);
}

#[tokio::test]
async fn test_admin_gate_forbids_plain_users() {
    let cookie = format!("token={}", token_for(Role::User));
    assert_eq!(status_of("/api/admin/users", Some(&cookie)).await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_gate_admits_admins() {
    let cookie = format!("token={}", token_for(Role::Admin));
    assert_eq!(status_of("/api/admin/users", Some(&cookie)).await, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_gate_without_identity_is_forbidden() {
    // Gate used on its own: no identity layer, so no claims at all.
    let router = Router::new()
        .route("/api/admin/users", get(|| async { "admin" }))
        .route_layer(middleware::from_fn(auth::admin_gate));

    let response = router.oneshot(request("/api/admin/users", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
