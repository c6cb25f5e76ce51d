use classifieds_backend::{
    AppConfig, AppState, create_router,
    models::{Listing, ListingAnalytics, MeResponse},
    repository::{RepositoryState, SqliteRepository},
};
use reqwest::{StatusCode, redirect::Policy};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite in tests");
    let repository = SqliteRepository::new(pool);
    repository.migrate().await.expect("Failed to run migrations");

    let repo = Arc::new(repository) as RepositoryState;
    let router = create_router(AppState::new(repo, AppConfig::default()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

/// A browser-like client: keeps cookies, does not follow redirects.
fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = spawn_app().await;
    let client = browser();

    // 1. Anonymous access is refused
    let anonymous = client
        .get(format!("{}/api/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    // 2. Register + login; the cookie jar now holds the token
    let register = client
        .post(format!("{}/api/register", app.address))
        .json(&json!({ "login": "dora", "password": "explorer", "name": "Dora" }))
        .send()
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::CREATED);

    let login = client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "login": "dora", "password": "explorer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);

    let me: MeResponse = client
        .get(format!("{}/api/me", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me.login, "dora");

    // 3. Listing CRUD under the cookie
    let created: Listing = client
        .post(format!("{}/api/listings", app.address))
        .json(&json!({ "title": "Map", "price": 5.0, "city": "Quito" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created.user_id, me.id);

    let update = client
        .put(format!("{}/api/listings/{}", app.address, created.id))
        .json(&json!({ "price": 7.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::NO_CONTENT);

    let listings: Vec<Listing> = client
        .get(format!("{}/api/listings?page=1&filter=quito", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].price, 7.5);

    let cities: Vec<String> = client
        .get(format!("{}/api/cities", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cities, vec!["Quito".to_string()]);

    let stats: ListingAnalytics = client
        .get(format!("{}/api/analytics", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.top_city.as_deref(), Some("Quito"));

    let delete = client
        .delete(format!("{}/api/listings/{}", app.address, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    // 4. Logout expires the cookie, protected routes are closed again
    let logout = client
        .post(format!("{}/api/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);

    let after = client
        .get(format!("{}/api/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_plain_user_is_forbidden_from_admin_api() {
    let app = spawn_app().await;
    let client = browser();

    client
        .post(format!("{}/api/register", app.address))
        .json(&json!({ "login": "eve", "password": "pw", "name": "Eve" }))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/login", app.address))
        .json(&json!({ "login": "eve", "password": "pw" }))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("{}/api/admin/listings", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
