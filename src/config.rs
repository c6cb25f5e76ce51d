use std::env;

use chrono::Duration;

/// Signing secret of `AppConfig::default()`. `load()` never falls back to it.
pub const TEST_JWT_SECRET: &str = "classifieds-test-only-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup,
/// immutable afterwards, and pulled into handlers and middleware via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // SQLite connection string.
    pub db_url: String,
    // Runtime environment marker. Controls cookie hardening and the Swagger UI.
    pub env: Env,
    // HMAC secret used to sign and verify identity tokens.
    pub jwt_secret: String,
    // Lifetime of an issued identity token.
    pub token_ttl: Duration,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Directory served for paths no route claims (home page, scripts, styles).
    pub static_dir: String,
}

/// Env
///
/// Defines the runtime context. `Local` enables development conveniences,
/// `Production` also demands an explicit `DATABASE_URL`.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            env: Env::Local,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_ttl: Duration::hours(1),
            bind_addr: "127.0.0.1:0".to_string(),
            static_dir: "front".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and implements the
    /// **fail-fast** principle.
    ///
    /// # Panics
    /// Panics when `JWT_KEY` is missing or blank, in every environment, and in
    /// production when `DATABASE_URL` is missing.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = env::var("JWT_KEY").expect("FATAL: JWT_KEY must be set.");
        if jwt_secret.trim().is_empty() {
            panic!("FATAL: JWT_KEY must not be empty.");
        }

        let db_url = match env {
            Env::Production => {
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")
            }
            Env::Local => env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://database/database.db".to_string()),
        };

        let token_ttl = env::var("TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::seconds)
            .unwrap_or_else(|| Duration::hours(1));

        Self {
            db_url,
            env,
            jwt_secret,
            token_ttl,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "front".to_string()),
        }
    }
}
