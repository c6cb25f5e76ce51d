use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field stored on every account. New accounts are `user`; only an
/// admin can promote or demote.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Interprets a role claim. Anything other than exactly `admin` is a
    /// plain user, so a missing or garbled claim never grants privileges.
    pub fn from_claim(value: &str) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// User
///
/// The credential record from the `users` table. Internal only: the password
/// hash never leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    #[sqlx(rename = "username")]
    pub login: String,
    pub name: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub role: Role,
}

/// Listing
///
/// A classified advert from the `listings` table, always owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Listing {
    pub id: i64,
    // Exposed as "title" to the frontend.
    #[serde(rename = "title")]
    pub name: String,
    // 'type' is a reserved keyword in Rust.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub listing_type: String,
    pub description: String,
    pub status: String,
    pub price: f64,
    pub city: String,
    pub user_id: i64,
    #[ts(type = "string")]
    pub date_created: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /api/register`. The password is hashed immediately
/// and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
    pub name: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// NewListing
///
/// Input payload for `POST /api/listings`. Only the title is mandatory; the
/// frontend form sends title, price and city.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct NewListing {
    pub title: String,
    #[serde(rename = "type")]
    pub listing_type: String,
    pub description: String,
    pub status: String,
    pub price: f64,
    pub city: String,
}

/// UpdateListingRequest
///
/// Partial update payload for `PUT /api/listings/{id}`. Absent fields keep
/// their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateListingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// SetRoleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetRoleRequest {
    pub user_id: i64,
    pub role: Role,
}

/// DeleteUserRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteUserRequest {
    pub user_id: i64,
}

// --- Dashboard & Profile Schemas (Output) ---

/// UserAdmin
///
/// One row of the admin user table: the account plus how many listings it owns.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct UserAdmin {
    pub id: i64,
    pub login: String,
    pub name: String,
    pub role: Role,
    pub total: i64,
}

/// MeResponse
///
/// Output of `GET /api/me`, derived purely from the verified token claims.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MeResponse {
    pub id: i64,
    pub login: String,
    pub name: String,
    pub role: Role,
}

/// ListingAnalytics
///
/// Per-user summary shown next to the listings table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ListingAnalytics {
    pub total: i64,
    pub avg_price: f64,
    pub top_city: Option<String>,
}

/// HealthReport
///
/// Store connectivity and pool statistics for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// "up" or "down".
    pub status: String,
    pub message: String,
    pub open_connections: u32,
    pub idle: usize,
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        self.status == "up"
    }
}
