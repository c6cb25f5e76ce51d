use crate::models::{
    HealthReport, Listing, ListingAnalytics, NewListing, Role, UpdateListingRequest, User,
    UserAdmin,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    SqlitePool,
    migrate::{MigrateError, Migrator},
    query_builder::QueryBuilder,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

/// Schema migrations embedded at compile time from `./migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Listings returned per page by `listings_for_user`.
pub const PAGE_SIZE: i64 = 10;

/// RepoError
///
/// Store failures. Uniqueness violations are split out so callers can turn a
/// taken login into a 409 instead of a generic 500.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    Duplicate,
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] MigrateError),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate,
            _ => RepoError::Database(err),
        }
    }
}

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only ever
/// see `Arc<dyn Repository>`, so tests can swap in any implementation.
///
/// Every listing operation takes the owner's id; a row owned by somebody else
/// behaves exactly like a missing row.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credentials ---
    /// Inserts a new account with role `user` and returns its id.
    async fn create_user(&self, login: &str, name: &str, password_hash: &str)
    -> Result<i64, RepoError>;
    async fn user_by_login(&self, login: &str) -> Result<Option<User>, RepoError>;

    // --- Owner Actions ---
    async fn create_listing(
        &self,
        user_id: i64,
        listing: NewListing,
    ) -> Result<Listing, RepoError>;
    /// One page (`PAGE_SIZE` rows from `offset`) of the owner's listings,
    /// newest first, optionally narrowed by a title/city substring.
    async fn listings_for_user(
        &self,
        user_id: i64,
        offset: i64,
        filter: Option<String>,
    ) -> Result<Vec<Listing>, RepoError>;
    async fn update_listing(
        &self,
        id: i64,
        user_id: i64,
        req: UpdateListingRequest,
    ) -> Result<bool, RepoError>;
    async fn delete_listing(&self, id: i64, user_id: i64) -> Result<bool, RepoError>;
    async fn cities_for_user(&self, user_id: i64) -> Result<Vec<String>, RepoError>;
    async fn analytics_for_user(&self, user_id: i64) -> Result<ListingAnalytics, RepoError>;

    // --- Admin ---
    async fn all_users(&self) -> Result<Vec<UserAdmin>, RepoError>;
    async fn all_listings(&self) -> Result<Vec<Listing>, RepoError>;
    async fn set_user_role(&self, user_id: i64, role: Role) -> Result<bool, RepoError>;
    /// Removes the account together with all of its listings.
    async fn delete_user(&self, user_id: i64) -> Result<bool, RepoError>;

    async fn health(&self) -> HealthReport;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const LISTING_COLUMNS: &str =
    "id, name, type, description, status, price, city, user_id, date_created";

/// SqliteRepository
///
/// The `Repository` implementation backed by a SQLite connection pool.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Applies any pending schema migrations.
    pub async fn migrate(&self) -> Result<(), RepoError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn create_user(
        &self,
        login: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<i64, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, password, name, role) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(login)
        .bind(password_hash)
        .bind(name)
        .bind(Role::User)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn user_by_login(&self, login: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role FROM users WHERE username = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_listing(
        &self,
        user_id: i64,
        listing: NewListing,
    ) -> Result<Listing, RepoError> {
        let query = format!(
            "INSERT INTO listings \
             (name, type, description, status, price, city, user_id, date_created) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {LISTING_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Listing>(&query)
            .bind(listing.title)
            .bind(listing.listing_type)
            .bind(listing.description)
            .bind(listing.status)
            .bind(listing.price)
            .bind(listing.city)
            .bind(user_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// Uses QueryBuilder so the optional filter stays parameterized.
    async fn listings_for_user(
        &self,
        user_id: i64,
        offset: i64,
        filter: Option<String>,
    ) -> Result<Vec<Listing>, RepoError> {
        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("SELECT ");
        builder.push(LISTING_COLUMNS);
        builder.push(" FROM listings WHERE user_id = ");
        builder.push_bind(user_id);

        if let Some(f) = filter.filter(|f| !f.trim().is_empty()) {
            // SQLite LIKE is case-insensitive for ASCII.
            let pattern = format!("%{}%", f.trim());
            builder.push(" AND (name LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR city LIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY date_created DESC, id DESC LIMIT ");
        builder.push_bind(PAGE_SIZE);
        builder.push(" OFFSET ");
        builder.push_bind(offset.max(0));

        let listings = builder
            .build_query_as::<Listing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(listings)
    }

    /// COALESCE keeps every column whose field in `req` is `None`.
    async fn update_listing(
        &self,
        id: i64,
        user_id: i64,
        req: UpdateListingRequest,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET name = COALESCE(?, name),
                type = COALESCE(?, type),
                description = COALESCE(?, description),
                status = COALESCE(?, status),
                price = COALESCE(?, price),
                city = COALESCE(?, city)
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(req.title)
        .bind(req.listing_type)
        .bind(req.description)
        .bind(req.status)
        .bind(req.price)
        .bind(req.city)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_listing(&self, id: i64, user_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cities_for_user(&self, user_id: i64) -> Result<Vec<String>, RepoError> {
        let cities = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT city FROM listings WHERE user_id = ? AND city <> '' ORDER BY city",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cities)
    }

    async fn analytics_for_user(&self, user_id: i64) -> Result<ListingAnalytics, RepoError> {
        let (total, avg_price) = sqlx::query_as::<_, (i64, f64)>(
            "SELECT COUNT(*), COALESCE(AVG(price), 0.0) FROM listings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let top_city = sqlx::query_scalar::<_, String>(
            r#"
            SELECT city FROM listings
            WHERE user_id = ? AND city <> ''
            GROUP BY city
            ORDER BY COUNT(*) DESC, city ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ListingAnalytics {
            total,
            avg_price,
            top_city,
        })
    }

    async fn all_users(&self) -> Result<Vec<UserAdmin>, RepoError> {
        let users = sqlx::query_as::<_, UserAdmin>(
            r#"
            SELECT u.id, u.username AS login, u.name, u.role, COUNT(l.id) AS total
            FROM users u
            LEFT JOIN listings l ON l.user_id = u.id
            GROUP BY u.id, u.username, u.name, u.role
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn all_listings(&self) -> Result<Vec<Listing>, RepoError> {
        let query =
            format!("SELECT {LISTING_COLUMNS} FROM listings ORDER BY date_created DESC, id DESC");
        let listings = sqlx::query_as::<_, Listing>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(listings)
    }

    async fn set_user_role(&self, user_id: i64, role: Role) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM listings WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health(&self) -> HealthReport {
        let ping = tokio::time::timeout(
            Duration::from_secs(1),
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await;

        let (status, message) = match ping {
            Ok(Ok(_)) => ("up", "It's healthy".to_string()),
            Ok(Err(e)) => {
                tracing::error!("health check query failed: {:?}", e);
                ("down", "database unavailable".to_string())
            }
            Err(_) => {
                tracing::error!("health check timed out");
                ("down", "database did not respond in time".to_string())
            }
        };

        HealthReport {
            status: status.to_string(),
            message,
            open_connections: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}
