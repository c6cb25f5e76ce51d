use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    error::ApiError,
    models::Role,
    token::{Claims, TokenCodec},
};

/// Name of the cookie that carries the identity token.
pub const TOKEN_COOKIE: &str = "token";

/// Public allow-list
///
/// Exact request paths that never require identity. Matching is literal: a
/// trailing-slash variant is only public if it is listed here too.
pub const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/register",
    "/register/",
    "/api/register",
    "/api/login",
    "/api/logout",
    "/styles.css",
    "/app.js",
    "/health",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// AuthUser
///
/// The verified identity of the current request, built from token claims by
/// `identity_middleware` and stored in the request extensions. Handlers take
/// it as an argument to scope their work to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub login: String,
    pub name: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        let role = claims.role();
        AuthUser {
            id: claims.uid,
            login: claims.login,
            name: claims.name,
            role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// AuthUser Extractor Implementation
///
/// Reads the identity attached by `identity_middleware`. A handler on an
/// allow-listed path has no identity, so asking for one there is a 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::MissingToken)
    }
}

/// identity_middleware
///
/// Runs on every request. Allow-listed paths pass through untouched
/// (`Bypassed`). Everything else must carry a `token` cookie that verifies;
/// the resulting identity is attached to the request (`Verified`) before the
/// next stage runs. Failures stop the request here with a 401.
pub async fn identity_middleware(
    State(codec): State<TokenCodec>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if is_public_path(&path) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let token = match jar.get(TOKEN_COOKIE).map(|c| c.value()) {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => {
            tracing::debug!(%path, "no identity token on protected path");
            return ApiError::MissingToken.into_response();
        }
    };

    match codec.verify(&token) {
        Ok(claims) => {
            let user = AuthUser::from(claims);
            tracing::debug!(user_id = user.id, role = user.role.as_str(), "identity verified");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(%path, reason = %err, "identity verification failed");
            ApiError::Token(err).into_response()
        }
    }
}

/// admin_gate
///
/// Layered on the admin routes, inside `identity_middleware`. Lets the request
/// through only when the attached identity holds the admin role. No identity
/// at all is treated as non-admin.
pub async fn admin_gate(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<AuthUser>()
        .is_some_and(AuthUser::is_admin);

    if !is_admin {
        return ApiError::Forbidden.into_response();
    }
    next.run(request).await
}

/// Cookie carrying a freshly issued token. Invisible to page scripts.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that overwrites the session cookie with an empty, already expired one.
pub fn cleared_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, "")).path("/").http_only(true).build();
    cookie.make_removal();
    cookie
}
