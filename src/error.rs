use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{repository::RepoError, token::TokenError};

/// ApiError
///
/// Every failure a handler or middleware can report. The specific variant is
/// logged; the client only sees the status code and a generic message, so
/// e.g. an expired token and a forged one are indistinguishable on the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no identity token presented")]
    MissingToken,
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("admin role required")]
    Forbidden,
    #[error("login already registered")]
    DuplicateLogin,
    #[error("unknown login")]
    UserNotFound,
    #[error("password mismatch")]
    InvalidCredentials,
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("resource not found")]
    NotFound,
    #[error("store failure: {0}")]
    Store(RepoError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate => ApiError::DuplicateLogin,
            other => ApiError::Store(other),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("password hashing failed: {err}"))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingToken
            | ApiError::Token(_)
            | ApiError::UserNotFound
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::DuplicateLogin => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client. Never includes internal detail.
    fn public_message(&self) -> &'static str {
        match self {
            ApiError::MissingToken
            | ApiError::Token(TokenError::Malformed)
            | ApiError::Token(TokenError::InvalidSignature)
            | ApiError::Token(TokenError::Expired) => "unauthorized",
            ApiError::UserNotFound | ApiError::InvalidCredentials => "invalid credentials",
            ApiError::Forbidden => "forbidden",
            ApiError::DuplicateLogin => "login already taken",
            ApiError::BadRequest(msg) => *msg,
            ApiError::NotFound => "not found",
            ApiError::Token(TokenError::Signing(_))
            | ApiError::Store(_)
            | ApiError::Internal(_) => "internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
