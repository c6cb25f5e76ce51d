//! Identity token codec.
//!
//! Tokens are compact JWTs signed with HMAC-SHA-256 under a single
//! process-wide secret. They are self-contained: nothing is stored server
//! side, so a token stays valid until its `exp` passes.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::models::{Role, User};

/// The only signing method this codec produces or accepts.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims
///
/// The decoded payload of a verified identity token. Only `TokenCodec::verify`
/// hands these out, so every field downstream is guaranteed present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id in the credential store.
    pub uid: i64,
    pub login: String,
    pub name: String,
    /// Role at issuance. Missing in the payload decodes as empty, i.e. non-admin.
    #[serde(default)]
    pub role: String,
    /// Expiry as a unix timestamp (seconds).
    pub exp: i64,
}

impl Claims {
    pub fn role(&self) -> Role {
        Role::from_claim(&self.role)
    }
}

/// Reasons a token cannot be issued or trusted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("signing error: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    has_secret: bool,
}

/// TokenCodec
///
/// Issues and verifies identity tokens. Cheap to clone; all clones share the
/// same immutable key material, so it can be used from any number of
/// concurrent requests without locking.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<Keys>,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
                has_secret: !secret.is_empty(),
            }),
        }
    }

    /// Signs a token for `user` that expires `ttl` from now. A negative `ttl`
    /// yields an already expired token.
    pub fn issue(&self, user: &User, ttl: Duration) -> Result<String, TokenError> {
        self.ensure_secret()?;

        let claims = Claims {
            uid: user.id,
            login: user.login.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Checks structure, algorithm, signature and expiry, in that order. The
    /// token is trusted as a whole or not at all.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.ensure_secret()?;

        // The signature segment is everything after the second dot, so a stray
        // dot inside it is a bad signature rather than a fourth segment.
        let mut segments = token.splitn(3, '.');
        let (header, payload, signature) =
            match (segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(c), Some(s)) if !h.is_empty() && !c.is_empty() => (h, c, s),
                _ => return Err(TokenError::Malformed),
            };

        let header: RawHeader = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(TokenError::InvalidSignature);
        }
        decode_segment::<Claims>(payload)?;

        // Header and claims are well formed; from here on any defect is the
        // signature's. Strict decoding also rejects non-zero padding bits.
        URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let data = decode::<Claims>(token, &self.keys.decoding, &self.keys.validation).map_err(
            |e| match e.kind() {
                ErrorKind::Base64(_) => TokenError::InvalidSignature,
                _ => TokenError::from(e),
            },
        )?;

        // jsonwebtoken accepts exp == now; a token is dead the second it expires.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    fn ensure_secret(&self) -> Result<(), TokenError> {
        if self.keys.has_secret {
            Ok(())
        } else {
            Err(TokenError::Signing("signing secret is empty".to_string()))
        }
    }
}

// Decodes one base64url JSON segment. jsonwebtoken cannot represent
// `alg: none`, so the header is read here before it is handed over.
fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
