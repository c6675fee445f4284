//! Bearer token extraction and decoding.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;

const INVALID_TOKEN: &str = "Invalid or expired token.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    pub user_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Turns a raw token into claims.
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<AuthClaims, TokenError>;
}

/// HS256 decoder with cached keys.
#[derive(Clone)]
pub struct JwtDecoder {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl JwtDecoder {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    /// Issues an access token for `user_id` valid for `ttl_minutes`.
    pub fn issue(&self, user_id: i64, ttl_minutes: i64) -> Result<String, TokenError> {
        let claims = AuthClaims {
            user_id,
            exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &AuthClaims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }
}

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<AuthClaims, TokenError> {
        decode::<AuthClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    let header = header
        .ok_or_else(|| ApiError::Unauthorized("Authorization header is missing".to_string()))?;

    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::Unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'".to_string(),
        )),
    }
}

/// Every decode failure is a 401; the actual cause only goes to the log.
pub fn authenticate(header: Option<&str>, decoder: &dyn TokenDecoder) -> Result<AuthClaims, ApiError> {
    let token = bearer_token(header)?;

    decoder.decode(token).map_err(|e| {
        warn!(error = %e, "Token rejected");
        ApiError::Unauthorized(INVALID_TOKEN.to_string())
    })
}
