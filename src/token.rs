//! # Token Service
//!
//! Issues and verifies the signed, time-limited credential carried in the `jwt` cookie.
//! Verification is pure: no I/O, no revocation lookup. Logging out only clears the
//! cookie on the client, so a copied credential stays valid until its `exp`.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::ApiError, models::UserSnapshot};

/// Name of the cookie carrying the credential.
pub const COOKIE_NAME: &str = "jwt";

/// Lifetime of an issued credential, mirrored by the cookie expiry.
pub const TOKEN_TTL_HOURS: i64 = 72;

/// Claims
///
/// Strongly typed payload, validated at decode time. A token whose `userData` is
/// missing or not a well-formed [`UserSnapshot`] fails to decode and is treated
/// exactly like a missing token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Sanitized user snapshot; never contains password material.
    #[serde(rename = "userData")]
    pub user_data: UserSnapshot,
    /// Absolute expiry, unix seconds.
    pub exp: i64,
    /// Issued at, unix seconds. Optional on the wire; only `exp` is required.
    #[serde(default)]
    pub iat: i64,
    /// Unique credential id. Not consulted today; a revocation set would key on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
}

/// A freshly signed credential and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing key must not be empty")]
    EmptyKey,
    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// TokenService
///
/// Holds the process-wide signing key. Built once at startup and shared read-only
/// through the application state.
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptyKey);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is exact: the 72h window is the contract.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
        })
    }

    /// Signs a credential for `user`, valid for [`TOKEN_TTL_HOURS`] from now.
    pub fn issue(&self, user: &UserSnapshot) -> Result<IssuedToken, TokenError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(
        &self,
        user: &UserSnapshot,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp();
        let claims = Claims {
            user_data: user.clone(),
            exp: expires_at,
            iat: issued_at.timestamp(),
            jti: Some(Uuid::new_v4()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Validates signature, expiry and claim shape.
    ///
    /// Every failure collapses into `AuthenticationMissing`: at this layer a missing,
    /// malformed and expired credential are indistinguishable.
    pub fn verify(&self, raw: &str) -> Result<Claims, ApiError> {
        if raw.is_empty() {
            return Err(ApiError::AuthenticationMissing);
        }
        decode::<Claims>(raw, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "credential rejected");
                ApiError::AuthenticationMissing
            })
    }
}

/// Reads the raw credential from the `jwt` cookie, falling back to
/// `Authorization: Bearer`. The cookie wins when both are present.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_owned());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// The HTTP-only session cookie for a freshly issued credential.
pub fn session_cookie(issued: &IssuedToken) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, issued.token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .expires(OffsetDateTime::from_unix_timestamp(issued.expires_at).ok())
        .build()
}

/// Overwrites the session cookie with an empty value that expired at the epoch.
/// The credential itself is not invalidated server-side.
pub fn cleared_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, String::new()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}
