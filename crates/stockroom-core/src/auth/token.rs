use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::gate::GateError;
use crate::error::StockroomError;

/// Lifetime of every issued token. There is no refresh or rotation.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims payload.
///
/// `roles` and `permissions` are a snapshot taken at login. They are not
/// refreshed when the underlying roles change; the user has to log in again.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role names assigned at issuance
    #[serde(default)]
    pub roles: Vec<String>,
    /// Flattened effective permission names at issuance. `None` marks a
    /// role-only token, which no permission gate accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Signs and verifies bearer tokens with a server-held HS256 secret.
///
/// Built once at startup from configuration and shared behind an `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `subject` carrying the given role/permission snapshot.
    pub fn issue(
        &self,
        subject: &str,
        roles: Vec<String>,
        permissions: Option<Vec<String>>,
    ) -> Result<String, StockroomError> {
        self.issue_at(subject, roles, permissions, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: &str,
        roles: Vec<String>,
        permissions: Option<Vec<String>>,
        now: DateTime<Utc>,
    ) -> Result<String, StockroomError> {
        let expires = now + Duration::hours(TOKEN_TTL_HOURS);
        let claims = Claims {
            sub: subject.to_string(),
            roles,
            permissions,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| StockroomError::Internal(format!("Failed to create token: {e}")))
    }

    /// Verify signature and expiry. Every failure collapses to
    /// [`GateError::InvalidOrExpired`].
    pub fn verify(&self, token: &str) -> Result<Claims, GateError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = %e, "token rejected");
                GateError::InvalidOrExpired
            })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// Cookies and query parameters are not consulted.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
