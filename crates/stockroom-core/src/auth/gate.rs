//! Authorization gates.
//!
//! Every protected route runs one of three gates before its handler body:
//!
//! ```text
//! UNAUTHENTICATED ──token present?──▶ TOKEN_CHECKED ──valid?──▶ AUTHENTICATED
//!        │ no                              │ no                       │
//!        ▼                                 ▼                          ▼
//!   401 Authentication required   401 Invalid or expired token   AUTHORIZED | 403
//! ```
//!
//! Role and permission checks run purely over the claims embedded in the
//! token. No gate touches the database.

use std::collections::BTreeSet;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::token::{extract_bearer, Claims, TokenCodec};
use crate::response::ApiResponse;

/// Why a gate refused a request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// No bearer token was presented.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Bad signature, malformed token, or expiry elapsed.
    #[error("Invalid or expired token")]
    InvalidOrExpired,

    /// Valid identity that fails the role or permission check.
    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl GateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::AuthenticationRequired | GateError::InvalidOrExpired => {
                StatusCode::UNAUTHORIZED
            }
            GateError::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GateError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            GateError::InvalidOrExpired => "INVALID_OR_EXPIRED",
            GateError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
        }
    }

    /// The exact client-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            GateError::AuthenticationRequired => "Authentication required",
            GateError::InvalidOrExpired => "Invalid or expired token",
            GateError::InsufficientPermissions => "Insufficient permissions",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = ApiResponse::error(self.message());
        (self.status_code(), axum::Json(body)).into_response()
    }
}

/// The decoded identity a successful gate hands to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub roles: BTreeSet<String>,
    /// `None` for role-only tokens that carry no permission snapshot.
    pub permissions: Option<BTreeSet<String>>,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            subject: claims.sub,
            roles: claims.roles.into_iter().collect(),
            permissions: claims.permissions.map(|p| p.into_iter().collect()),
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// What a route demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any one of the listed roles is enough.
    AnyRole(Vec<String>),
    /// A single permission, satisfied exactly or by a `feature.*` wildcard.
    Permission(String),
}

impl Requirement {
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::AnyRole(roles.into_iter().map(Into::into).collect())
    }

    pub fn permission(name: impl Into<String>) -> Self {
        Requirement::Permission(name.into())
    }
}

impl Identity {
    /// Parse the identity's user id.
    pub fn user_id(&self) -> Option<i32> {
        self.subject.parse().ok()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether this identity holds `required`, directly or through a wildcard.
    pub fn has_permission(&self, required: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|held| held.iter().any(|p| permission_matches(p, required)))
    }

    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::AnyRole(allowed) => allowed.iter().any(|r| self.has_role(r)),
            Requirement::Permission(required) => self.has_permission(required),
        }
    }

    /// Check a requirement, returning `InsufficientPermissions` on mismatch.
    pub fn require(&self, requirement: &Requirement) -> Result<(), GateError> {
        if self.satisfies(requirement) {
            Ok(())
        } else {
            tracing::debug!(subject = %self.subject, ?requirement, "gate denied");
            Err(GateError::InsufficientPermissions)
        }
    }
}

/// Match one held permission against a requirement.
///
/// `users.*` satisfies any requirement starting with `users.`; anything else
/// needs exact equality.
pub fn permission_matches(held: &str, required: &str) -> bool {
    if held == required {
        return true;
    }
    match held.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('.') => required.starts_with(prefix),
        _ => false,
    }
}

/// Verify the bearer token and return the identity it carries.
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Result<Identity, GateError> {
    let token = extract_bearer(headers).ok_or(GateError::AuthenticationRequired)?;
    let claims = codec.verify(token)?;
    Ok(Identity::from(claims))
}

/// Authenticate, then check `requirement` against the token's claims.
pub fn authorize(
    codec: &TokenCodec,
    headers: &HeaderMap,
    requirement: &Requirement,
) -> Result<Identity, GateError> {
    let identity = authenticate(codec, headers)?;
    identity.require(requirement)?;
    Ok(identity)
}

/// Pass when the identity holds at least one of `allowed`.
pub fn require_any_role(
    codec: &TokenCodec,
    headers: &HeaderMap,
    allowed: &[&str],
) -> Result<Identity, GateError> {
    authorize(codec, headers, &Requirement::any_role(allowed.iter().copied()))
}

/// Pass when the identity's permission snapshot satisfies `required`.
pub fn require_permission(
    codec: &TokenCodec,
    headers: &HeaderMap,
    required: &str,
) -> Result<Identity, GateError> {
    authorize(codec, headers, &Requirement::permission(required))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn codec() -> TokenCodec {
        TokenCodec::new("gate-test-secret")
    }

    fn headers_for(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn token(roles: &[&str], permissions: Option<&[&str]>) -> String {
        codec()
            .issue(
                "1",
                roles.iter().map(|s| s.to_string()).collect(),
                permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
            )
            .unwrap()
    }

    #[test]
    fn wildcard_matching() {
        assert!(permission_matches("users.view", "users.view"));
        assert!(permission_matches("users.*", "users.view"));
        assert!(permission_matches("users.*", "users.assign_roles"));
        assert!(!permission_matches("roles.*", "users.view"));
        assert!(!permission_matches("users.view", "users.delete"));
        assert!(!permission_matches("users*", "users.view"));
    }

    #[test]
    fn missing_token_requires_authentication() {
        let result = authenticate(&codec(), &HeaderMap::new());
        assert_eq!(result, Err(GateError::AuthenticationRequired));
    }

    #[test]
    fn bad_token_is_invalid() {
        let result = authenticate(&codec(), &headers_for("abc.def.ghi"));
        assert_eq!(result, Err(GateError::InvalidOrExpired));
    }

    #[test]
    fn authenticate_returns_claims() {
        let t = token(&["cashier"], Some(&["products.view"]));
        let identity = authenticate(&codec(), &headers_for(&t)).unwrap();
        assert_eq!(identity.subject, "1");
        assert_eq!(identity.user_id(), Some(1));
        assert!(identity.has_role("cashier"));
    }

    #[test]
    fn any_role_is_any_of() {
        let both = token(&["admin", "cashier"], Some(&[]));
        assert!(require_any_role(&codec(), &headers_for(&both), &["admin"]).is_ok());

        let cashier = token(&["cashier"], Some(&[]));
        assert_eq!(
            require_any_role(&codec(), &headers_for(&cashier), &["admin"]),
            Err(GateError::InsufficientPermissions)
        );
        assert!(require_any_role(&codec(), &headers_for(&cashier), &["admin", "cashier"]).is_ok());
    }

    #[test]
    fn permission_gate_honours_wildcards() {
        let users = token(&[], Some(&["users.*"]));
        assert!(require_permission(&codec(), &headers_for(&users), "users.view").is_ok());

        let roles = token(&[], Some(&["roles.*"]));
        assert_eq!(
            require_permission(&codec(), &headers_for(&roles), "users.view"),
            Err(GateError::InsufficientPermissions)
        );
    }

    #[test]
    fn permission_gate_rejects_empty_or_absent_sets() {
        let empty = token(&["admin"], Some(&[]));
        assert_eq!(
            require_permission(&codec(), &headers_for(&empty), "users.view"),
            Err(GateError::InsufficientPermissions)
        );

        let role_only = token(&["admin"], None);
        assert_eq!(
            require_permission(&codec(), &headers_for(&role_only), "users.view"),
            Err(GateError::InsufficientPermissions)
        );
    }

    #[test]
    fn authentication_failures_propagate_through_role_gates() {
        assert_eq!(
            require_any_role(&codec(), &HeaderMap::new(), &["admin"]),
            Err(GateError::AuthenticationRequired)
        );
        assert_eq!(
            require_permission(&codec(), &headers_for("junk"), "users.view"),
            Err(GateError::InvalidOrExpired)
        );
    }

    #[test]
    fn requirement_variants_share_one_matcher() {
        let identity = Identity {
            subject: "9".into(),
            roles: ["manager".to_string()].into(),
            permissions: Some(["brands.*".to_string()].into()),
            issued_at: 0,
            expires_at: 0,
        };
        assert!(identity.satisfies(&Requirement::any_role(["manager", "admin"])));
        assert!(identity.satisfies(&Requirement::permission("brands.delete")));
        assert!(!identity.satisfies(&Requirement::permission("products.view")));
    }
}
