use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::gate::{self, Identity};
use crate::auth::token::TokenCodec;
use crate::error::StockroomError;

/// Extractor that yields the caller's verified [`Identity`].
///
/// Reuses the identity a gate layer already stored in the extensions, and
/// otherwise authenticates the bearer token itself.
///
/// ```rust,ignore
/// async fn me(Authenticated(identity): Authenticated) -> impl IntoResponse {
///     identity.subject
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = StockroomError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Authenticated(identity.clone()));
        }

        let codec = parts
            .extensions
            .get::<Arc<TokenCodec>>()
            .ok_or_else(|| StockroomError::Internal("Token codec not found in request".to_string()))?;

        let identity = gate::authenticate(codec, &parts.headers)?;
        Ok(Authenticated(identity))
    }
}
