//! Gate middleware for route-level access control.
//!
//! Each layer runs a gate and, on success, stores the [`Identity`] in the
//! request extensions for the handler (or the `Authenticated` extractor) to
//! pick up.
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware::from_fn;
//! use stockroom_core::auth::middleware::{login_required_layer, permission_required_layer};
//!
//! Router::new()
//!     .route("/profile", get(profile))
//!     .route_layer(from_fn(login_required_layer))
//!     .route("/users", get(list_users))
//!     .route_layer(from_fn(permission_required_layer("users.view")))
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::gate::{self, Identity, Requirement};
use crate::auth::token::TokenCodec;
use crate::error::StockroomError;

type LayerFuture = Pin<Box<dyn Future<Output = Result<Response, StockroomError>> + Send>>;

fn codec_from(req: &Request) -> Result<Arc<TokenCodec>, StockroomError> {
    req.extensions()
        .get::<Arc<TokenCodec>>()
        .cloned()
        .ok_or_else(|| StockroomError::Internal("Token codec not found in request".to_string()))
}

async fn run_gate(
    mut req: Request,
    next: Next,
    requirement: Option<Requirement>,
) -> Result<Response, StockroomError> {
    let codec = codec_from(&req)?;
    let identity: Identity = match &requirement {
        Some(requirement) => gate::authorize(&codec, req.headers(), requirement)?,
        None => gate::authenticate(&codec, req.headers())?,
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Require a valid bearer token.
pub async fn login_required_layer(req: Request, next: Next) -> Result<Response, StockroomError> {
    run_gate(req, next, None).await
}

/// Require any one of `roles`.
///
/// Returns a closure suitable for use with `axum::middleware::from_fn`.
pub fn role_required_layer(
    roles: &'static [&'static str],
) -> impl Fn(Request, Next) -> LayerFuture + Clone + Send {
    move |req: Request, next: Next| {
        Box::pin(run_gate(
            req,
            next,
            Some(Requirement::any_role(roles.iter().copied())),
        ))
    }
}

/// Require a single permission (exact or via `feature.*`).
///
/// Returns a closure suitable for use with `axum::middleware::from_fn`.
pub fn permission_required_layer(
    permission: &'static str,
) -> impl Fn(Request, Next) -> LayerFuture + Clone + Send {
    move |req: Request, next: Next| {
        Box::pin(run_gate(req, next, Some(Requirement::permission(permission))))
    }
}
