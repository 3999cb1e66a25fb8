use axum::{middleware::from_fn, routing::get, Router};
use serde::Serialize;

use crate::auth::middleware::{login_required_layer, role_required_layer};
use crate::extractors::Authenticated;
use crate::response::ApiResponse;
use crate::taxonomy::ADMIN_ROLE;

use super::AppState;

const ADMIN_ONLY: &[&str] = &[ADMIN_ROLE];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerSummary {
    pub id: String,
    pub role_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub user: CallerSummary,
}

/// Endpoints that exist only to exercise the gates.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/protected",
            get(protected).route_layer(from_fn(login_required_layer)),
        )
        .route(
            "/admin-only",
            get(admin_only).route_layer(from_fn(role_required_layer(ADMIN_ONLY))),
        )
}

fn summary(identity: crate::auth::Identity) -> CallerSummary {
    CallerSummary {
        id: identity.subject,
        role_names: identity.roles.into_iter().collect(),
        permissions: identity.permissions.map(|p| p.into_iter().collect()),
    }
}

async fn protected(Authenticated(identity): Authenticated) -> ApiResponse<ProbeResponse> {
    ApiResponse::with_message(
        "Authenticated request successful",
        ProbeResponse {
            user: summary(identity),
        },
    )
}

async fn admin_only(Authenticated(identity): Authenticated) -> ApiResponse<ProbeResponse> {
    ApiResponse::with_message(
        "Admin-only request successful",
        ProbeResponse {
            user: summary(identity),
        },
    )
}
