use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn,
    routing::get,
    Router,
};
use serde::Serialize;

use crate::auth::middleware::role_required_layer;
use crate::error::StockroomError;
use crate::extractors::{Pagination, ValidatedJson};
use crate::models::permission;
use crate::response::{ApiResponse, PageInfo};
use crate::services::permissions::{self as service, NewPermission, PermissionChanges, PermissionFilter};
use crate::taxonomy::ADMIN_ROLE;

use super::{parse_id, AppState};

const ADMIN_ONLY: &[&str] = &[ADMIN_ROLE];
const NOT_FOUND: &str = "Permission not found";

#[derive(Debug, Serialize)]
pub struct PermissionList {
    pub permissions: Vec<permission::Model>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct PermissionBody {
    pub permission: permission::Model,
}

/// Permission management is reserved to the `admin` role.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route_layer(from_fn(role_required_layer(ADMIN_ONLY)))
}

async fn list(
    State(state): State<AppState>,
    pagination: Pagination,
    Query(filter): Query<PermissionFilter>,
) -> Result<ApiResponse<PermissionList>, StockroomError> {
    let page = service::list(&state.db, pagination, &filter).await?;
    Ok(ApiResponse::success(PermissionList {
        permissions: page.items,
        pagination: page.pagination,
    }))
}

async fn create(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewPermission>,
) -> Result<(StatusCode, ApiResponse<PermissionBody>), StockroomError> {
    let permission = service::create(&state.db, payload).await?;
    Ok(ApiResponse::with_message("Permission created successfully", PermissionBody { permission }).created())
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<PermissionBody>, StockroomError> {
    let permission = service::get(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::success(PermissionBody { permission }))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<PermissionChanges>,
) -> Result<ApiResponse<PermissionBody>, StockroomError> {
    let permission = service::update(&state.db, parse_id(&id, NOT_FOUND)?, changes).await?;
    Ok(ApiResponse::with_message("Permission updated successfully", PermissionBody { permission }))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, StockroomError> {
    service::delete(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::message("Permission deleted successfully"))
}
