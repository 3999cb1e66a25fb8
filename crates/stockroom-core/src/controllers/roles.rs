use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::{permission_required_layer, role_required_layer};
use crate::error::StockroomError;
use crate::extractors::{Pagination, ValidatedJson};
use crate::response::{ApiResponse, PageInfo};
use crate::services::roles::{self as service, NewRole, RoleChanges, RoleView};
use crate::taxonomy::{ADMIN_ROLE, ROLES_CREATE, ROLES_VIEW};

use super::{parse_id, AppState};

const ADMIN_ONLY: &[&str] = &[ADMIN_ROLE];
const NOT_FOUND: &str = "Role not found";

#[derive(Debug, Default, Deserialize)]
pub struct RoleSearch {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissions {
    pub permission_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct RoleList {
    pub roles: Vec<RoleView>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct RoleBody {
    pub role: RoleView,
}

/// Reading one role and cloning are permission-gated; everything else needs
/// the `admin` role.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create).route_layer(from_fn(role_required_layer(ADMIN_ONLY))))
        .route(
            "/{id}",
            get(show)
                .route_layer(from_fn(permission_required_layer(ROLES_VIEW)))
                .merge(put(update).delete(remove).route_layer(from_fn(role_required_layer(ADMIN_ONLY)))),
        )
        .route(
            "/{id}/permissions",
            put(assign_permissions).route_layer(from_fn(role_required_layer(ADMIN_ONLY))),
        )
        .route(
            "/{id}/clone",
            post(clone_role).route_layer(from_fn(permission_required_layer(ROLES_CREATE))),
        )
}

async fn list(
    State(state): State<AppState>,
    pagination: Pagination,
    Query(query): Query<RoleSearch>,
) -> Result<ApiResponse<RoleList>, StockroomError> {
    let page = service::list(&state.db, pagination, query.search.as_deref()).await?;
    Ok(ApiResponse::success(RoleList {
        roles: page.items,
        pagination: page.pagination,
    }))
}

async fn create(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewRole>,
) -> Result<(StatusCode, ApiResponse<RoleBody>), StockroomError> {
    let role = service::create(&state.db, payload).await?;
    Ok(ApiResponse::with_message("Role created successfully", RoleBody { role }).created())
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RoleBody>, StockroomError> {
    let role = service::get(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::success(RoleBody { role }))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<RoleChanges>,
) -> Result<ApiResponse<RoleBody>, StockroomError> {
    let role = service::update(&state.db, parse_id(&id, NOT_FOUND)?, changes).await?;
    Ok(ApiResponse::with_message("Role updated successfully", RoleBody { role }))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, StockroomError> {
    service::delete(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::message("Role deleted successfully"))
}

async fn assign_permissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AssignPermissions>,
) -> Result<ApiResponse<RoleBody>, StockroomError> {
    let role =
        service::assign_permissions(&state.db, parse_id(&id, NOT_FOUND)?, &payload.permission_ids)
            .await?;
    Ok(ApiResponse::with_message(
        "Permissions assigned to role successfully",
        RoleBody { role },
    ))
}

async fn clone_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, ApiResponse<RoleBody>), StockroomError> {
    let role = service::clone(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::with_message("Role cloned successfully", RoleBody { role }).created())
}
