use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::permission_required_layer;
use crate::error::StockroomError;
use crate::extractors::{Pagination, ValidatedJson};
use crate::response::{ApiResponse, PageInfo};
use crate::services::users::{self as service, NewUser, UserChanges, UserFilter, UserView};
use crate::taxonomy::{USERS_ASSIGN_ROLES, USERS_CREATE, USERS_DELETE, USERS_UPDATE, USERS_VIEW};

use super::{parse_id, AppState};

const NOT_FOUND: &str = "User not found";

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRoles {
    pub roles: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserView>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: UserView,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list)
                .route_layer(from_fn(permission_required_layer(USERS_VIEW)))
                .merge(post(create).route_layer(from_fn(permission_required_layer(USERS_CREATE)))),
        )
        .route(
            "/{id}",
            get(show)
                .route_layer(from_fn(permission_required_layer(USERS_VIEW)))
                .merge(put(update).route_layer(from_fn(permission_required_layer(USERS_UPDATE))))
                .merge(delete(deactivate).route_layer(from_fn(permission_required_layer(USERS_DELETE)))),
        )
        .route(
            "/{id}/activate",
            post(activate).route_layer(from_fn(permission_required_layer(USERS_UPDATE))),
        )
        .route(
            "/{id}/roles",
            post(assign_roles).route_layer(from_fn(permission_required_layer(USERS_ASSIGN_ROLES))),
        )
}

async fn list(
    State(state): State<AppState>,
    pagination: Pagination,
    Query(filter): Query<UserFilter>,
) -> Result<ApiResponse<UserList>, StockroomError> {
    let page = service::list(&state.db, pagination, &filter).await?;
    Ok(ApiResponse::success(UserList {
        users: page.items,
        pagination: page.pagination,
    }))
}

async fn create(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewUser>,
) -> Result<(StatusCode, ApiResponse<UserBody>), StockroomError> {
    let user = service::create(&state.db, payload).await?;
    Ok(ApiResponse::with_message("User created successfully", UserBody { user }).created())
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserBody>, StockroomError> {
    let user = service::get(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::success(UserBody { user }))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UserChanges>,
) -> Result<ApiResponse<UserBody>, StockroomError> {
    let user = service::update(&state.db, parse_id(&id, NOT_FOUND)?, changes).await?;
    Ok(ApiResponse::with_message("User updated successfully", UserBody { user }))
}

async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, StockroomError> {
    service::deactivate(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::message("User deactivated successfully"))
}

async fn activate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserBody>, StockroomError> {
    let user = service::activate(&state.db, parse_id(&id, NOT_FOUND)?).await?;
    Ok(ApiResponse::with_message("User activated successfully", UserBody { user }))
}

async fn assign_roles(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AssignRoles>,
) -> Result<ApiResponse<UserBody>, StockroomError> {
    let user = service::assign_roles(&state.db, parse_id(&id, NOT_FOUND)?, &payload.roles).await?;
    Ok(ApiResponse::with_message("Roles assigned to user successfully", UserBody { user }))
}
