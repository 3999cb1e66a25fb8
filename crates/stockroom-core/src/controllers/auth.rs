use axum::{extract::State, http::StatusCode, routing::post, Router};
use serde::Serialize;

use crate::error::StockroomError;
use crate::extractors::ValidatedJson;
use crate::response::ApiResponse;
use crate::services::auth::{self as auth_service, LoginRequest, RegisterRequest, SessionUser};
use crate::services::users::UserView;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserView,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, StockroomError> {
    let outcome = auth_service::login(&state.db, &state.codec, &payload).await?;
    Ok(ApiResponse::with_message(
        "Login successful",
        LoginResponse {
            token: outcome.token,
            user: outcome.user,
        },
    ))
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, ApiResponse<RegisterResponse>), StockroomError> {
    let user = auth_service::register(&state.db, payload).await?;
    Ok(ApiResponse::with_message("User registered successfully", RegisterResponse { user }).created())
}

/// Tokens are stateless; the client simply drops its copy.
async fn logout() -> ApiResponse<()> {
    ApiResponse::message("Logout successful")
}
