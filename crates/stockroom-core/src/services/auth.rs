use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::claims::{resolve_effective_access, EffectiveAccess};
use crate::auth::password::verify_password;
use crate::auth::token::TokenCodec;
use crate::error::StockroomError;

use super::not_blank;
use super::users::{self, normalize_email, NewUser, UserView};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// The user summary returned next to a fresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: SessionUser,
    #[serde(skip)]
    pub access: EffectiveAccess,
}

fn invalid_credentials() -> StockroomError {
    StockroomError::Unauthorized("Invalid credentials".to_string())
}

/// Check credentials and issue a token carrying the user's current access.
///
/// The active flag is checked before the password.
pub async fn login(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    request: &LoginRequest,
) -> Result<LoginOutcome, StockroomError> {
    let email = normalize_email(&request.email);
    let user = users::find_by_email(db, &email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        tracing::info!(user_id = user.id, "login refused for deactivated account");
        return Err(StockroomError::Unauthorized(
            "Account is deactivated".to_string(),
        ));
    }

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "login refused: bad password");
        return Err(invalid_credentials());
    }

    let access = resolve_effective_access(db, user.id).await?;
    let token = codec.issue(
        &user.id.to_string(),
        access.role_names(),
        Some(access.permission_names()),
    )?;

    tracing::info!(
        user_id = user.id,
        roles = access.role_names.len(),
        permissions = access.permission_names.len(),
        "login successful"
    );

    Ok(LoginOutcome {
        token,
        user: SessionUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role_names: access.role_names(),
        },
        access,
    })
}

/// Self-service sign-up. The new account has no roles.
pub async fn register(
    db: &DatabaseConnection,
    request: RegisterRequest,
) -> Result<UserView, StockroomError> {
    users::create(
        db,
        NewUser {
            name: request.name,
            email: request.email,
            password: request.password,
            roles: Vec::new(),
        },
    )
    .await
}
