use axum::http::StatusCode;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::auth::gate::GateError;
use crate::response::ApiResponse;

/// Standard error type for Stockroom services and handlers.
#[derive(Debug, Error)]
pub enum StockroomError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A unique key (permission name, role name, user email) is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation errors")]
    ValidationErrors(Vec<FieldError>),

    /// A gate denied the request. Rendered exactly as the gate renders it.
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(DbErr),
}

impl StockroomError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StockroomError::NotFound(_) => StatusCode::NOT_FOUND,
            StockroomError::BadRequest(_) => StatusCode::BAD_REQUEST,
            StockroomError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StockroomError::Forbidden(_) => StatusCode::FORBIDDEN,
            StockroomError::Conflict(_) => StatusCode::CONFLICT,
            StockroomError::Validation(_) => StatusCode::BAD_REQUEST,
            StockroomError::ValidationErrors(_) => StatusCode::BAD_REQUEST,
            StockroomError::Gate(gate) => gate.status_code(),
            StockroomError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StockroomError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            StockroomError::NotFound(_) => "NOT_FOUND",
            StockroomError::BadRequest(_) => "BAD_REQUEST",
            StockroomError::Unauthorized(_) => "UNAUTHORIZED",
            StockroomError::Forbidden(_) => "FORBIDDEN",
            StockroomError::Conflict(_) => "DUPLICATE",
            StockroomError::Validation(_) => "VALIDATION_ERROR",
            StockroomError::ValidationErrors(_) => "VALIDATION_ERROR",
            StockroomError::Gate(gate) => gate.code(),
            StockroomError::Internal(_) => "INTERNAL_ERROR",
            StockroomError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// The client-facing message. Internal failures never leak their detail.
    pub fn public_message(&self) -> String {
        match self {
            StockroomError::NotFound(msg)
            | StockroomError::BadRequest(msg)
            | StockroomError::Unauthorized(msg)
            | StockroomError::Forbidden(msg)
            | StockroomError::Conflict(msg)
            | StockroomError::Validation(msg) => msg.clone(),
            StockroomError::ValidationErrors(_) => "Validation failed".to_string(),
            StockroomError::Gate(gate) => gate.message().to_string(),
            StockroomError::Internal(_) | StockroomError::Database(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Whether this error is a unique-key collision.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StockroomError::Conflict(_))
    }
}

impl From<DbErr> for StockroomError {
    fn from(err: DbErr) -> Self {
        // Two writers can both pass a service's uniqueness pre-check.
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return StockroomError::Conflict(format!("Duplicate key: {detail}"));
        }
        StockroomError::Database(err)
    }
}

impl From<validator::ValidationErrors> for StockroomError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    FieldError::with_code(field.to_string(), message, e.code.to_string())
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        StockroomError::ValidationErrors(fields)
    }
}

/// Field-level validation error.
///
/// ```json
/// {
///   "field": "email",
///   "message": "Invalid email address",
///   "code": "email"
/// }
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    /// Create a new field error with a code.
    pub fn with_code(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl axum::response::IntoResponse for StockroomError {
    fn into_response(self) -> axum::response::Response {
        if let StockroomError::Gate(gate) = self {
            return gate.into_response();
        }

        let status = self.status_code();
        match &self {
            StockroomError::Internal(_) | StockroomError::Database(_) => {
                tracing::error!(error = %self, "request failed");
            }
            _ => tracing::debug!(code = self.error_code(), error = %self, "request rejected"),
        }

        let errors = match &self {
            StockroomError::ValidationErrors(errs) => Some(errs.clone()),
            _ => None,
        };
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: Some(self.public_message()),
            data: None,
            errors,
        };

        (status, axum::Json(body)).into_response()
    }
}
