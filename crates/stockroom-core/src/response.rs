use axum::http::StatusCode;
use serde::Serialize;

use crate::error::FieldError;

/// Standard API response wrapper.
///
/// The payload is flattened next to the `success` flag, which is the shape
/// the POS front-end consumes:
/// ```json
/// { "success": true, "message": "Login successful", "token": "...", "user": { ... } }
/// { "success": false, "message": "Insufficient permissions" }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    /// Create a successful response with data and a human-readable message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    /// Pair this response with `201 Created`.
    pub fn created(self) -> (StatusCode, Self) {
        (StatusCode::CREATED, self)
    }
}

impl ApiResponse<()> {
    /// A successful response that carries only a message.
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, axum::Json(self)).into_response()
    }
}

/// Page metadata returned alongside list endpoints.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl PageInfo {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        PageInfo {
            page,
            limit,
            total,
            pages,
        }
    }
}
