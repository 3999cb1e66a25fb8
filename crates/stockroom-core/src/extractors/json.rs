use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::StockroomError;

/// Largest JSON body any endpoint accepts.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// JSON body extractor whose rejections use the standard error envelope.
///
/// ```rust,ignore
/// async fn create(Json(payload): Json<CreateRole>) -> impl IntoResponse { ... }
/// ```
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = StockroomError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| StockroomError::BadRequest(format!("Failed to read body: {e}")))?;

        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| StockroomError::Validation(format!("Invalid JSON: {e}")))?;

        Ok(Json(value))
    }
}

/// [`Json`] followed by `validator` checks.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = StockroomError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
