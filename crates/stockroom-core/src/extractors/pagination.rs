use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
/// Largest page whose row offset still fits a signed 64-bit SQL `OFFSET`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT;

/// Page-based pagination query parameters.
///
/// `?page=2&limit=25`. Missing or unparsable values fall back to page 1 and
/// limit 10; limit is clamped to 1..=100 and page to 1..=[`MAX_PAGE`].
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,

    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Self {
        Pagination { page, limit }.clamped()
    }

    pub fn clamped(&self) -> Self {
        Pagination {
            page: self.page.clamp(1, MAX_PAGE),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Zero-based page index, as sea-orm's paginator expects.
    pub fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = crate::error::StockroomError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or("");
        let pagination: Pagination = serde_urlencoded::from_str(query).unwrap_or_default();
        Ok(pagination.clamped())
    }
}
