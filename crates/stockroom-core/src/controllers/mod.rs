use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::error::StockroomError;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt_secret));
        AppState {
            db,
            config: Arc::new(config),
            codec,
        }
    }
}

pub mod auth;
pub mod permissions;
pub mod probe;
pub mod roles;
pub mod users;

/// Parse a path id. Anything that is not an id cannot name a record.
pub(crate) fn parse_id(raw: &str, not_found: &str) -> Result<i32, StockroomError> {
    raw.trim()
        .parse()
        .map_err(|_| StockroomError::NotFound(not_found.to_string()))
}
