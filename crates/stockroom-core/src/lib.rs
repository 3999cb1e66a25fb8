//! Role-based access control for the Stockroom inventory/POS backend.
//!
//! A login resolves the user's active roles into a flattened permission
//! snapshot and signs it into a bearer token. Protected routes then gate on
//! that snapshot alone, with no store query per request.

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod response;
pub mod seed;
pub mod services;
pub mod taxonomy;
pub mod testing;

pub use app::{build_router, App};
pub use auth::{GateError, Identity, Requirement, TokenCodec};
pub use config::Config;
pub use error::StockroomError;
pub use response::ApiResponse;
pub use testing::{TestApp, TestClient, TestResponse};
