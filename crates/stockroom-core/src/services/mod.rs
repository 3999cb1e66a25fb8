//! Store operations for permissions, roles and users, plus login.
//!
//! Uniqueness is checked before every write; a unique-index violation that
//! slips past the check (two concurrent writers) maps to the same
//! `Conflict` through `From<DbErr>`.

pub mod auth;
pub mod permissions;
pub mod roles;
pub mod users;

use std::borrow::Cow;

use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::ColumnTrait;
use serde::Serialize;
use validator::ValidationError;

use crate::error::{FieldError, StockroomError};
use crate::response::PageInfo;

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Case-insensitive substring match on `column`.
pub(crate) fn icontains<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", term.trim().to_lowercase()))
}

/// Treat blank query parameters as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

const BLANK_NAME: &str = "Name must not be blank";

/// `validator` hook: a name made only of whitespace counts as missing.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed(BLANK_NAME)));
    }
    Ok(())
}

/// Trim a role or user name, refusing one that ends up empty.
pub(crate) fn trimmed_name(raw: &str) -> Result<String, StockroomError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StockroomError::ValidationErrors(vec![FieldError::with_code(
            "name", BLANK_NAME, "blank",
        )]));
    }
    Ok(name.to_string())
}
