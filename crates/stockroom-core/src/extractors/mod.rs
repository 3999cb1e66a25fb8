pub mod authenticated;
pub mod json;
pub mod pagination;

pub use authenticated::Authenticated;
pub use json::{Json, ValidatedJson};
pub use pagination::Pagination;
