//! Shared value types for queries.

mod pagination;
mod sanitize;

pub use pagination::{MAX_LIMIT, OffsetPagination};
pub use sanitize::sanitize_text;
