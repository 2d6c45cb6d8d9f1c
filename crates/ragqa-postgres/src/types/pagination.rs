//! Offset-based pagination for database queries.

use serde::{Deserialize, Serialize};

/// Maximum number of items per page.
pub const MAX_LIMIT: i64 = 1000;

/// Offset-based pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    /// Maximum number of records to return.
    pub limit: i64,
    /// Number of records to skip.
    pub offset: i64,
}

impl OffsetPagination {
    /// Creates a new pagination instance, clamping out-of-range values.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.max(0),
        }
    }

    /// Creates pagination from a 1-based page number and a page size.
    pub fn from_page(page: i64, page_size: i64) -> Self {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_LIMIT);
        Self {
            limit: page_size,
            offset: (page - 1) * page_size,
        }
    }

    /// Returns the pagination for the page after this one.
    pub fn next_page(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }

    /// Gets the current page number (1-based).
    pub fn page_number(&self) -> i64 {
        (self.offset / self.limit) + 1
    }
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_page() {
        let p = OffsetPagination::from_page(3, 20);
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 40);
        assert_eq!(p.page_number(), 3);

        let clamped = OffsetPagination::from_page(0, 5000);
        assert_eq!(clamped.offset, 0);
        assert_eq!(clamped.limit, MAX_LIMIT);
    }

    #[test]
    fn test_next_page() {
        let p = OffsetPagination::default().next_page();
        assert_eq!(p.offset, 50);
        assert_eq!(p.page_number(), 2);
    }
}
