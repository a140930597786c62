//! Page-Number Pagination
//!
//! Page/limit pagination with total-count metadata. No cursor, no snapshot:
//! each page reflects the store at call time, so rows inserted between page
//! fetches can shift later pages. Callers are expected to tolerate that.

use serde::{Deserialize, Serialize};

/// Requested page and page size; both are clamped to sane minimums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Offset of the first item on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Metadata describing one page out of a counted result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn new(pagination: Pagination, total: u64) -> Self {
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            has_next: pagination.offset() + u64::from(pagination.limit) < total,
            has_prev: pagination.page > 1,
        }
    }
}

/// One page of items plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_math() {
        assert_eq!(Pagination::new(1, 50).offset(), 0);
        assert_eq!(Pagination::new(3, 25).offset(), 50);
        // page and limit are clamped, never zero
        assert_eq!(Pagination::new(0, 0).offset(), 0);
    }

    #[test]
    fn test_meta_flags() {
        let meta = PageMeta::new(Pagination::new(1, 10), 25);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        let meta = PageMeta::new(Pagination::new(3, 10), 25);
        assert!(!meta.has_next);
        assert!(meta.has_prev);

        let meta = PageMeta::new(Pagination::new(1, 10), 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_exact_boundary_has_no_next() {
        let meta = PageMeta::new(Pagination::new(2, 10), 20);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }
}
