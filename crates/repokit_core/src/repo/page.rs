//! Paginated read result.

use serde::Serialize;

/// One page of entities plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<E> {
    pub items: Vec<E>,
    /// Matching rows across all pages.
    pub total: u64,
    pub per_page: u32,
    /// 1-based page number.
    pub current_page: u32,
    /// Number of pages; at least 1 even when `total == 0`.
    pub last_page: u32,
}

impl<E> Page<E> {
    pub fn new(items: Vec<E>, total: u64, per_page: u32, current_page: u32) -> Self {
        let pages = total.div_ceil(u64::from(per_page.max(1))).max(1);
        Self {
            items,
            total,
            per_page,
            current_page,
            last_page: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn last_page_rounds_up_and_never_drops_below_one() {
        assert_eq!(Page::<()>::new(Vec::new(), 31, 15, 1).last_page, 3);
        assert_eq!(Page::<()>::new(Vec::new(), 30, 15, 2).last_page, 2);
        assert_eq!(Page::<()>::new(Vec::new(), 0, 15, 1).last_page, 1);
        assert!(Page::<()>::new(Vec::new(), 16, 15, 1).has_more_pages());
    }
}
