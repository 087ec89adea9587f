//! In-memory pagination over an already-fetched sequence.

use serde::Serialize;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Slices a backing sequence into fixed-size pages.
///
/// Page indexes are zero-based. Requesting a page past the end yields an
/// empty slice rather than an error.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    data: Vec<T>,
    page_size: usize,
    current_page: usize,
}

/// Paging metadata for one served page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub item_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Paginator<T> {
    /// Create an empty paginator. A `page_size` of 0 is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            data: Vec::new(),
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    /// Replace the backing sequence. The current page index is kept.
    pub fn set_data(&mut self, data: Vec<T>) {
        self.data = data;
    }

    /// Items of page `index`, and make it the current page.
    pub fn page(&mut self, index: usize) -> &[T] {
        self.current_page = index;
        let start = index.saturating_mul(self.page_size).min(self.data.len());
        let end = start.saturating_add(self.page_size).min(self.data.len());
        &self.data[start..end]
    }

    /// `ceil(item_count / page_size)`.
    pub fn total_pages(&self) -> usize {
        self.data.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn item_count(&self) -> usize {
        self.data.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 0
    }

    /// Metadata describing the current page.
    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.current_page,
            page_size: self.page_size,
            total_pages: self.total_pages(),
            item_count: self.item_count(),
            has_next: self.has_next_page(),
            has_previous: self.has_previous_page(),
        }
    }
}

impl<T> Default for Paginator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_index_does_not_overflow() {
        let mut p = Paginator::new(10);
        p.set_data(vec![1, 2, 3]);
        assert!(p.page(usize::MAX).is_empty());
        assert!(!p.has_next_page());
    }

    #[test]
    fn empty_data_has_no_pages() {
        let p: Paginator<u8> = Paginator::default();
        assert_eq!(p.total_pages(), 0);
        assert!(!p.has_next_page());
        assert!(!p.has_previous_page());
    }
}
