//! Offset pagination envelope shared by listing operations.

use serde::{Deserialize, Serialize};

/// One page of a finite, restartable listing.
///
/// Pages are 1-based; a `page` below 1 is treated as 1, a `size` of 0 yields
/// an empty page with totals intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: usize,
    pub size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Cut one page out of an already-ordered full result set.
    pub fn from_slice(all: &[T], page: usize, size: usize) -> Self
    where
        T: Clone,
    {
        let page = page.max(1);
        let total_items = all.len();
        let total_pages = if size == 0 {
            0
        } else {
            total_items.div_ceil(size)
        };
        let start = (page - 1).saturating_mul(size).min(total_items);
        let end = start.saturating_add(size).min(total_items);

        Self {
            page,
            size,
            total_items,
            total_pages,
            has_next: end < total_items,
            has_prev: page > 1 && total_items > 0,
            items: all[start..end].to_vec(),
        }
    }

    /// Empty page (used when the subject wallet has no history yet).
    pub fn empty(page: usize, size: usize) -> Self {
        Self {
            page: page.max(1),
            size,
            total_items: 0,
            total_pages: 0,
            has_next: false,
            has_prev: false,
            items: Vec::new(),
        }
    }
}
