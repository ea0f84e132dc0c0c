use serde::Serialize;

use super::Product;

/// One page of the product listing plus navigation flags.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total_count: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl ProductPage {
    pub fn has_next_page(&self) -> bool {
        self.page_size.saturating_mul(self.current_page) < self.total_count
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// Saturates at `u64::MAX`; check [`Self::has_next_page`] first.
    pub fn next_page(&self) -> u64 {
        self.current_page.saturating_add(1)
    }

    pub fn previous_page(&self) -> u64 {
        self.current_page.saturating_sub(1)
    }

    /// Number of the last page; 1 for an empty catalog.
    pub fn last_page(&self) -> u64 {
        self.total_count.div_ceil(self.page_size).max(1)
    }
}
