//! Paged search requests and results.

use serde::{Deserialize, Serialize};

/// Default page size used by every search screen.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page size used when a full list is needed (e.g. pickers).
pub const LIST_ALL_SIZE: u32 = 1000;

/// Search request body: resource-specific `filtros` plus paging fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter<F> {
    #[serde(rename = "filtros")]
    pub filters: F,
    #[serde(rename = "ordenacao")]
    pub order_by: String,
    #[serde(rename = "limite")]
    pub limit: u32,
    pub offset: u32,
    pub page: u32,
    pub size: u32,
}

impl<F: Default> SearchFilter<F> {
    /// First page with empty filters, ordered by `order_by`.
    pub fn new(order_by: impl Into<String>) -> Self {
        Self {
            filters: F::default(),
            order_by: order_by.into(),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Unfiltered request for everything (up to [`LIST_ALL_SIZE`]).
    pub fn list_all(order_by: impl Into<String>) -> Self {
        Self {
            limit: LIST_ALL_SIZE,
            size: LIST_ALL_SIZE,
            ..Self::new(order_by)
        }
    }
}

impl<F> SearchFilter<F> {
    /// Moves to `page`, keeping `offset` consistent with the page size.
    pub fn set_page(&mut self, page: u32) {
        self.page = page;
        self.offset = page.saturating_mul(self.size);
    }

    /// Changes the page size; `limite` mirrors `size` on the wire.
    pub fn set_size(&mut self, size: u32) {
        self.size = size;
        self.limit = size;
        self.offset = self.page.saturating_mul(size);
    }
}

/// One page of search results.
///
/// The user search endpoint omits `first`/`last`/`numberOfElements`, so
/// those are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_elements: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<bool>,
}

impl<T> Page<T> {
    /// Whether this is the final page, derived from the page counters when
    /// the server does not say.
    pub fn is_last(&self) -> bool {
        self.last
            .unwrap_or_else(|| self.number.saturating_add(1) >= self.total_pages)
    }
}
