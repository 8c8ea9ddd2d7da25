//! Remote paged catalog: items, pages and the page-fetch seam.

mod cache;
#[cfg(test)]
pub(crate) mod fake;
mod youtube;

use async_trait::async_trait;

use crate::error::Result;

pub use cache::PageCache;
pub use youtube::YouTubePlaylist;

/// A catalog entry. The core only needs a stable id and a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable remote identifier, unique within the catalog.
    pub id: String,
    /// Display title.
    pub title: String,
}

impl Item {
    /// Creates a new item.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One page of a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    /// 0-based page index.
    pub index: usize,
    /// Items on this page, in listing order.
    pub items: Vec<Item>,
    /// Continuation token for the next page, absent on the last page.
    pub next_token: Option<String>,
}

impl Page {
    /// Number of items on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Source of catalog pages.
///
/// `token` is `None` for the first page and the previous page's
/// `next_token` for every later page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page at `index`.
    async fn fetch_page(&self, index: usize, token: Option<&str>) -> Result<Page>;
}
