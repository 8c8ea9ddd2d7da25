//! Memoizing page store keyed by page index.

use std::collections::HashMap;

use super::{Item, Page, PageFetcher};
use crate::error::Result;

/// Lazily fetched pages plus the continuation tokens needed to reach more.
///
/// Pages are never evicted or re-fetched: once stored, a page's items and
/// next-token stay fixed for the lifetime of the cache.
#[derive(Debug)]
pub struct PageCache {
    page_size: usize,
    pages: HashMap<usize, Page>,
    /// Token needed to request each reachable page. Page 0 maps to `None`,
    /// the implicit start token.
    tokens: HashMap<usize, Option<String>>,
    has_more: bool,
}

impl PageCache {
    /// Creates an empty cache for pages of at most `page_size` items.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: HashMap::new(),
            tokens: HashMap::from([(0, None)]),
            has_more: true,
        }
    }

    /// Returns the items of page `index`, fetching the page on first access.
    ///
    /// A page whose continuation token is not known yet (because the
    /// preceding page has not been fetched, or was the last page) is empty
    /// and triggers no fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error. Nothing is cached in that case, so a
    /// later call retries the same page.
    pub async fn get<F>(&mut self, index: usize, fetcher: &F) -> Result<&[Item]>
    where
        F: PageFetcher + ?Sized,
    {
        if !self.pages.contains_key(&index) {
            let Some(token) = self.tokens.get(&index).cloned() else {
                return Ok(&[]);
            };
            let mut page = fetcher.fetch_page(index, token.as_deref()).await?;
            self.store(index, &mut page);
            self.pages.insert(index, page);
        }
        Ok(self.pages.get(&index).map_or(&[][..], |p| p.items.as_slice()))
    }

    fn store(&mut self, index: usize, page: &mut Page) {
        page.index = index;
        if page.items.len() > self.page_size {
            log::warn!(
                "Page {index} returned {} items, keeping the first {}",
                page.items.len(),
                self.page_size
            );
            page.items.truncate(self.page_size);
        }
        match &page.next_token {
            Some(token) => {
                self.tokens.insert(index + 1, Some(token.clone()));
            }
            None => self.has_more = false,
        }
    }

    /// Returns a cached page without fetching.
    #[must_use]
    pub fn peek(&self, index: usize) -> Option<&Page> {
        self.pages.get(&index)
    }

    /// Number of items on a cached page; 0 for pages not fetched.
    #[must_use]
    pub fn page_len(&self, index: usize) -> usize {
        self.peek(index).map_or(0, Page::len)
    }

    /// Returns false once a page without a next-token has been fetched.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Maximum number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;
    use crate::error::Error;

    #[tokio::test]
    async fn first_page_uses_start_token() {
        let catalog = FakeCatalog::new(45, 20);
        let mut cache = PageCache::new(20);

        let items = cache.get(0, &catalog).await.unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(items[0], FakeCatalog::item(0));
        assert_eq!(catalog.calls.lock().unwrap()[0], (0, None));
        assert!(cache.has_more());
    }

    #[tokio::test]
    async fn cached_pages_are_not_refetched() {
        let catalog = FakeCatalog::new(45, 20);
        let mut cache = PageCache::new(20);

        cache.get(0, &catalog).await.unwrap();
        cache.get(0, &catalog).await.unwrap();
        assert_eq!(catalog.call_count(), 1);
        assert!(cache.peek(0).is_some());
    }

    #[tokio::test]
    async fn next_page_uses_recorded_token() {
        let catalog = FakeCatalog::new(45, 20);
        let mut cache = PageCache::new(20);

        cache.get(0, &catalog).await.unwrap();
        let items = cache.get(1, &catalog).await.unwrap();
        assert_eq!(items[0], FakeCatalog::item(20));
        assert_eq!(
            catalog.calls.lock().unwrap()[1],
            (1, Some("t1".to_string()))
        );
    }

    #[tokio::test]
    async fn unknown_token_yields_empty_page_without_fetch() {
        let catalog = FakeCatalog::new(45, 20);
        let mut cache = PageCache::new(20);

        cache.get(0, &catalog).await.unwrap();
        assert!(cache.get(5, &catalog).await.unwrap().is_empty());
        assert_eq!(catalog.call_count(), 1);
        assert!(cache.peek(5).is_none());
    }

    #[tokio::test]
    async fn last_page_clears_has_more() {
        let catalog = FakeCatalog::new(25, 20);
        let mut cache = PageCache::new(20);

        cache.get(0, &catalog).await.unwrap();
        assert!(cache.has_more());
        assert_eq!(cache.get(1, &catalog).await.unwrap().len(), 5);
        assert!(!cache.has_more());

        assert!(cache.get(2, &catalog).await.unwrap().is_empty());
        assert_eq!(catalog.call_count(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let catalog = FakeCatalog::new(45, 20).failing_on(1);
        let mut cache = PageCache::new(20);

        cache.get(0, &catalog).await.unwrap();
        assert!(matches!(
            cache.get(1, &catalog).await,
            Err(Error::Catalog(_))
        ));
        assert!(cache.peek(1).is_none());
        assert!(cache.has_more());
    }

    #[tokio::test]
    async fn oversized_pages_are_truncated() {
        let catalog = FakeCatalog::new(45, 20);
        let mut cache = PageCache::new(7);

        assert_eq!(cache.get(0, &catalog).await.unwrap().len(), 7);
        assert_eq!(cache.page_len(0), 7);
        assert_eq!(cache.page_len(1), 0);
    }
}
