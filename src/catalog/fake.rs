//! In-memory catalog used by tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{Item, Page, PageFetcher};
use crate::error::{Error, Result};

/// Serves `total` generated items in pages of `page_size`.
pub struct FakeCatalog {
    total: usize,
    page_size: usize,
    fail_on: Option<usize>,
    /// Every `(index, token)` pair requested, in order.
    pub calls: Mutex<Vec<(usize, Option<String>)>>,
}

impl FakeCatalog {
    pub fn new(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes fetches of page `index` fail.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn item(n: usize) -> Item {
        Item::new(format!("vid{n}"), format!("Video {n}"))
    }
}

#[async_trait]
impl PageFetcher for FakeCatalog {
    async fn fetch_page(&self, index: usize, token: Option<&str>) -> Result<Page> {
        self.calls
            .lock()
            .unwrap()
            .push((index, token.map(str::to_string)));

        if self.fail_on == Some(index) {
            return Err(Error::Catalog(format!("page {index} unavailable")));
        }

        let start = index * self.page_size;
        let end = (start + self.page_size).min(self.total);
        let items = (start..end).map(Self::item).collect();
        let next_token = (end < self.total).then(|| format!("t{}", index + 1));

        Ok(Page {
            index,
            items,
            next_token,
        })
    }
}
