//! Selector session state and its pure transition function.

use std::collections::BTreeSet;

use crate::catalog::{Item, PageCache};

/// Global position of an item across all pages: `page * page_size + offset`.
///
/// For a fixed `page_size` and `offset < page_size`, [`VirtualIndex::new`]
/// and [`VirtualIndex::position`] are inverses of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualIndex(usize);

impl VirtualIndex {
    /// Index of the item at `offset` on page `page`.
    #[must_use]
    pub const fn new(page: usize, offset: usize, page_size: usize) -> Self {
        Self(page * page_size + offset)
    }

    /// Splits the index back into `(page, offset)`.
    ///
    /// `page_size` must be at least 1.
    #[must_use]
    pub const fn position(self, page_size: usize) -> (usize, usize) {
        (self.0 / page_size, self.0 % page_size)
    }
}

impl From<usize> for VirtualIndex {
    fn from(raw: usize) -> Self {
        Self(raw)
    }
}

/// Selected virtual indices. Iteration is in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(BTreeSet<VirtualIndex>);

impl SelectionSet {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `index`. Returns true if it is now selected.
    pub fn toggle(&mut self, index: VirtualIndex) -> bool {
        if self.0.remove(&index) {
            false
        } else {
            self.0.insert(index);
            true
        }
    }

    /// Returns true if `index` is selected.
    #[must_use]
    pub fn contains(&self, index: VirtualIndex) -> bool {
        self.0.contains(&index)
    }

    /// Number of selected items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selected indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = VirtualIndex> + '_ {
        self.0.iter().copied()
    }
}

/// Operator navigation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    PageLeft,
    PageRight,
    Toggle,
    Confirm,
    Cancel,
}

/// Lifecycle of a selector session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Browsing,
    Confirmed,
    Cancelled,
}

/// Everything a renderer needs to draw the current page.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    /// 0-based index of the page on screen.
    pub page_index: usize,
    /// Items on the page.
    pub items: &'a [Item],
    /// Cursor offset within the page.
    pub cursor: usize,
    /// Whether more pages may follow.
    pub has_more: bool,
    /// Total number of selected items across all pages.
    pub selected_total: usize,
    /// Transient message for the operator, if any.
    pub status: Option<&'a str>,
    selection: &'a SelectionSet,
    page_size: usize,
}

impl PageView<'_> {
    /// Returns true if the item at `offset` on this page is selected.
    #[must_use]
    pub fn is_selected(&self, offset: usize) -> bool {
        self.selection
            .contains(VirtualIndex::new(self.page_index, offset, self.page_size))
    }
}

/// State of one interactive selection session.
///
/// Only [`SessionState::apply`] changes navigation or selection; loading
/// pages into the cache is left to the caller.
#[derive(Debug)]
pub struct SessionState {
    current_page: usize,
    cursor: usize,
    selection: SelectionSet,
    cache: PageCache,
    phase: Phase,
}

impl SessionState {
    /// Starts browsing at page 0 with an empty cache.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self::with_cache(PageCache::new(page_size))
    }

    /// Starts browsing at page 0 over an existing cache.
    #[must_use]
    pub fn with_cache(cache: PageCache) -> Self {
        Self {
            current_page: 0,
            cursor: 0,
            selection: SelectionSet::new(),
            cache,
            phase: Phase::Browsing,
        }
    }

    /// Applies one command. Out-of-range navigation is a no-op.
    ///
    /// `PageRight` only advances onto a page that is already cached and
    /// non-empty.
    #[must_use]
    pub fn apply(mut self, command: Command) -> Self {
        if self.phase != Phase::Browsing {
            return self;
        }

        let len = self.cache.page_len(self.current_page);
        match command {
            Command::Up => self.cursor = self.cursor.saturating_sub(1),
            Command::Down => {
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            Command::Toggle => {
                if len > 0 {
                    let index =
                        VirtualIndex::new(self.current_page, self.cursor, self.page_size());
                    self.selection.toggle(index);
                }
            }
            Command::PageLeft => {
                if self.current_page > 0 {
                    self.current_page -= 1;
                    self.cursor = 0;
                }
            }
            Command::PageRight => {
                if self.cache.page_len(self.current_page + 1) > 0 {
                    self.current_page += 1;
                    self.cursor = 0;
                }
            }
            Command::Confirm => self.phase = Phase::Confirmed,
            Command::Cancel => self.phase = Phase::Cancelled,
        }
        self
    }

    /// Selected items in ascending virtual-index order.
    #[must_use]
    pub fn resolve(&self) -> Vec<Item> {
        let page_size = self.page_size();
        self.selection
            .iter()
            .filter_map(|index| {
                let (page, offset) = index.position(page_size);
                self.cache.peek(page)?.items.get(offset).cloned()
            })
            .collect()
    }

    /// Builds the render model for the current page.
    #[must_use]
    pub fn view<'a>(&'a self, status: Option<&'a str>) -> PageView<'a> {
        PageView {
            page_index: self.current_page,
            items: self
                .cache
                .peek(self.current_page)
                .map_or(&[][..], |p| p.items.as_slice()),
            cursor: self.cursor,
            has_more: self.cache.has_more(),
            selected_total: self.selection.len(),
            status,
            selection: &self.selection,
            page_size: self.page_size(),
        }
    }

    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.cache.has_more()
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.cache.page_size()
    }

    /// Page cache, for loading pages before rendering or paging right.
    pub const fn cache_mut(&mut self) -> &mut PageCache {
        &mut self.cache
    }
}
