//! Interactive multi-select over a lazily fetched, paged catalog.
//!
//! [`SessionState`] is the pure state machine; [`Selector::run`] is the loop
//! that loads pages, renders, prompts and applies commands.

mod state;
#[cfg(feature = "tui")]
mod terminal;

pub use state::{Command, PageView, Phase, SelectionSet, SessionState, VirtualIndex};
#[cfg(feature = "tui")]
pub use terminal::{TerminalView, command_for_key};

use crate::catalog::{Item, PageFetcher};
use crate::error::{Error, Result};

/// Presentation and input for the selector loop.
pub trait SelectorView {
    /// Draws the current page.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn render(&mut self, view: &PageView<'_>) -> Result<()>;

    /// Blocks until the operator issues the next command.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read.
    fn prompt(&mut self) -> Result<Command>;
}

/// Runs selection sessions with a fixed page size.
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    page_size: usize,
}

impl Selector {
    /// Creates a selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `page_size` is 0.
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { page_size })
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Runs one interactive session.
    ///
    /// Returns `Ok(None)` if the operator cancelled and `Ok(Some(items))`
    /// on confirmation, with `items` in ascending virtual-index order
    /// (empty if nothing was selected).
    ///
    /// # Errors
    ///
    /// Returns an error if the first page cannot be fetched or the view
    /// fails. A failure to fetch a later page leaves the operator on the
    /// current page with a status message.
    pub async fn run<F, V>(&self, fetcher: &F, view: &mut V) -> Result<Option<Vec<Item>>>
    where
        F: PageFetcher + ?Sized,
        V: SelectorView + ?Sized,
    {
        let mut state = SessionState::new(self.page_size);
        let mut status: Option<String> = None;

        loop {
            let page = state.current_page();
            state.cache_mut().get(page, fetcher).await?;
            view.render(&state.view(status.as_deref()))?;

            let command = view.prompt()?;
            status = None;
            if command == Command::PageRight {
                let next = page + 1;
                if let Err(e) = state.cache_mut().get(next, fetcher).await {
                    // The status line shows this; stderr output would tear the screen
                    log::debug!("Could not load page {}: {e}", next + 1);
                    status = Some(format!("Could not load page {}: {e}", next + 1));
                }
            }

            state = state.apply(command);
            match state.phase() {
                Phase::Browsing => {}
                Phase::Confirmed => {
                    let items = state.resolve();
                    log::info!("Selection confirmed: {} item(s)", items.len());
                    return Ok(Some(items));
                }
                Phase::Cancelled => {
                    log::info!("Selection cancelled");
                    return Ok(None);
                }
            }
        }
    }
}
