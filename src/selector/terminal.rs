//! Full-screen terminal rendering and key input for the selector.

use std::io::{self, Stdout};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::{Command, PageView, SelectorView};
use crate::error::Result;

const KEY_HINTS: &str = "↑↓ move | space select | ←→ page | enter confirm | esc cancel";

/// RAII guard that restores the terminal on drop, including on panic.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// Maps a key press to a selector command. Unbound keys yield `None`.
#[must_use]
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Cancel);
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Command::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Command::Down),
        KeyCode::Left | KeyCode::Char('h') => Some(Command::PageLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(Command::PageRight),
        KeyCode::Char(' ') => Some(Command::Toggle),
        KeyCode::Enter => Some(Command::Confirm),
        KeyCode::Esc | KeyCode::Char('q') => Some(Command::Cancel),
        _ => None,
    }
}

/// Selector view on the alternate screen.
pub struct TerminalView {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    title: String,
    // Dropped after `terminal`
    _guard: TerminalGuard,
}

impl TerminalView {
    /// Switches the terminal to raw mode and the alternate screen.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal setup fails.
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let guard = TerminalGuard::new()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            title: title.into(),
            _guard: guard,
        })
    }
}

impl SelectorView for TerminalView {
    fn render(&mut self, view: &PageView<'_>) -> Result<()> {
        let title = &self.title;
        self.terminal.draw(|frame| draw(frame, title, view))?;
        Ok(())
    }

    fn prompt(&mut self) -> Result<Command> {
        loop {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && let Some(command) = command_for_key(key)
            {
                return Ok(command);
            }
        }
    }
}

fn draw(frame: &mut ratatui::Frame, title: &str, view: &PageView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Item list
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Controls bar
        ])
        .split(frame.area());

    let page_label = format!(
        " page {}{} | {} selected ",
        view.page_index + 1,
        if view.has_more { "" } else { " (last)" },
        view.selected_total
    );

    let items: Vec<ListItem> = view
        .items
        .iter()
        .enumerate()
        .map(|(offset, item)| {
            let marker = if offset == view.cursor {
                Span::styled("> ", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("  ")
            };
            let check = if view.is_selected(offset) {
                Span::styled("(X) ", Style::default().fg(Color::Green))
            } else {
                Span::styled("( ) ", Style::default().fg(Color::DarkGray))
            };
            ListItem::new(Line::from(vec![marker, check, Span::raw(item.title.as_str())]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" {title} "))
                .title_bottom(page_label)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    let mut list_state = ListState::default().with_selected(Some(view.cursor));
    frame.render_stateful_widget(list, chunks[0], &mut list_state);

    let status = if view.items.is_empty() {
        "No videos on this page."
    } else {
        view.status.unwrap_or("")
    };
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new(KEY_HINTS).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}
