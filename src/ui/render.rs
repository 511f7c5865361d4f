//! Render functions for the TUI.
//!
//! One frame is: header, search bar, topic sidebar + task list, status bar.
//! The auth overlay draws on top when open.

use crate::app::{App, Focus};
use crate::util::display_width;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{auth, status, tasks, topics};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 12;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(3), // search bar
            Constraint::Min(0),    // topics + tasks
            Constraint::Length(1), // status bar
        ])
        .split(area);

    status::render_header(f, app, chunks[0]);
    render_search_bar(f, app, chunks[1]);
    render_main_panels(f, app, chunks[2]);
    status::render(f, app, chunks[3]);

    if app.auth.is_some() {
        auth::render(f, app);
    }
}

/// Render the topic sidebar and task list side by side.
fn render_main_panels(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(area);

    topics::render(f, app, chunks[0]);
    tasks::render(f, app, chunks[1]);
}

fn render_search_bar(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Search;
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let content = if app.view.query().is_empty() && !focused {
        "Press / to search".to_string()
    } else {
        app.view.query().to_string()
    };
    let text_style = if app.view.query().is_empty() && !focused {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let widget = Paragraph::new(content).style(text_style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title("Search"),
    );
    f.render_widget(widget, area);

    if focused {
        // Cursor after the typed query, inside the border
        f.set_cursor_position((search_cursor_x(area, app.view.query()), area.y + 1));
    }
}

/// Column for the search cursor: one past the rendered query, measured in
/// display cells rather than bytes, clamped inside the border.
fn search_cursor_x(area: Rect, query: &str) -> u16 {
    let width = display_width(query).min(area.width.saturating_sub(2) as usize);
    area.x + 1 + width as u16
}
