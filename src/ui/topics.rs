//! Topic sidebar widget.

use crate::app::{App, Focus};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the topic list with a synthetic "All topics" row at the top.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Topics;
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let inner_width = area.width.saturating_sub(2) as usize;
    let filtered_id = app.view.topic_filter();

    let mut items: Vec<ListItem> = Vec::with_capacity(app.topics.len() + 1);
    items.push(ListItem::new(row_text(
        "All topics",
        filtered_id.is_none(),
        inner_width,
    )));
    for topic in &app.topics {
        let active = filtered_id == Some(topic.id.as_str());
        items.push(ListItem::new(row_text(&topic.title, active, inner_width)));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!("Topics ({})", app.topics.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    state.select(Some(app.selected_topic));
    f.render_stateful_widget(list, area, &mut state);
}

/// A topic row, marking the one the catalog is currently filtered to.
fn row_text(title: &str, active: bool, width: usize) -> String {
    let clean = strip_control_chars(title);
    let marker = if active { "* " } else { "  " };
    let budget = width.saturating_sub(2);
    format!("{}{}", marker, truncate_to_width(&clean, budget))
}
