//! Task list widget with its pagination footer.

use crate::api::{DownloadKind, Task};
use crate::app::{App, Focus};
use crate::util::{strip_control_chars, truncate_to_width};
use chrono::DateTime;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == Focus::Tasks;
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let visible = app.visible_tasks();
    let page = app.view.page() + 1;
    let pages = app.view.total_pages(&app.tasks);
    let total = app.view.filtered(&app.tasks).len();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!("Tasks ({})", total));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    if visible.is_empty() {
        let message = if app.loading {
            "Loading..."
        } else if app.tasks.is_empty() {
            "No tasks in the catalog"
        } else {
            "No tasks match the current filters"
        };
        f.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[0],
        );
    } else {
        let width = chunks[0].width as usize;
        let items: Vec<ListItem> = visible
            .iter()
            .map(|t| ListItem::new(task_row(t, &app.downloads_marker(t), width)))
            .collect();

        let list = List::new(items).highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(app.selected_task.min(visible.len() - 1)));
        f.render_stateful_widget(list, chunks[0], &mut state);
    }

    let footer = Line::from(Span::styled(
        format!("Page {}/{}", page, pages),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(footer).alignment(Alignment::Right), chunks[1]);
}

impl App {
    /// Short marker for a task's download state, shown at the row's end.
    fn downloads_marker(&self, task: &Task) -> String {
        let Some(id) = task.id.as_deref() else {
            return String::new();
        };
        let mut marker = String::new();
        if self.downloads.is_in_flight(id, DownloadKind::Primary)
            || self.downloads.is_in_flight(id, DownloadKind::Solution)
        {
            marker.push_str(" [downloading]");
        } else if task.has_solution {
            marker.push_str(" [S]");
        }
        marker
    }
}

/// One task row: date, title, type/status, owning topic, markers.
fn task_row(task: &Task, marker: &str, width: usize) -> String {
    let date = task
        .created_at
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());

    let mut meta = String::new();
    if let Some(kind) = &task.kind {
        meta.push_str(&format!(" [{}]", kind));
    }
    if let Some(status) = &task.status {
        meta.push_str(&format!(" ({})", status));
    }

    let title = strip_control_chars(&task.title);
    let topic = strip_control_chars(&task.topic_title);
    let tail = format!("{}  {}{}", meta, topic, marker);

    // Date column (10) + two spaces, tail kept whole, title takes the rest
    let title_budget = width.saturating_sub(12 + tail.chars().count());
    format!(
        "{}  {}{}",
        date,
        truncate_to_width(&title, title_budget),
        tail
    )
}
