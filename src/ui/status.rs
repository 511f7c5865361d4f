use crate::app::{App, StatusLevel};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the one-line header: app name on the left, session on the right.
pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let session = match app.session.current() {
        Some(username) => format!("{} [u]sign out", username),
        None => "[i]sign in [o]register".to_string(),
    };
    let title = " LabHub";
    let pad = (area.width as usize)
        .saturating_sub(title.len() + session.len() + 1)
        .max(1);

    let line = Line::from(vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(pad)),
        Span::styled(session, Style::default().fg(Color::Cyan)),
    ]);
    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Black)),
        area,
    );
}

/// Render the status bar: active notice, load error, or keybinding hints.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let mut style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let text: Cow<'_, str> = if let Some(status) = &app.status {
        if status.level == StatusLevel::Error {
            style = Style::default().bg(Color::Red).fg(Color::White);
        }
        Cow::Borrowed(status.text.as_str())
    } else if app.loading {
        Cow::Borrowed("Loading catalog...")
    } else if let Some(error) = &app.load_error {
        style = Style::default().bg(Color::Red).fg(Color::White);
        Cow::Borrowed(error.as_str())
    } else {
        Cow::Borrowed(
            "[r]efresh [/]search [Tab]switch [h/l]page [d]ownload [s]olution [q]uit",
        )
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}
