//! Login/registration overlay.

use crate::app::{App, AuthField, AuthMode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let Some(form) = &app.auth else {
        return;
    };

    let title = match form.mode {
        AuthMode::Login => " Sign in ",
        AuthMode::Register => " Register ",
    };
    let field_count = match form.mode {
        AuthMode::Login => 2,
        AuthMode::Register => 4,
    };
    // Fields + error line + hint line + borders
    let height = field_count + 4;
    let area = centered_rect(46, height, f.area());

    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(1); field_count as usize];
    constraints.push(Constraint::Length(1)); // error
    constraints.push(Constraint::Length(1)); // hints
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let mut row = 0;
    render_field(f, rows[row], "Username", &form.username, form.field == AuthField::Username);
    row += 1;
    if form.mode == AuthMode::Register {
        render_field(f, rows[row], "Email", &form.email, form.field == AuthField::Email);
        row += 1;
    }
    render_masked(f, rows[row], "Password", &form.password, form.field == AuthField::Password);
    row += 1;
    if form.mode == AuthMode::Register {
        render_masked(
            f,
            rows[row],
            "Confirm",
            &form.password_confirm,
            form.field == AuthField::PasswordConfirm,
        );
        row += 1;
    }

    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            rows[row],
        );
    } else if form.submitting {
        f.render_widget(
            Paragraph::new("Submitting...").style(Style::default().fg(Color::DarkGray)),
            rows[row],
        );
    }
    row += 1;

    let hint = match form.mode {
        AuthMode::Login => "Enter submit | Tab next | Ctrl+R register | Esc close",
        AuthMode::Register => "Enter submit | Tab next | Ctrl+R sign in | Esc close",
    };
    f.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        rows[row],
    );
}

fn render_field(f: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
    render_row(f, area, label, value, active);
}

fn render_masked(f: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
    let masked = "*".repeat(value.chars().count());
    render_row(f, area, label, &masked, active);
}

fn render_row(f: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
    let label_style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    let line = Line::from(vec![
        Span::styled(format!("{:>9}: ", label), label_style),
        Span::raw(value.to_string()),
    ]);
    f.render_widget(Paragraph::new(line), area);
    if active {
        let x = area.x + 11 + value.chars().count().min(area.width as usize - 12) as u16;
        f.set_cursor_position((x, area.y));
    }
}

/// A rect of fixed width/height centered in `area`, clamped to fit.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
