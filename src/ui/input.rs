//! Input handling for the TUI.
//!
//! Dispatches on the current mode: the auth overlay captures all keys while
//! open, the search bar captures typing while focused, and browse keys
//! handle everything else.

use crate::api::DownloadKind;
use crate::app::{App, AuthMode, Focus};
use crate::catalog::PAGE_SIZE;
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    if app.auth.is_some() {
        return handle_auth_input(app, code, modifiers);
    }
    if app.focus == Focus::Search {
        return handle_search_input(app, code);
    }
    handle_browse_input(app, code)
}

/// Handle input while the login/registration overlay is open.
///
/// Esc closes, Tab moves between fields, Enter submits, Ctrl+R toggles
/// between login and registration. Everything else edits the active field.
fn handle_auth_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    let Some(form) = &mut app.auth else {
        return Action::Continue;
    };

    if modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('r') = code {
            form.toggle_mode();
        }
        return Action::Continue;
    }

    match code {
        KeyCode::Esc => app.close_auth(),
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::Enter => app.submit_auth(),
        KeyCode::Backspace => {
            form.active_value_mut().pop();
        }
        KeyCode::Char(c) => {
            form.active_value_mut().push(c);
        }
        _ => {}
    }
    Action::Continue
}

/// Handle input while the search bar has focus. Edits apply to the filter
/// immediately; Esc or Enter hands focus back to the task list.
fn handle_search_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Enter => app.focus = Focus::Tasks,
        KeyCode::Backspace => {
            let mut query = app.view.query().to_string();
            query.pop();
            app.set_query(query);
        }
        KeyCode::Char(c) => {
            let mut query = app.view.query().to_string();
            query.push(c);
            app.set_query(query);
        }
        _ => {}
    }
    Action::Continue
}

/// Handle input in the browse view (topics sidebar + task list).
fn handle_browse_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('r') => app.spawn_refresh(),
        KeyCode::Char('/') => app.focus = Focus::Search,
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Topics => Focus::Tasks,
                _ => Focus::Topics,
            };
        }
        KeyCode::Char('j') | KeyCode::Down => nav_down(app),
        KeyCode::Char('k') | KeyCode::Up => nav_up(app),
        KeyCode::Char('h') | KeyCode::Left => app.prev_page(),
        KeyCode::Char('l') | KeyCode::Right => app.next_page(),
        KeyCode::Enter => {
            if app.focus == Focus::Topics {
                app.select_topic(app.selected_topic);
            }
        }
        KeyCode::Esc => {
            // Clear filters back to the full catalog
            app.set_query(String::new());
            app.selected_topic = 0;
            app.select_topic(0);
        }
        KeyCode::Char('d') => app.request_download(DownloadKind::Primary),
        KeyCode::Char('s') => app.request_download(DownloadKind::Solution),
        KeyCode::Char('i') => app.open_auth(AuthMode::Login),
        KeyCode::Char('o') => app.open_auth(AuthMode::Register),
        KeyCode::Char('u') => {
            if app.session.current().is_some() {
                app.logout();
            }
        }
        _ => {}
    }
    Action::Continue
}

fn nav_down(app: &mut App) {
    match app.focus {
        Focus::Topics => {
            let last = app.topics.len(); // index 0 is "All topics"
            app.selected_topic = (app.selected_topic + 1).min(last);
        }
        _ => {
            let visible = app.visible_tasks().len();
            if visible > 0 {
                app.selected_task = (app.selected_task + 1).min(visible - 1).min(PAGE_SIZE - 1);
            }
        }
    }
}

fn nav_up(app: &mut App) {
    match app.focus {
        Focus::Topics => app.selected_topic = app.selected_topic.saturating_sub(1),
        _ => app.selected_task = app.selected_task.saturating_sub(1),
    }
}

// ============================================================================
// Tests
// ============================================================================
