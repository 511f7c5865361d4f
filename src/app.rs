//! Central application state and the event fan-in.
//!
//! All mutation happens on the event-loop thread. Network work runs in
//! spawned tasks that report back through the [`AppEvent`] channel; handlers
//! here apply the results to state and the next frame renders them.

use crate::api::{ApiClient, DownloadKind, Task, Topic};
use crate::catalog::{CatalogData, CatalogView};
use crate::config::Config;
use crate::download::{DownloadAgent, DownloadOutcome};
use crate::session::SessionStore;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
// tokio's Instant: the status TTL follows the runtime clock
use tokio::time::Instant;

/// How long a status notice stays on screen.
const STATUS_TTL: Duration = Duration::from_secs(5);

// ============================================================================
// Events
// ============================================================================

/// Messages from background tasks back to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    CatalogLoaded(CatalogData),
    CatalogFailed(String),
    AuthSucceeded { username: String },
    AuthFailed(String),
    DownloadFinished {
        task_id: String,
        kind: DownloadKind,
        result: Result<DownloadOutcome, String>,
    },
}

// ============================================================================
// Auth form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

/// Fields of the auth overlay, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Email,
    Password,
    PasswordConfirm,
}

/// State of the login/registration overlay. Present only while it is open.
#[derive(Debug)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub field: AuthField,
    /// Inline error shown inside the form (validation or server rejection).
    pub error: Option<String>,
    /// Set while a submit is on the wire; blocks double submission.
    pub submitting: bool,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            username: String::new(),
            email: String::new(),
            password: String::new(),
            password_confirm: String::new(),
            field: AuthField::Username,
            error: None,
            submitting: false,
        }
    }

    /// Switch between login and registration, keeping typed fields.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.error = None;
        if self.mode == AuthMode::Login && matches!(self.field, AuthField::Email | AuthField::PasswordConfirm) {
            self.field = AuthField::Username;
        }
    }

    /// Move focus to the next field, wrapping. Login mode skips the
    /// registration-only fields.
    pub fn next_field(&mut self) {
        self.field = match (self.mode, self.field) {
            (AuthMode::Login, AuthField::Username) => AuthField::Password,
            (AuthMode::Login, _) => AuthField::Username,
            (AuthMode::Register, AuthField::Username) => AuthField::Email,
            (AuthMode::Register, AuthField::Email) => AuthField::Password,
            (AuthMode::Register, AuthField::Password) => AuthField::PasswordConfirm,
            (AuthMode::Register, AuthField::PasswordConfirm) => AuthField::Username,
        };
    }

    pub fn active_value_mut(&mut self) -> &mut String {
        match self.field {
            AuthField::Username => &mut self.username,
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
            AuthField::PasswordConfirm => &mut self.password_confirm,
        }
    }
}

// ============================================================================
// Status line
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub shown_at: Instant,
}

// ============================================================================
// Focus
// ============================================================================

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Topics,
    Tasks,
    Search,
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionStore,
    pub downloads: DownloadAgent,

    pub topics: Vec<Topic>,
    pub tasks: Vec<Task>,
    pub view: CatalogView,
    pub loading: bool,
    pub load_error: Option<String>,

    /// Index into the topic sidebar (0 = "All topics", then `topics` order).
    pub selected_topic: usize,
    /// Index into the current page of tasks.
    pub selected_task: usize,
    pub focus: Focus,

    pub auth: Option<AuthForm>,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,

    events_tx: mpsc::UnboundedSender<AppEvent>,
    refresh_handle: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(
        config: Config,
        api: ApiClient,
        session: SessionStore,
        events_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let download_dir = config.download_dir();
        Self {
            downloads: DownloadAgent::new(download_dir),
            config,
            api,
            session,
            topics: Vec::new(),
            tasks: Vec::new(),
            view: CatalogView::default(),
            loading: false,
            load_error: None,
            selected_topic: 0,
            selected_task: 0,
            focus: Focus::Tasks,
            auth: None,
            status: None,
            should_quit: false,
            events_tx,
            refresh_handle: None,
        }
    }

    pub fn events_tx(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.events_tx.clone()
    }

    // ------------------------------------------------------------------
    // Catalog loading
    // ------------------------------------------------------------------

    /// Kick off a full catalog reload. An already-running reload is aborted
    /// and replaced.
    pub fn spawn_refresh(&mut self) {
        if let Some(handle) = self.refresh_handle.take() {
            handle.abort();
        }
        self.loading = true;
        self.load_error = None;

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        self.refresh_handle = Some(tokio::spawn(async move {
            let event = match crate::catalog::load_catalog(&api).await {
                Ok(data) => AppEvent::CatalogLoaded(data),
                Err(e) => AppEvent::CatalogFailed(e.to_string()),
            };
            let _ = tx.send(event);
        }));
    }

    // ------------------------------------------------------------------
    // Event application
    // ------------------------------------------------------------------

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded(data) => {
                self.loading = false;
                self.load_error = None;
                self.topics = data.topics;
                self.tasks = data.tasks;
                self.refresh_handle = None;
                self.clamp_selections();
                tracing::info!(
                    topics = self.topics.len(),
                    tasks = self.tasks.len(),
                    "Catalog loaded"
                );
            }
            AppEvent::CatalogFailed(message) => {
                self.loading = false;
                self.load_error = Some(message.clone());
                self.refresh_handle = None;
                tracing::warn!(error = %message, "Catalog load failed");
            }
            AppEvent::AuthSucceeded { username } => {
                if let Some(form) = self.auth.take() {
                    let verb = match form.mode {
                        AuthMode::Login => "Signed in",
                        AuthMode::Register => "Registered",
                    };
                    self.set_status(format!("{} as {}", verb, username), StatusLevel::Info);
                }
                // Authenticated listings may reveal more, reload
                self.spawn_refresh();
            }
            AppEvent::AuthFailed(message) => {
                if let Some(form) = &mut self.auth {
                    form.submitting = false;
                    form.error = Some(message);
                }
            }
            AppEvent::DownloadFinished {
                task_id,
                kind,
                result,
            } => {
                self.downloads.finish(&task_id, kind);
                match result {
                    Ok(DownloadOutcome::Saved { path, .. }) => {
                        self.set_status(
                            format!("Saved to {}", path.display()),
                            StatusLevel::Info,
                        );
                    }
                    Ok(DownloadOutcome::NoSolution) => {
                        self.set_status(
                            "No solution available for this task".to_string(),
                            StatusLevel::Info,
                        );
                    }
                    Err(message) => {
                        self.set_status(message, StatusLevel::Error);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Selection and filtering
    // ------------------------------------------------------------------

    /// Tasks on the current page, after filters.
    pub fn visible_tasks(&mut self) -> Vec<Task> {
        self.view.visible(&self.tasks).into_iter().cloned().collect()
    }

    pub fn current_task(&mut self) -> Option<Task> {
        let visible = self.visible_tasks();
        visible.get(self.selected_task).cloned()
    }

    /// Clamp both selections after any change to the underlying lists.
    pub fn clamp_selections(&mut self) {
        // Topic 0 is the synthetic "All topics" row
        let topic_rows = self.topics.len() + 1;
        self.selected_topic = self.selected_topic.min(topic_rows - 1);

        let visible = self.view.visible(&self.tasks).len();
        self.selected_task = self.selected_task.min(visible.saturating_sub(1));
    }

    /// Apply the topic selection as the catalog filter.
    pub fn select_topic(&mut self, index: usize) {
        self.selected_topic = index.min(self.topics.len());
        let filter = if self.selected_topic == 0 {
            None
        } else {
            Some(self.topics[self.selected_topic - 1].id.clone())
        };
        self.view.set_topic_filter(filter);
        self.selected_task = 0;
    }

    pub fn set_query(&mut self, query: String) {
        self.view.set_query(query);
        self.selected_task = 0;
    }

    pub fn next_page(&mut self) {
        self.view.next_page(&self.tasks);
        self.selected_task = 0;
    }

    pub fn prev_page(&mut self) {
        self.view.prev_page();
        self.selected_task = 0;
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub fn open_auth(&mut self, mode: AuthMode) {
        self.auth = Some(AuthForm::new(mode));
    }

    pub fn close_auth(&mut self) {
        self.auth = None;
    }

    /// Submit the auth form. Validation failures surface inline without a
    /// request; server outcomes arrive as events.
    pub fn submit_auth(&mut self) {
        let Some(form) = &mut self.auth else {
            return;
        };
        if form.submitting {
            return;
        }
        form.error = None;
        form.submitting = true;

        let mode = form.mode;
        let username = form.username.clone();
        let email = form.email.clone();
        let password = form.password.clone();
        let confirm = form.password_confirm.clone();
        let api = self.api.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = match mode {
                AuthMode::Login => api.login(&username, &password).await,
                AuthMode::Register => {
                    api.register(&username, &email, &password, &confirm).await
                }
            };
            let event = match result {
                Ok(()) => AppEvent::AuthSucceeded { username },
                Err(e) => AppEvent::AuthFailed(e.to_string()),
            };
            let _ = tx.send(event);
        });
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.session.clear() {
            self.set_status(e.to_string(), StatusLevel::Error);
            return;
        }
        self.set_status("Signed out".to_string(), StatusLevel::Info);
        self.spawn_refresh();
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    /// Start downloading the selected task's file. Ignores tasks without an
    /// id and downloads already in flight.
    pub fn request_download(&mut self, kind: DownloadKind) {
        let Some(task) = self.current_task() else {
            return;
        };
        let Some(task_id) = task.id else {
            self.set_status(
                "This task has no downloadable file".to_string(),
                StatusLevel::Error,
            );
            return;
        };
        if kind == DownloadKind::Solution && !task.has_solution {
            self.set_status(
                "No solution available for this task".to_string(),
                StatusLevel::Info,
            );
            return;
        }
        if !self.downloads.begin(&task_id, kind) {
            return;
        }

        let api = self.api.clone();
        let dir = self.downloads.dir().to_path_buf();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = DownloadAgent::run_download(api, dir, task_id.clone(), kind)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::DownloadFinished {
                task_id,
                kind,
                result,
            });
        });
    }

    // ------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------

    pub fn set_status(&mut self, text: String, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text,
            level,
            shown_at: Instant::now(),
        });
    }

    /// Drop the status notice once its TTL passes. Called every tick.
    pub fn expire_status(&mut self) {
        if let Some(status) = &self.status {
            if status.shown_at.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_handle.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_app(name: &str) -> App {
        let dir = std::env::temp_dir().join(format!("labhub_app_test_{}", name));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        let session = SessionStore::open(&dir);
        let api = ApiClient::new("http://127.0.0.1:1", session.clone()).unwrap();
        let config = Config {
            api_base_url: "http://127.0.0.1:1".to_string(),
            download_dir: Some(PathBuf::from("/tmp/labhub_app_test_downloads")),
        };
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(config, api, session, tx)
    }

    fn task(id: &str, topic_id: &str, created_at: i64) -> Task {
        Task {
            id: Some(id.to_string()),
            title: format!("Task {}", id),
            kind: None,
            status: None,
            created_at: Some(created_at),
            topic_id: topic_id.to_string(),
            topic_title: format!("Topic {}", topic_id),
            file_url: None,
            has_solution: false,
        }
    }

    fn topic(id: &str) -> Topic {
        Topic {
            id: id.to_string(),
            title: format!("Topic {}", id),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_catalog_loaded_resets_state() {
        let mut app = test_app("loaded");
        app.loading = true;
        app.load_error = Some("old".to_string());
        app.selected_task = 7;

        app.apply_event(AppEvent::CatalogLoaded(CatalogData {
            topics: vec![topic("1")],
            tasks: vec![task("a", "1", 10), task("b", "1", 20)],
        }));

        assert!(!app.loading);
        assert!(app.load_error.is_none());
        assert_eq!(app.topics.len(), 1);
        assert_eq!(app.tasks.len(), 2);
        // Selection clamped into the two-row page
        assert_eq!(app.selected_task, 1);
    }

    #[tokio::test]
    async fn test_catalog_failed_keeps_old_tasks() {
        let mut app = test_app("failed");
        app.tasks = vec![task("a", "1", 10)];
        app.apply_event(AppEvent::CatalogFailed("HTTP error: status 500".to_string()));

        assert!(!app.loading);
        assert_eq!(app.load_error.as_deref(), Some("HTTP error: status 500"));
        assert_eq!(app.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_select_topic_filters_and_resets() {
        let mut app = test_app("select_topic");
        app.topics = vec![topic("1"), topic("2")];
        app.tasks = vec![task("a", "1", 10), task("b", "2", 20)];
        app.selected_task = 1;

        app.select_topic(2);
        assert_eq!(app.view.topic_filter(), Some("2"));
        assert_eq!(app.selected_task, 0);
        let visible = app.visible_tasks();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id.as_deref(), Some("b"));

        // Index 0 is "All topics"
        app.select_topic(0);
        assert_eq!(app.view.topic_filter(), None);
        assert_eq!(app.visible_tasks().len(), 2);

        // Out-of-range selection clamps to the last topic
        app.select_topic(99);
        assert_eq!(app.selected_topic, 2);
    }

    #[tokio::test]
    async fn test_auth_failed_reopens_form_for_retry() {
        let mut app = test_app("auth_failed");
        app.open_auth(AuthMode::Login);
        app.auth.as_mut().unwrap().submitting = true;

        app.apply_event(AppEvent::AuthFailed("Login failed".to_string()));

        let form = app.auth.as_ref().unwrap();
        assert!(!form.submitting);
        assert_eq!(form.error.as_deref(), Some("Login failed"));
    }

    #[tokio::test]
    async fn test_auth_succeeded_closes_form_and_reloads() {
        let mut app = test_app("auth_ok");
        app.open_auth(AuthMode::Login);
        app.apply_event(AppEvent::AuthSucceeded {
            username: "alice".to_string(),
        });

        assert!(app.auth.is_none());
        assert!(app.loading);
        let status = app.status.as_ref().unwrap();
        assert!(status.text.contains("alice"));
    }

    #[tokio::test]
    async fn test_download_finished_clears_marker() {
        let mut app = test_app("dl_finished");
        assert!(app.downloads.begin("10", DownloadKind::Primary));

        app.apply_event(AppEvent::DownloadFinished {
            task_id: "10".to_string(),
            kind: DownloadKind::Primary,
            result: Err("Download failed: status 500".to_string()),
        });

        assert!(!app.downloads.is_in_flight("10", DownloadKind::Primary));
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Error);
    }

    #[tokio::test]
    async fn test_solution_request_without_solution_is_notice() {
        let mut app = test_app("no_solution");
        app.tasks = vec![task("a", "1", 10)];
        app.request_download(DownloadKind::Solution);

        assert!(!app.downloads.is_in_flight("a", DownloadKind::Solution));
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_expires_after_ttl() {
        let mut app = test_app("status_ttl");
        app.set_status("Saved".to_string(), StatusLevel::Info);

        app.expire_status();
        assert!(app.status.is_some());

        // Just short of the TTL: still visible
        tokio::time::advance(Duration::from_millis(4_900)).await;
        app.expire_status();
        assert!(app.status.is_some());

        tokio::time::advance(Duration::from_millis(200)).await;
        app.expire_status();
        assert!(app.status.is_none());
    }

    #[test]
    fn test_auth_form_field_order() {
        let mut form = AuthForm::new(AuthMode::Login);
        assert_eq!(form.field, AuthField::Username);
        form.next_field();
        assert_eq!(form.field, AuthField::Password);
        form.next_field();
        assert_eq!(form.field, AuthField::Username);

        let mut form = AuthForm::new(AuthMode::Register);
        form.next_field();
        assert_eq!(form.field, AuthField::Email);
        form.next_field();
        assert_eq!(form.field, AuthField::Password);
        form.next_field();
        assert_eq!(form.field, AuthField::PasswordConfirm);
        form.next_field();
        assert_eq!(form.field, AuthField::Username);
    }

    #[test]
    fn test_toggle_mode_leaves_login_on_valid_field() {
        let mut form = AuthForm::new(AuthMode::Register);
        form.field = AuthField::Email;
        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::Login);
        assert_eq!(form.field, AuthField::Username);
    }
}
