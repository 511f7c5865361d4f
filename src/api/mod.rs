//! REST client for the LabHub catalog API.
//!
//! All endpoints live under a single configurable base URL. The bearer token
//! comes from the injected [`SessionStore`]: list endpoints attach it when
//! present, download endpoints require it. Response bodies are normalized
//! into canonical records by [`records`] before anything else sees them.

use crate::session::{SessionError, SessionStore};
use percent_encoding::percent_decode_str;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub mod records;

pub use records::{Task, Topic};

/// Request timeout. The upstream web client had none and would spin forever
/// on a hung server; here a hang surfaces as a load error instead.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by API operations.
///
/// Every one of these terminates at the UI handler that initiated the call
/// and becomes local state (form text, inline banner, or notice overlay);
/// nothing propagates further and nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Form fields failed the pre-flight check; no request was sent.
    #[error("{0}")]
    Validation(String),
    /// Login/registration rejected; message extracted from the error body.
    #[error("{0}")]
    Auth(String),
    /// A download was attempted with no stored token.
    #[error("Sign in to download files")]
    AuthRequired,
    /// Non-2xx (and non-recoverable-404) status on a download endpoint.
    #[error("Download failed: status {0}")]
    DownloadFailed(u16),
    /// Non-2xx status on a list endpoint.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Network-level error (DNS, connection, TLS, timeout).
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Body was not the JSON we expected.
    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    /// Session files could not be written after a successful login.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The configured base URL does not parse.
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Which of a task's two files to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadKind {
    Primary,
    Solution,
}

impl DownloadKind {
    fn endpoint_suffix(self) -> &'static str {
        match self {
            DownloadKind::Primary => "download",
            DownloadKind::Solution => "download-solution",
        }
    }

    /// Synthesized filename used when the server sends no usable
    /// `Content-Disposition` header.
    pub fn fallback_filename(self, task_id: &str) -> String {
        match self {
            DownloadKind::Primary => format!("task-{}", task_id),
            DownloadKind::Solution => format!("task-{}-solution", task_id),
        }
    }
}

/// A downloaded binary payload with its resolved filename.
#[derive(Debug, Clone)]
pub struct TaskFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// HTTP client for the catalog API. Cheap to clone (shared connection pool,
/// shared session store).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer token when a session exists.
    fn maybe_authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => req.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
            None => req,
        }
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Register a new account and store the resulting session.
    ///
    /// Empty fields and mismatched passwords fail with
    /// [`ApiError::Validation`] before any request is issued.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password1: &str,
        password2: &str,
    ) -> Result<(), ApiError> {
        if username.is_empty() || email.is_empty() || password1.is_empty() || password2.is_empty()
        {
            return Err(ApiError::Validation("Fill in all fields".to_string()));
        }
        if password1 != password2 {
            return Err(ApiError::Validation("Passwords do not match".to_string()));
        }

        let body = json!({
            "username": username,
            "email": email,
            "password1": password1,
            "password2": password2,
        });
        self.submit_auth("/api/auth/register", username, body, "Registration failed")
            .await
    }

    /// Log in and store the resulting session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Enter username and password".to_string(),
            ));
        }

        let body = json!({ "username": username, "password": password });
        self.submit_auth("/api/auth/login", username, body, "Login failed")
            .await
    }

    async fn submit_auth(
        &self,
        path: &str,
        username: &str,
        body: Value,
        fallback: &str,
    ) -> Result<(), ApiError> {
        let response = self.http.post(self.url(path)).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text, fallback);
            tracing::warn!(path = %path, status = status, "Auth request rejected");
            return Err(ApiError::Auth(message));
        }

        // The success body is the session's auth payload. A body that is not
        // JSON still counts as a successful sign-in, just without a token.
        let auth: Option<Value> = response.json().await.ok();
        self.session.save(username, auth.as_ref())?;
        Ok(())
    }

    // ========================================================================
    // Catalog listing
    // ========================================================================

    /// Fetch all topics.
    pub async fn list_topics(&self) -> Result<Vec<Topic>, ApiError> {
        let response = self
            .maybe_authed(self.http.get(self.url("/api/labs/topics")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }

        let value: Value = response.json().await?;
        let raw = normalize_list(value);
        let mut skipped = 0usize;
        let topics: Vec<Topic> = raw
            .iter()
            .filter_map(|v| {
                let topic = Topic::from_value(v);
                if topic.is_none() {
                    skipped += 1;
                }
                topic
            })
            .collect();
        if skipped > 0 {
            tracing::warn!(skipped, "Topics without usable ids skipped");
        }
        Ok(topics)
    }

    /// Fetch the tasks for one topic, enriched with the topic's id and
    /// title. A 404 means the topic simply has no task list yet and yields
    /// an empty result.
    pub async fn list_tasks(&self, topic: &Topic) -> Result<Vec<Task>, ApiError> {
        let response = self
            .maybe_authed(
                self.http
                    .get(self.url(&format!("/api/labs/tasks/{}", topic.id))),
            )
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(topic = %topic.id, "No task list for topic (404)");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }

        let value: Value = response.json().await?;
        Ok(normalize_list(value)
            .iter()
            .map(|v| Task::from_value(v, topic))
            .collect())
    }

    // ========================================================================
    // Downloads
    // ========================================================================

    /// Download a task's primary or solution file.
    ///
    /// Requires a stored token. Returns `Ok(None)` for the recoverable
    /// "solution does not exist" case (404 on the solution endpoint); a 404
    /// on the primary endpoint is a hard [`ApiError::DownloadFailed`].
    pub async fn download_task_file(
        &self,
        task_id: &str,
        kind: DownloadKind,
    ) -> Result<Option<TaskFile>, ApiError> {
        let token = self.session.token().ok_or(ApiError::AuthRequired)?;

        let url = self.url(&format!(
            "/api/labs/tasks/{}/{}",
            task_id,
            kind.endpoint_suffix()
        ));
        let response = self
            .http
            .get(url)
            .header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND && kind == DownloadKind::Solution {
            tracing::debug!(task = %task_id, "No solution available (404)");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::DownloadFailed(status.as_u16()));
        }

        let filename = response
            .headers()
            .get("content-disposition")
            .and_then(|h| h.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| kind.fallback_filename(task_id));

        let bytes = response.bytes().await?.to_vec();
        tracing::info!(task = %task_id, filename = %filename, size = bytes.len(), "Downloaded file");
        Ok(Some(TaskFile { filename, bytes }))
    }
}

// ============================================================================
// Response normalization helpers
// ============================================================================

/// Flatten the accepted response shapes into a uniform list: a bare array,
/// `{results: [...]}`, `{items: [...]}`, or a single object (wrapped).
fn normalize_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(ref obj) => {
            for key in ["results", "items"] {
                if let Some(Value::Array(items)) = obj.get(key) {
                    return items.clone();
                }
            }
            vec![value]
        }
        _ => Vec::new(),
    }
}

/// Pull a human-readable message out of a JSON error body.
///
/// Takes the first field of the object: the first element if that value is
/// a non-empty array, the value itself if it is a string, otherwise the
/// provided fallback. Non-JSON bodies also fall back.
fn extract_error_message(body: &str, fallback: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback.to_string();
    };
    let Value::Object(map) = value else {
        return fallback.to_string();
    };
    let Some((_, first)) = map.iter().next() else {
        return fallback.to_string();
    };
    match first {
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string(),
        Value::String(s) => s.clone(),
        _ => fallback.to_string(),
    }
}

/// Extract a filename from a `Content-Disposition` header value.
///
/// Handles both the plain `filename="..."` parameter and the RFC 5987
/// extended `filename*=UTF-8''...` form (extended wins when both appear).
/// The value runs to the next `;` or closing quote and is percent-decoded.
/// Returns `None` when nothing usable remains, letting the caller fall back
/// to a synthesized name.
fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain: Option<&str> = None;
    let mut extended: Option<&str> = None;

    for part in header.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = Some(value),
            "filename" => plain = Some(value),
            _ => {}
        }
    }

    let raw = extended.or(plain)?;
    // Strip the optional charset'lang' prefix of the extended form.
    let raw = raw.rsplit_once("''").map(|(_, v)| v).unwrap_or(raw);
    let raw = raw.trim().trim_matches('"');

    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let name = decoded.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
