//! Download agent: fetches a task's file and writes it to the download
//! directory.
//!
//! The agent keeps an in-flight set keyed by `(task id, kind)` so a second
//! keypress on the same row is a no-op while the first download runs. The
//! marker is cleared on every exit path, including errors.

use crate::api::{ApiClient, ApiError, DownloadKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Failed to save file: {0}")]
    Io(#[from] std::io::Error),
}

/// What a finished download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved { path: PathBuf, filename: String },
    /// Solution requested, server says there is none. Not an error.
    NoSolution,
}

/// Tracks downloads in progress and writes completed ones to disk.
pub struct DownloadAgent {
    dir: PathBuf,
    in_flight: HashSet<(String, DownloadKind)>,
}

impl DownloadAgent {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            in_flight: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a download for this task and kind is currently running.
    pub fn is_in_flight(&self, task_id: &str, kind: DownloadKind) -> bool {
        self.in_flight.contains(&(task_id.to_string(), kind))
    }

    /// Mark a download as started. Returns `false` (and does nothing) when
    /// the same download is already in flight.
    pub fn begin(&mut self, task_id: &str, kind: DownloadKind) -> bool {
        self.in_flight.insert((task_id.to_string(), kind))
    }

    /// Clear the in-flight marker. Must be called on every completion path.
    pub fn finish(&mut self, task_id: &str, kind: DownloadKind) {
        self.in_flight.remove(&(task_id.to_string(), kind));
    }

    /// Fetch the file and write it into the download directory.
    ///
    /// This is the task body spawned by the UI; `begin`/`finish` bracket it
    /// from the event-loop side since the agent itself lives on one thread.
    pub async fn run_download(
        api: ApiClient,
        dir: PathBuf,
        task_id: String,
        kind: DownloadKind,
    ) -> Result<DownloadOutcome, DownloadError> {
        let Some(file) = api.download_task_file(&task_id, kind).await? else {
            return Ok(DownloadOutcome::NoSolution);
        };

        let filename = sanitize_filename(&file.filename)
            .unwrap_or_else(|| kind.fallback_filename(&task_id));
        let path = save_atomically(&dir, &filename, &file.bytes)?;
        tracing::info!(path = %path.display(), "File saved");
        Ok(DownloadOutcome::Saved { path, filename })
    }
}

/// Strip any path components from a server-supplied filename. Returns `None`
/// when nothing safe remains.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}

/// Write via a temp file in the same directory, then rename into place, so
/// an interrupted write never leaves a truncated download behind.
fn save_atomically(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let tmp = dir.join(format!(".{}.part", filename));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_dirs(name: &str) -> (PathBuf, PathBuf) {
        let base = std::env::temp_dir().join(format!("labhub_download_test_{}", name));
        std::fs::remove_dir_all(&base).ok();
        let session_dir = base.join("session");
        let download_dir = base.join("downloads");
        std::fs::create_dir_all(&session_dir).unwrap();
        (session_dir, download_dir)
    }

    fn authed_client(uri: &str, session_dir: &Path) -> ApiClient {
        let session = SessionStore::open(session_dir);
        session
            .save("u", Some(&serde_json::json!({"access": "t"})))
            .unwrap();
        ApiClient::new(uri, session).unwrap()
    }

    #[test]
    fn test_in_flight_marker() {
        let (_session_dir, download_dir) = test_dirs("marker");
        let mut agent = DownloadAgent::new(&download_dir);

        assert!(agent.begin("10", DownloadKind::Primary));
        assert!(agent.is_in_flight("10", DownloadKind::Primary));
        // Same task, same kind: blocked
        assert!(!agent.begin("10", DownloadKind::Primary));
        // Same task, other kind: independent
        assert!(agent.begin("10", DownloadKind::Solution));

        agent.finish("10", DownloadKind::Primary);
        assert!(!agent.is_in_flight("10", DownloadKind::Primary));
        assert!(agent.is_in_flight("10", DownloadKind::Solution));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(sanitize_filename("dir\\evil.exe").as_deref(), Some("evil.exe"));
        assert_eq!(sanitize_filename("trailing/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("  "), None);
    }

    #[tokio::test]
    async fn test_download_saves_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/labs/tasks/10/download"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"hw1.pdf\"")
                    .set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;

        let (session_dir, download_dir) = test_dirs("saves");
        let api = authed_client(&server.uri(), &session_dir);

        let outcome = DownloadAgent::run_download(
            api,
            download_dir.clone(),
            "10".to_string(),
            DownloadKind::Primary,
        )
        .await
        .unwrap();

        match outcome {
            DownloadOutcome::Saved { path, filename } => {
                assert_eq!(filename, "hw1.pdf");
                assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4");
            }
            other => panic!("Expected Saved, got {:?}", other),
        }
        // No temp file left behind
        assert!(!download_dir.join(".hw1.pdf.part").exists());
    }

    #[tokio::test]
    async fn test_missing_solution_is_no_solution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/labs/tasks/10/download-solution"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (session_dir, download_dir) = test_dirs("no_solution");
        let api = authed_client(&server.uri(), &session_dir);

        let outcome = DownloadAgent::run_download(
            api,
            download_dir.clone(),
            "10".to_string(),
            DownloadKind::Solution,
        )
        .await
        .unwrap();
        assert_eq!(outcome, DownloadOutcome::NoSolution);
        // Nothing written
        assert!(!download_dir.exists());
    }

    #[tokio::test]
    async fn test_traversal_filename_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/labs/tasks/10/download"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"a/..\"")
                    .set_body_bytes(b"data".to_vec()),
            )
            .mount(&server)
            .await;

        let (session_dir, download_dir) = test_dirs("traversal");
        let api = authed_client(&server.uri(), &session_dir);

        let outcome = DownloadAgent::run_download(
            api,
            download_dir.clone(),
            "10".to_string(),
            DownloadKind::Primary,
        )
        .await
        .unwrap();
        match outcome {
            DownloadOutcome::Saved { filename, .. } => assert_eq!(filename, "task-10"),
            other => panic!("Expected Saved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_download_is_api_error() {
        let (session_dir, download_dir) = test_dirs("unauthed");
        let session = SessionStore::open(&session_dir);
        let api = ApiClient::new("http://127.0.0.1:1", session).unwrap();

        let err = DownloadAgent::run_download(
            api,
            download_dir,
            "10".to_string(),
            DownloadKind::Primary,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DownloadError::Api(ApiError::AuthRequired)));
    }
}
