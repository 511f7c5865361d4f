//! Catalog state: the merged task list with filtering and pagination.
//!
//! One module owns the whole pipeline from "raw tasks arrived" to "these
//! ten rows are on screen". Loading fans out one request per topic and
//! merges the results; filtering and pagination are pure functions over the
//! merged list so every view (and every test) goes through the same code.

use crate::api::{ApiClient, ApiError, Task, Topic};
use futures::stream::{self, StreamExt};

/// Tasks shown per page.
pub const PAGE_SIZE: usize = 10;

/// Per-topic fetch parallelism.
const FETCH_CONCURRENCY: usize = 4;

/// Outcome of a full catalog load.
#[derive(Debug)]
pub struct CatalogData {
    pub topics: Vec<Topic>,
    pub tasks: Vec<Task>,
}

/// Load the complete catalog: all topics, then every topic's tasks in
/// parallel, merged and sorted newest-first.
///
/// A failing topic list fails the whole load. A failing *task* fetch only
/// drops that topic's tasks from the merge; one broken topic must not blank
/// the screen.
pub async fn load_catalog(api: &ApiClient) -> Result<CatalogData, ApiError> {
    let topics = api.list_topics().await?;
    let tasks = fetch_all_tasks(api, &topics).await;
    Ok(CatalogData { topics, tasks })
}

async fn fetch_all_tasks(api: &ApiClient, topics: &[Topic]) -> Vec<Task> {
    let results: Vec<Vec<Task>> = stream::iter(topics.iter().cloned())
        .map(|topic| {
            let api = api.clone();
            async move {
                match api.list_tasks(&topic).await {
                    Ok(tasks) => tasks,
                    Err(e) => {
                        tracing::warn!(topic = %topic.title, error = %e, "Task fetch failed, skipping topic");
                        Vec::new()
                    }
                }
            }
        })
        .buffer_unordered(FETCH_CONCURRENCY)
        .collect()
        .await;

    let mut tasks: Vec<Task> = results.into_iter().flatten().collect();
    sort_tasks(&mut tasks);
    tasks
}

/// Newest first. Tasks without a timestamp sort as the epoch, so they land
/// at the bottom together in a stable order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at.unwrap_or(0)));
}

/// Case-insensitive substring match against the space-joined concatenation
/// of title, type, status, and the owning topic's title, so a query may
/// span adjacent fields. An empty query matches everything.
fn matches_query(task: &Task, query_lower: &str) -> bool {
    if query_lower.is_empty() {
        return true;
    }
    let fields = [
        Some(task.title.as_str()),
        task.kind.as_deref(),
        task.status.as_deref(),
        Some(task.topic_title.as_str()),
    ];
    let haystack = fields
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    haystack.contains(query_lower)
}

/// Filter/pagination state over the merged task list.
///
/// The page index is 0-based internally; displays add 1. Changing either
/// filter resets to the first page, and the page is re-clamped whenever the
/// filtered set shrinks under it.
#[derive(Debug, Default)]
pub struct CatalogView {
    query: String,
    topic_filter: Option<String>,
    page: usize,
}

impl CatalogView {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn topic_filter(&self) -> Option<&str> {
        self.topic_filter.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query != self.query {
            self.query = query;
            self.page = 0;
        }
    }

    /// Filter to one topic id, or `None` for all topics.
    pub fn set_topic_filter(&mut self, topic_id: Option<String>) {
        if topic_id != self.topic_filter {
            self.topic_filter = topic_id;
            self.page = 0;
        }
    }

    /// Tasks passing the current filters, in the order of `tasks`.
    pub fn filtered<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let query_lower = self.query.to_lowercase();
        tasks
            .iter()
            .filter(|t| {
                self.topic_filter
                    .as_deref()
                    .map_or(true, |id| t.topic_id == id)
            })
            .filter(|t| matches_query(t, &query_lower))
            .collect()
    }

    /// Number of pages for the current filtered set. Never zero: an empty
    /// set still has one (empty) page.
    pub fn total_pages(&self, tasks: &[Task]) -> usize {
        total_pages(self.filtered(tasks).len())
    }

    /// The current page of filtered tasks, clamping the page index first.
    pub fn visible<'a>(&mut self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let filtered = self.filtered(tasks);
        self.page = self.page.min(total_pages(filtered.len()) - 1);
        filtered
            .into_iter()
            .skip(self.page * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect()
    }

    pub fn next_page(&mut self, tasks: &[Task]) {
        let last = self.total_pages(tasks) - 1;
        self.page = (self.page + 1).min(last);
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }
}

fn total_pages(filtered_len: usize) -> usize {
    filtered_len.div_ceil(PAGE_SIZE).max(1)
}

// ============================================================================
// Tests
// ============================================================================
