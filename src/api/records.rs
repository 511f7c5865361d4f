//! Canonical records and the adapter that produces them.
//!
//! The server is loose about field names: a display name may arrive as
//! `title`, `name`, or `short_name`; a file reference as `file`, `file_url`,
//! `url`, `document`, or `attachment`; the solution flag as a boolean, a
//! number, or a string under three different keys. All of that guessing is
//! confined to this module — the rest of the crate only ever sees `Topic`
//! and `Task` with one shape.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// A discipline grouping materials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

/// A single material item (lab, lecture, assignment) belonging to a topic.
///
/// `topic_id` and `topic_title` are filled in client-side when tasks are
/// loaded per topic; `created_at` is a Unix timestamp, `None` when the
/// server sent nothing parseable (such tasks sort last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Option<String>,
    pub title: String,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<i64>,
    pub topic_id: String,
    pub topic_title: String,
    pub file_url: Option<String>,
    pub has_solution: bool,
}

impl Topic {
    /// Build a canonical topic from a raw JSON value.
    ///
    /// Returns `None` when the value has no usable `id` — a topic we cannot
    /// identify cannot be listed or fetched against.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = id_string(value.get("id")?)?;
        let title = display_title(value, &id);
        let description = string_field(value, "description");
        Some(Self {
            id,
            title,
            description,
        })
    }
}

impl Task {
    /// Build a canonical task from a raw JSON value, enriched with the topic
    /// it was fetched under.
    pub fn from_value(value: &Value, topic: &Topic) -> Self {
        let id = value.get("id").and_then(id_string);
        let title = display_title(value, id.as_deref().unwrap_or("?"));
        Self {
            id,
            title,
            kind: string_field(value, "type"),
            status: string_field(value, "status"),
            created_at: value.get("created_at").and_then(parse_created_at),
            topic_id: topic.id.clone(),
            topic_title: topic.title.clone(),
            file_url: file_url(value),
            has_solution: has_solution(value),
        }
    }
}

/// Stringify a JSON id: accepts a string or a number, rejects anything else.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty string field lookup.
fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Display-name precedence: `title` → `name` → `short_name` → `"#<id>"`.
fn display_title(value: &Value, id: &str) -> String {
    for key in ["title", "name", "short_name"] {
        if let Some(s) = string_field(value, key) {
            return s;
        }
    }
    format!("#{}", id)
}

/// File-reference precedence: `file` → `file_url` → `url` → `document` →
/// `attachment`. A reference may be a bare string or an object carrying a
/// `url` field.
fn file_url(value: &Value) -> Option<String> {
    for key in ["file", "file_url", "url", "document", "attachment"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Object(obj)) => {
                if let Some(url) = obj.get("url").and_then(Value::as_str) {
                    if !url.is_empty() {
                        return Some(url.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Solution-flag coercion over `has_solution` → `solution_available` →
/// `solution`: boolean passthrough, number equals 1, non-empty string.
/// The first key present decides.
fn has_solution(value: &Value) -> bool {
    for key in ["has_solution", "solution_available", "solution"] {
        match value.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::Bool(b)) => return *b,
            Some(Value::Number(n)) => return n.as_i64() == Some(1),
            Some(Value::String(s)) => return !s.is_empty(),
            Some(_) => return false,
        }
    }
    false
}

/// Parse a `created_at` value into a Unix timestamp.
///
/// Accepts numeric epoch seconds, RFC 3339, `YYYY-MM-DDTHH:MM:SS` without an
/// offset, and a bare `YYYY-MM-DD` date (midnight UTC). Anything else is
/// `None`, which the catalog sorts as the epoch (i.e., last).
fn parse_created_at(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp());
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt.and_utc().timestamp());
                }
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
            }
            None
        }
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
