//! Status-tracked work items (one URL each).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a work item.
///
/// ```text
/// pending -> downloaded -> parsed -> analyzed
///    \            \           \
///     +------------+-----------+--> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Downloaded,
    Parsed,
    /// Reserved for a downstream consumer
    Analyzed,
    Failed,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 5] = [
        RecordStatus::Pending,
        RecordStatus::Downloaded,
        RecordStatus::Parsed,
        RecordStatus::Analyzed,
        RecordStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Downloaded => "downloaded",
            RecordStatus::Parsed => "parsed",
            RecordStatus::Analyzed => "analyzed",
            RecordStatus::Failed => "failed",
        }
    }

    /// Whether the pipeline may move a record from `self` to `next`.
    ///
    /// Re-queueing out of `failed` is an operator action and is not allowed here.
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        use RecordStatus::*;
        matches!(
            (self, next),
            (Pending, Downloaded)
                | (Pending, Failed)
                | (Downloaded, Parsed)
                | (Downloaded, Failed)
                | (Parsed, Analyzed)
                | (Parsed, Failed)
        )
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordStatus::Pending),
            "downloaded" => Ok(RecordStatus::Downloaded),
            "parsed" => Ok(RecordStatus::Parsed),
            "analyzed" => Ok(RecordStatus::Analyzed),
            "failed" => Ok(RecordStatus::Failed),
            other => Err(format!("unknown record status: {}", other)),
        }
    }
}

/// A stored work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: RecordId,
    /// Search keyword that produced this URL
    pub query: String,
    /// The URL, unique across the store
    pub link: String,
    pub title: String,
    pub site_filter: Option<String>,
    pub status: RecordStatus,
    /// Blob store path of the raw HTML
    pub html_storage_path: Option<String>,
}

/// A work item that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub query: String,
    pub link: String,
    pub title: String,
    pub site_filter: Option<String>,
    pub status: RecordStatus,
    pub html_storage_path: Option<String>,
}

impl NewWorkItem {
    /// Create a pending work item.
    pub fn new(query: impl Into<String>, link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            link: link.into(),
            title: title.into(),
            site_filter: None,
            status: RecordStatus::Pending,
            html_storage_path: None,
        }
    }

    pub fn with_site_filter(mut self, site: impl Into<String>) -> Self {
        self.site_filter = Some(site.into());
        self
    }

    /// Seed the item as already downloaded.
    pub fn downloaded(mut self, html_storage_path: impl Into<String>) -> Self {
        self.status = RecordStatus::Downloaded;
        self.html_storage_path = Some(html_storage_path.into());
        self
    }

    pub(crate) fn into_item(self, id: RecordId) -> WorkItem {
        WorkItem {
            id,
            query: self.query,
            link: self.link,
            title: self.title,
            site_filter: self.site_filter,
            status: self.status,
            html_storage_path: self.html_storage_path,
        }
    }
}
