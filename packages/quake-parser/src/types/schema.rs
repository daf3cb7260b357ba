//! Learned per-domain extraction rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a stored page schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub Uuid);

impl SchemaId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SchemaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Extraction rule for every page of one domain.
///
/// `id`, `created_at` and `updated_at` are owned by the store: they are `None`
/// on a schema fresh out of inference and populated once it has been saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSchema {
    /// Site identifier (URL host), the unique key
    pub domain: String,

    /// Selectors for body text, applied in order
    #[serde(default)]
    pub main_text_selectors: Vec<String>,

    /// Selector for the publication date
    pub date_selector: Option<String>,

    /// Whether pages from this domain are on-topic
    pub is_valid: bool,

    #[serde(default)]
    pub id: Option<SchemaId>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageSchema {
    /// Create an unsaved schema for a domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            main_text_selectors: Vec::new(),
            date_selector: None,
            is_valid: true,
            id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the main text selectors.
    pub fn with_selectors(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.main_text_selectors = selectors.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set the date selector.
    pub fn with_date_selector(mut self, selector: impl Into<String>) -> Self {
        self.date_selector = Some(selector.into());
        self
    }

    /// Mark the domain as off-topic.
    pub fn invalid(mut self) -> Self {
        self.is_valid = false;
        self
    }

    /// True when both schemas would extract the same thing.
    ///
    /// Ignores store-managed fields.
    pub fn same_rules(&self, other: &PageSchema) -> bool {
        self.domain == other.domain
            && self.main_text_selectors == other.main_text_selectors
            && self.date_selector == other.date_selector
            && self.is_valid == other.is_valid
    }
}
