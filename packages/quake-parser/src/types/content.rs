//! Extraction outcomes, transient and persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::record::RecordId;
use super::schema::SchemaId;

/// Unique identifier for a parsed content row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub Uuid);

impl ContentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ContentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Output of one extraction attempt. Never persisted directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Text fragments in selector order, then document order
    pub main_text: Vec<String>,

    /// Calendar date, `YYYY-MM-DD`
    pub date: Option<String>,

    /// True iff at least one text fragment was extracted
    pub success: bool,

    pub error: Option<String>,
}

impl ExtractionResult {
    /// Build a result, deriving `success` from the fragments.
    pub fn new(main_text: Vec<String>, date: Option<String>) -> Self {
        let success = !main_text.is_empty();
        Self {
            main_text,
            date,
            success,
            error: None,
        }
    }

    /// An attempt that produced nothing.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            main_text: Vec::new(),
            date: None,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Persisted extraction outcome for one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedContent {
    pub id: ContentId,
    /// Lookup key of the originating work item
    pub search_result_id: RecordId,
    pub url: String,
    pub main_text: Vec<String>,
    pub date: Option<String>,
    pub schema_id: SchemaId,
    pub parsed_at: DateTime<Utc>,
}

/// Parsed content that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParsedContent {
    pub search_result_id: RecordId,
    pub url: String,
    pub main_text: Vec<String>,
    pub date: Option<String>,
    pub schema_id: SchemaId,
}

impl NewParsedContent {
    pub(crate) fn into_content(self, id: ContentId, parsed_at: DateTime<Utc>) -> ParsedContent {
        ParsedContent {
            id,
            search_result_id: self.search_result_id,
            url: self.url,
            main_text: self.main_text,
            date: self.date,
            schema_id: self.schema_id,
            parsed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_alone_is_not_success() {
        let result = ExtractionResult::new(vec![], Some("2024-03-03".into()));
        assert!(!result.success);

        let result = ExtractionResult::new(vec!["Magnitude 6.1".into()], None);
        assert!(result.success);
    }
}
