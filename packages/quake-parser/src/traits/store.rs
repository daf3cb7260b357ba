//! Storage traits for schemas, work items and parsed content.
//!
//! The storage layer is split into focused traits:
//! - `SchemaStore`: learned extraction rules keyed by domain
//! - `RecordStore`: status-tracked work items
//! - `ContentStore`: persisted extraction outcomes
//! - `PipelineStore`: composite trait combining all three
//!
//! Implementations report failures as `Err`. Turning those into the
//! "not found / could not persist" answers the pipeline acts on is the job of
//! [`SchemaRegistry`](crate::pipeline::SchemaRegistry) and the orchestrator.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ContentId, NewParsedContent, NewWorkItem, PageSchema, ParsedContent, RecordId, RecordStatus,
    SchemaId, StatusCounts, WorkItem,
};

/// Store of page schemas, at most one per domain.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Exact, case-sensitive lookup by domain.
    async fn get_by_domain(&self, domain: &str) -> Result<Option<PageSchema>>;

    /// Insert or update the schema for `schema.domain`.
    ///
    /// When a row exists for the domain its selectors and `is_valid` are
    /// replaced in place and its id is returned; otherwise a new row is
    /// created. Must be atomic for concurrent writers of the same domain.
    async fn upsert(&self, schema: &PageSchema) -> Result<SchemaId>;

    /// Delete a schema by id. Returns false if it did not exist.
    async fn delete(&self, id: SchemaId) -> Result<bool>;

    /// Check whether a schema exists for the domain.
    async fn exists(&self, domain: &str) -> Result<bool> {
        Ok(self.get_by_domain(domain).await?.is_some())
    }
}

/// Store of status-tracked work items.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert work items. Links already present are skipped.
    ///
    /// Returns the ids of the rows actually inserted.
    async fn insert_items(&self, items: &[NewWorkItem]) -> Result<Vec<RecordId>>;

    /// Get a work item by id.
    async fn get_item(&self, id: RecordId) -> Result<Option<WorkItem>>;

    /// Check whether a link is already tracked.
    async fn link_exists(&self, link: &str) -> Result<bool>;

    /// List work items with the given status, oldest first.
    async fn list_by_status(
        &self,
        status: RecordStatus,
        limit: Option<usize>,
    ) -> Result<Vec<WorkItem>>;

    /// Set the status of a work item.
    ///
    /// Returns the updated row, or `None` if the id is unknown.
    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<Option<WorkItem>>;

    /// Record the stored HTML path and move the item to `downloaded`.
    async fn mark_downloaded(&self, id: RecordId, html_storage_path: &str)
        -> Result<Option<WorkItem>>;

    /// Count work items per status.
    async fn count_by_status(&self) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for status in RecordStatus::ALL {
            let n = self.list_by_status(status, None).await?.len();
            counts.add(status, n);
        }
        Ok(counts)
    }
}

/// Store of parsed content rows. Rows are written once and never updated.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a parsed content row.
    async fn insert_content(&self, content: &NewParsedContent) -> Result<ContentId>;

    /// All content rows produced for a work item.
    async fn content_for_record(&self, id: RecordId) -> Result<Vec<ParsedContent>>;
}

/// Composite storage trait used by the pipeline.
pub trait PipelineStore: SchemaStore + RecordStore + ContentStore {}

// Blanket implementation: anything implementing all three traits is a PipelineStore
impl<T: SchemaStore + RecordStore + ContentStore> PipelineStore for T {}
