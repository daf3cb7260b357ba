//! Record processing state machine.
//!
//! One `downloaded` work item is driven to `parsed` or `failed`:
//!
//! ```text
//! load HTML -> domain -> schema (stored or inferred) -> validity check
//!     -> extract -> [no text: re-infer once, extract again]
//!     -> persist content -> parsed
//! ```
//!
//! Any step that cannot continue marks the record `failed` and stops. The
//! status is written last, so a record interrupted mid-way stays
//! `downloaded`.

use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::locks::DomainLocks;
use super::registry::SchemaRegistry;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extractor::{extract_bounded, needs_reinference};
use crate::inference::SchemaInference;
use crate::traits::blob::BlobStore;
use crate::traits::store::{ContentStore, PipelineStore, RecordStore, SchemaStore};
use crate::types::{
    BatchStats, ContentId, ExtractionResult, NewParsedContent, PageSchema, RecordId, RecordStatus,
    SchemaId, StatusCounts, WorkItem,
};

/// Collaborators of the pipeline.
#[derive(Clone)]
pub struct PipelineDeps {
    pub schemas: Arc<dyn SchemaStore>,
    pub records: Arc<dyn RecordStore>,
    pub contents: Arc<dyn ContentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub inference: SchemaInference,
}

impl PipelineDeps {
    /// Use one store for schemas, records and content.
    pub fn new<S: PipelineStore + 'static>(
        store: Arc<S>,
        blobs: Arc<dyn BlobStore>,
        inference: SchemaInference,
    ) -> Self {
        Self {
            schemas: store.clone(),
            records: store.clone(),
            contents: store,
            blobs,
            inference,
        }
    }
}

/// Why a record ended up `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// No storage path, or the blob is missing or empty
    MissingHtml,
    /// The link has no parseable host
    InvalidUrl,
    /// The inferrer returned nothing
    InferenceFailed,
    /// The inferred schema could not be stored
    SchemaNotSaved,
    /// The domain's schema marks it off-topic
    OffTopic,
    /// No main text, even after re-inference
    NoContent,
    /// The content row could not be stored
    PersistFailed,
    /// The final status write failed
    StatusNotUpdated,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::MissingHtml => "html missing",
            FailureReason::InvalidUrl => "invalid url",
            FailureReason::InferenceFailed => "schema inference failed",
            FailureReason::SchemaNotSaved => "schema not saved",
            FailureReason::OffTopic => "off-topic page",
            FailureReason::NoContent => "no main text extracted",
            FailureReason::PersistFailed => "content not saved",
            FailureReason::StatusNotUpdated => "status not updated",
        };
        f.write_str(s)
    }
}

/// Result of processing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Parsed {
        content_id: ContentId,
        schema_id: SchemaId,
        /// Whether the schema-correction retry was used
        reinferred: bool,
    },
    Failed(FailureReason),
    /// The record was not `downloaded`; nothing was done
    Ignored(RecordStatus),
}

impl RecordOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, RecordOutcome::Parsed { .. })
    }
}

/// The extraction pipeline.
pub struct Pipeline {
    records: Arc<dyn RecordStore>,
    contents: Arc<dyn ContentStore>,
    blobs: Arc<dyn BlobStore>,
    registry: SchemaRegistry,
    inference: SchemaInference,
    locks: DomainLocks,
    config: PipelineConfig,
}

impl Pipeline {
    /// The inference timeout in `config` replaces the one on `deps.inference`.
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        Self {
            records: deps.records,
            contents: deps.contents,
            blobs: deps.blobs,
            registry: SchemaRegistry::new(deps.schemas),
            inference: deps.inference.with_timeout(config.inference_timeout()),
            locks: DomainLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Process up to `batch_limit` downloaded records.
    ///
    /// Per-record failures never abort the batch. Once `cancel` fires, records
    /// not yet started are left `downloaded` and counted as skipped. Only a
    /// failure to list the batch is returned as an error.
    pub async fn process_downloaded(&self, cancel: &CancellationToken) -> Result<BatchStats> {
        let items = self
            .records
            .list_by_status(RecordStatus::Downloaded, Some(self.config.batch_limit))
            .await?;

        let mut stats = BatchStats {
            total: items.len(),
            ..Default::default()
        };
        info!(total = stats.total, concurrency = self.config.concurrency, "Batch starting");

        let force = self.config.force_reinfer;
        let outcomes: Vec<Option<RecordOutcome>> = stream::iter(items)
            .map(|item| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.process_record(&item, force).await)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Some(RecordOutcome::Parsed { .. }) => stats.successful += 1,
                Some(RecordOutcome::Failed(_)) => stats.failed += 1,
                Some(RecordOutcome::Ignored(_)) | None => stats.skipped += 1,
            }
        }

        self.locks.prune();
        info!(
            total = stats.total,
            successful = stats.successful,
            failed = stats.failed,
            skipped = stats.skipped,
            "Batch finished"
        );
        Ok(stats)
    }

    /// Load a record by id and process it.
    pub async fn process_record_by_id(
        &self,
        id: RecordId,
        force: bool,
    ) -> Result<Option<RecordOutcome>> {
        match self.records.get_item(id).await? {
            Some(item) => Ok(Some(self.process_record(&item, force).await)),
            None => Ok(None),
        }
    }

    /// Drive one `downloaded` record to `parsed` or `failed`.
    ///
    /// `force` re-infers the domain's schema even when one is stored.
    pub async fn process_record(&self, item: &WorkItem, force: bool) -> RecordOutcome {
        if !item.status.can_transition_to(RecordStatus::Parsed) {
            debug!(record_id = %item.id, status = %item.status, "Record not downloaded, ignoring");
            return RecordOutcome::Ignored(item.status);
        }

        let Some(html) = self.load_html(item).await else {
            return self.mark_failed(item, FailureReason::MissingHtml).await;
        };

        let Some(domain) = domain_of(&item.link) else {
            return self.mark_failed(item, FailureReason::InvalidUrl).await;
        };

        let schema = match self.resolve_schema(&domain, &html, &item.title, force).await {
            Ok(schema) => schema,
            Err(reason) => return self.mark_failed(item, reason).await,
        };

        if !schema.is_valid {
            info!(record_id = %item.id, domain = %domain, "Domain marked off-topic, skipping");
            return self.mark_failed(item, FailureReason::OffTopic).await;
        }

        let mut schema = schema;
        let mut result = self.extract(&html, &schema).await;
        let mut reinferred = false;

        if needs_reinference(&result) {
            info!(record_id = %item.id, domain = %domain, "No main text, re-inferring schema");
            reinferred = true;

            schema = match self.correct_schema(&domain, &html, &item.title, &schema).await {
                Ok(corrected) => corrected,
                Err(reason) => return self.mark_failed(item, reason).await,
            };
            if !schema.is_valid {
                return self.mark_failed(item, FailureReason::OffTopic).await;
            }

            result = self.extract(&html, &schema).await;
            if needs_reinference(&result) {
                return self.mark_failed(item, FailureReason::NoContent).await;
            }
        }

        let Some(schema_id) = schema.id else {
            return self.mark_failed(item, FailureReason::SchemaNotSaved).await;
        };

        let content = NewParsedContent {
            search_result_id: item.id,
            url: item.link.clone(),
            main_text: result.main_text,
            date: result.date,
            schema_id,
        };
        let content_id = match self.persist_content(&content).await {
            Ok(id) => id,
            Err(e) => {
                warn!(record_id = %item.id, error = %e, "Failed to persist content");
                return self.mark_failed(item, FailureReason::PersistFailed).await;
            }
        };

        match self.records.update_status(item.id, RecordStatus::Parsed).await {
            Ok(Some(_)) => {
                info!(
                    record_id = %item.id,
                    domain = %domain,
                    fragments = content.main_text.len(),
                    reinferred,
                    "Record parsed"
                );
                RecordOutcome::Parsed {
                    content_id,
                    schema_id,
                    reinferred,
                }
            }
            Ok(None) => self.mark_failed(item, FailureReason::StatusNotUpdated).await,
            Err(e) => {
                warn!(record_id = %item.id, error = %e, "Failed to mark record parsed");
                self.mark_failed(item, FailureReason::StatusNotUpdated).await
            }
        }
    }

    /// Store the content row for a record, reusing one left by an earlier
    /// run whose status write failed. Each record owns at most one row.
    async fn persist_content(&self, content: &NewParsedContent) -> Result<ContentId> {
        let existing = self
            .contents
            .content_for_record(content.search_result_id)
            .await?;
        if let Some(row) = existing.first() {
            debug!(
                record_id = %content.search_result_id,
                content_id = %row.id,
                "Reusing content stored by an earlier run"
            );
            return Ok(row.id);
        }
        self.contents.insert_content(content).await
    }

    /// Work item counts per status.
    pub async fn statistics(&self) -> Result<StatusCounts> {
        self.records.count_by_status().await
    }

    async fn load_html(&self, item: &WorkItem) -> Option<String> {
        let Some(path) = item.html_storage_path.as_deref() else {
            warn!(record_id = %item.id, "Record has no stored HTML path");
            return None;
        };

        match self.blobs.download_text(path).await {
            Ok(Some(html)) if !html.trim().is_empty() => Some(html),
            Ok(_) => {
                warn!(record_id = %item.id, path = %path, "Stored HTML missing or empty");
                None
            }
            Err(e) => {
                warn!(record_id = %item.id, path = %path, error = %e, "Failed to load HTML");
                None
            }
        }
    }

    async fn extract(&self, html: &str, schema: &PageSchema) -> ExtractionResult {
        extract_bounded(
            html.to_string(),
            schema.clone(),
            self.config.extraction_timeout(),
        )
        .await
    }

    /// Stored schema for the domain, or a freshly inferred and saved one.
    ///
    /// Runs under the domain lock: a second record for the same domain waits
    /// here and then finds the first one's schema.
    async fn resolve_schema(
        &self,
        domain: &str,
        html: &str,
        title: &str,
        force: bool,
    ) -> std::result::Result<PageSchema, FailureReason> {
        let _guard = self.locks.lock(domain).await;

        if !force {
            if let Some(schema) = self.registry.get_by_domain(domain).await {
                return Ok(schema);
            }
        }

        self.infer_and_save(domain, html, title).await
    }

    /// Replace a schema that extracted nothing.
    ///
    /// If another record already replaced it while this one was extracting,
    /// the stored replacement is used instead of inferring again.
    async fn correct_schema(
        &self,
        domain: &str,
        html: &str,
        title: &str,
        failed: &PageSchema,
    ) -> std::result::Result<PageSchema, FailureReason> {
        let _guard = self.locks.lock(domain).await;

        if let Some(stored) = self.registry.get_by_domain(domain).await {
            if !stored.same_rules(failed) {
                debug!(domain = %domain, "Schema already corrected by another record");
                return Ok(stored);
            }
        }

        self.infer_and_save(domain, html, title).await
    }

    /// Caller must hold the domain lock.
    async fn infer_and_save(
        &self,
        domain: &str,
        html: &str,
        title: &str,
    ) -> std::result::Result<PageSchema, FailureReason> {
        let mut schema = self
            .inference
            .infer(html, title, domain)
            .await
            .ok_or(FailureReason::InferenceFailed)?;

        let id = self
            .registry
            .save(&schema)
            .await
            .ok_or(FailureReason::SchemaNotSaved)?;
        schema.id = Some(id);
        Ok(schema)
    }

    /// Set the record to `failed`. Safe to repeat.
    async fn mark_failed(&self, item: &WorkItem, reason: FailureReason) -> RecordOutcome {
        warn!(record_id = %item.id, url = %item.link, reason = %reason, "Record failed");
        if let Err(e) = self.records.update_status(item.id, RecordStatus::Failed).await {
            warn!(record_id = %item.id, error = %e, "Failed to mark record failed");
        }
        RecordOutcome::Failed(reason)
    }
}

/// Host component of a URL.
pub fn domain_of(link: &str) -> Option<String> {
    Url::parse(link)
        .ok()?
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}
