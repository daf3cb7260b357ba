//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the parser library
//! without making real model, network or database calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult, InferenceError, InferenceResult, ParserError, Result};
use crate::stores::MemoryStore;
use crate::traits::{
    fetcher::HtmlFetcher,
    inferrer::SchemaInferrer,
    searcher::{SearchHit, Searcher},
    store::{ContentStore, RecordStore, SchemaStore},
};
use crate::types::{
    ContentId, NewParsedContent, NewWorkItem, PageSchema, ParsedContent, RecordId, RecordStatus,
    SchemaId, StatusCounts, WorkItem,
};

/// Record of a call made to the mock inferrer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockInferCall {
    pub domain: String,
    pub title: String,
    pub html_len: usize,
}

/// A mock schema inferrer.
///
/// Answers come from, in order:
/// 1. the per-domain script (one entry consumed per call, `None` = failure)
/// 2. the failure switch
/// 3. the default schema, re-keyed to the requested domain
/// 4. an empty valid schema
pub struct MockInferrer {
    default: Option<PageSchema>,
    scripted: Mutex<HashMap<String, VecDeque<Option<PageSchema>>>>,
    fail: bool,
    delay: Option<Duration>,
    calls: RwLock<Vec<MockInferCall>>,
}

impl Default for MockInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInferrer {
    pub fn new() -> Self {
        Self {
            default: None,
            scripted: Mutex::new(HashMap::new()),
            fail: false,
            delay: None,
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Answer every unscripted call with this schema.
    pub fn with_schema(mut self, schema: PageSchema) -> Self {
        self.default = Some(schema);
        self
    }

    /// Queue answers for one domain.
    pub fn with_responses(
        self,
        domain: impl Into<String>,
        responses: impl IntoIterator<Item = Option<PageSchema>>,
    ) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(domain.into())
            .or_default()
            .extend(responses);
        self
    }

    /// Fail every unscripted call.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MockInferCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn calls_for(&self, domain: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.domain == domain)
            .count()
    }

    /// Length of the HTML passed in the most recent call.
    pub fn last_html_len(&self) -> Option<usize> {
        self.calls.read().unwrap().last().map(|c| c.html_len)
    }
}

#[async_trait]
impl SchemaInferrer for MockInferrer {
    async fn infer(&self, html: &str, title: &str, domain: &str) -> InferenceResult<PageSchema> {
        self.calls.write().unwrap().push(MockInferCall {
            domain: domain.to_string(),
            title: title.to_string(),
            html_len: html.len(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(domain)
            .and_then(|queue| queue.pop_front());

        let schema = match scripted {
            Some(Some(schema)) => schema,
            Some(None) => return Err(scripted_failure()),
            None if self.fail => return Err(scripted_failure()),
            None => self
                .default
                .clone()
                .unwrap_or_else(|| PageSchema::new(domain)),
        };

        Ok(PageSchema {
            domain: domain.to_string(),
            id: None,
            created_at: None,
            updated_at: None,
            ..schema
        })
    }
}

fn scripted_failure() -> InferenceError {
    InferenceError::Api {
        status: 503,
        body: "mock inference failure".to_string(),
    }
}

/// A mock HTML fetcher serving fixed pages. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    calls: RwLock<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl HtmlFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.write().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// A mock search provider with canned hits per query.
#[derive(Default)]
pub struct MockSearcher {
    hits: HashMap<String, Vec<SearchHit>>,
    failures: HashSet<String>,
    calls: RwLock<Vec<(String, Option<String>)>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(query.into(), hits);
        self
    }

    /// Make searches for `query` fail.
    pub fn with_failure(mut self, query: impl Into<String>) -> Self {
        self.failures.insert(query.into());
        self
    }

    /// Every `(query, site_filter)` searched so far.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        self.calls
            .write()
            .unwrap()
            .push((query.to_string(), site_filter.map(str::to_string)));

        if self.failures.contains(query) {
            return Err(ParserError::Search("mock search failure".into()));
        }

        Ok(self
            .hits
            .get(query)
            .map(|hits| hits.iter().take(max_results).cloned().collect())
            .unwrap_or_default())
    }
}

/// A [`MemoryStore`] that fails selected operations.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    schema_reads: bool,
    schema_writes: bool,
    content_writes: bool,
    status_writes: bool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// `get_by_domain` and `exists` fail.
    pub fn fail_schema_reads(mut self) -> Self {
        self.schema_reads = true;
        self
    }

    /// `upsert` and `delete` fail.
    pub fn fail_schema_writes(mut self) -> Self {
        self.schema_writes = true;
        self
    }

    /// `insert_content` fails.
    pub fn fail_content_writes(mut self) -> Self {
        self.content_writes = true;
        self
    }

    /// `update_status` and `mark_downloaded` fail.
    pub fn fail_status_writes(mut self) -> Self {
        self.status_writes = true;
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

fn injected() -> ParserError {
    ParserError::storage("injected store failure")
}

#[async_trait]
impl SchemaStore for FailingStore {
    async fn get_by_domain(&self, domain: &str) -> Result<Option<PageSchema>> {
        if self.schema_reads {
            return Err(injected());
        }
        self.inner.get_by_domain(domain).await
    }

    async fn upsert(&self, schema: &PageSchema) -> Result<SchemaId> {
        if self.schema_writes {
            return Err(injected());
        }
        self.inner.upsert(schema).await
    }

    async fn delete(&self, id: SchemaId) -> Result<bool> {
        if self.schema_writes {
            return Err(injected());
        }
        self.inner.delete(id).await
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn insert_items(&self, items: &[NewWorkItem]) -> Result<Vec<RecordId>> {
        self.inner.insert_items(items).await
    }

    async fn get_item(&self, id: RecordId) -> Result<Option<WorkItem>> {
        self.inner.get_item(id).await
    }

    async fn link_exists(&self, link: &str) -> Result<bool> {
        self.inner.link_exists(link).await
    }

    async fn list_by_status(
        &self,
        status: RecordStatus,
        limit: Option<usize>,
    ) -> Result<Vec<WorkItem>> {
        self.inner.list_by_status(status, limit).await
    }

    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<Option<WorkItem>> {
        if self.status_writes {
            return Err(injected());
        }
        self.inner.update_status(id, status).await
    }

    async fn mark_downloaded(
        &self,
        id: RecordId,
        html_storage_path: &str,
    ) -> Result<Option<WorkItem>> {
        if self.status_writes {
            return Err(injected());
        }
        self.inner.mark_downloaded(id, html_storage_path).await
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        self.inner.count_by_status().await
    }
}

#[async_trait]
impl ContentStore for FailingStore {
    async fn insert_content(&self, content: &NewParsedContent) -> Result<ContentId> {
        if self.content_writes {
            return Err(injected());
        }
        self.inner.insert_content(content).await
    }

    async fn content_for_record(&self, id: RecordId) -> Result<Vec<ParsedContent>> {
        self.inner.content_for_record(id).await
    }
}
