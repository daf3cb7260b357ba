//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::Result;
use crate::traits::store::{ContentStore, RecordStore, SchemaStore};
use crate::types::{
    ContentId, NewParsedContent, NewWorkItem, PageSchema, ParsedContent, RecordId, RecordStatus,
    SchemaId, StatusCounts, WorkItem,
};

/// In-memory storage for schemas, work items and parsed content.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    schemas: RwLock<HashMap<String, PageSchema>>,
    /// Insertion order doubles as age order
    records: RwLock<Vec<WorkItem>>,
    contents: RwLock<Vec<ParsedContent>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            records: RwLock::new(Vec::new()),
            contents: RwLock::new(Vec::new()),
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.schemas.write().unwrap().clear();
        self.records.write().unwrap().clear();
        self.contents.write().unwrap().clear();
    }

    /// Get the number of stored schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.read().unwrap().len()
    }

    /// Get the number of stored work items.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Get the number of stored content rows.
    pub fn content_count(&self) -> usize {
        self.contents.read().unwrap().len()
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn get_by_domain(&self, domain: &str) -> Result<Option<PageSchema>> {
        Ok(self.schemas.read().unwrap().get(domain).cloned())
    }

    async fn upsert(&self, schema: &PageSchema) -> Result<SchemaId> {
        // Lookup and write happen under one write guard
        let mut schemas = self.schemas.write().unwrap();
        let now = Utc::now();

        if let Some(existing) = schemas.get_mut(&schema.domain) {
            existing.main_text_selectors = schema.main_text_selectors.clone();
            existing.date_selector = schema.date_selector.clone();
            existing.is_valid = schema.is_valid;
            existing.updated_at = Some(now);
            if let Some(id) = existing.id {
                return Ok(id);
            }
        }

        let id = SchemaId::new();
        let mut stored = schema.clone();
        stored.id = Some(id);
        stored.created_at = Some(now);
        stored.updated_at = Some(now);
        schemas.insert(schema.domain.clone(), stored);
        Ok(id)
    }

    async fn delete(&self, id: SchemaId) -> Result<bool> {
        let mut schemas = self.schemas.write().unwrap();
        let domain = schemas
            .iter()
            .find(|(_, s)| s.id == Some(id))
            .map(|(domain, _)| domain.clone());

        Ok(match domain {
            Some(domain) => schemas.remove(&domain).is_some(),
            None => false,
        })
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_items(&self, items: &[NewWorkItem]) -> Result<Vec<RecordId>> {
        let mut records = self.records.write().unwrap();
        let mut links: HashSet<String> = records.iter().map(|r| r.link.clone()).collect();
        let mut ids = Vec::new();

        for item in items {
            if !links.insert(item.link.clone()) {
                continue;
            }
            let id = RecordId::new();
            records.push(item.clone().into_item(id));
            ids.push(id);
        }

        Ok(ids)
    }

    async fn get_item(&self, id: RecordId) -> Result<Option<WorkItem>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn link_exists(&self, link: &str) -> Result<bool> {
        Ok(self.records.read().unwrap().iter().any(|r| r.link == link))
    }

    async fn list_by_status(
        &self,
        status: RecordStatus,
        limit: Option<usize>,
    ) -> Result<Vec<WorkItem>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.status == status)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<Option<WorkItem>> {
        let mut records = self.records.write().unwrap();
        Ok(records.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.clone()
        }))
    }

    async fn mark_downloaded(
        &self,
        id: RecordId,
        html_storage_path: &str,
    ) -> Result<Option<WorkItem>> {
        let mut records = self.records.write().unwrap();
        Ok(records.iter_mut().find(|r| r.id == id).map(|r| {
            r.html_storage_path = Some(html_storage_path.to_string());
            r.status = RecordStatus::Downloaded;
            r.clone()
        }))
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for record in self.records.read().unwrap().iter() {
            counts.add(record.status, 1);
        }
        Ok(counts)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_content(&self, content: &NewParsedContent) -> Result<ContentId> {
        let id = ContentId::new();
        self.contents
            .write()
            .unwrap()
            .push(content.clone().into_content(id, Utc::now()));
        Ok(id)
    }

    async fn content_for_record(&self, id: RecordId) -> Result<Vec<ParsedContent>> {
        Ok(self
            .contents
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.search_result_id == id)
            .cloned()
            .collect())
    }
}
