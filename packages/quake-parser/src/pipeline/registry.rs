//! Schema lookups with "not found / not saved" answers.
//!
//! The store traits report failures as errors. The orchestrator only needs to
//! know whether it has a schema, so this layer logs store errors and folds
//! them into `None` or `false`.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::traits::store::SchemaStore;
use crate::types::{PageSchema, SchemaId};

/// Schema access for the orchestrator.
#[derive(Clone)]
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self { store }
    }

    /// The stored schema for `domain`, or `None` when absent or unreadable.
    pub async fn get_by_domain(&self, domain: &str) -> Option<PageSchema> {
        match self.store.get_by_domain(domain).await {
            Ok(schema) => {
                debug!(domain = %domain, found = schema.is_some(), "Schema lookup");
                schema
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "Schema lookup failed");
                None
            }
        }
    }

    /// Upsert by domain. `None` means the schema could not be persisted.
    pub async fn save(&self, schema: &PageSchema) -> Option<SchemaId> {
        match self.store.upsert(schema).await {
            Ok(id) => {
                debug!(domain = %schema.domain, schema_id = %id, "Schema saved");
                Some(id)
            }
            Err(e) => {
                warn!(domain = %schema.domain, error = %e, "Schema save failed");
                None
            }
        }
    }

    pub async fn delete(&self, id: SchemaId) -> bool {
        self.store.delete(id).await.unwrap_or_else(|e| {
            warn!(schema_id = %id, error = %e, "Schema delete failed");
            false
        })
    }

    pub async fn exists(&self, domain: &str) -> bool {
        self.store.exists(domain).await.unwrap_or_else(|e| {
            warn!(domain = %domain, error = %e, "Schema existence check failed");
            false
        })
    }
}
