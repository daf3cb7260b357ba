//! Pipeline stages.
//!
//! - [`search_and_enqueue`]: keywords to `pending` work items
//! - [`download_pending`]: `pending` to `downloaded` (HTML in the blob store)
//! - [`Pipeline::process_downloaded`]: `downloaded` to `parsed` or `failed`

pub mod download;
pub mod locks;
pub mod orchestrator;
pub mod registry;
pub mod search;

pub use download::{download_pending, html_blob_path};
pub use locks::DomainLocks;
pub use orchestrator::{domain_of, FailureReason, Pipeline, PipelineDeps, RecordOutcome};
pub use registry::SchemaRegistry;
pub use search::{parse_keywords, search_and_enqueue, SearchRequest};
