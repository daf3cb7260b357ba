//! Schema-Driven Page Extraction Pipeline
//!
//! Turns search results about earthquakes into clean, structured text. Each
//! website gets a CSS-selector schema, inferred once by a language model and
//! reused for every later page from the same domain.
//!
//! # Design Philosophy
//!
//! **"Infer once per domain, extract cheaply forever"**
//!
//! - The model sees a page only when its domain has no working schema
//! - Extraction is plain selector matching, no model in the loop
//! - A schema that stops matching gets exactly one re-inference
//! - Every collaborator is injected behind a trait
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quake_parser::{MemoryStore, Pipeline, PipelineConfig, PipelineDeps, SchemaInference};
//! use quake_parser::stores::MemoryBlobStore;
//! use quake_parser::testing::MockInferrer;
//! use tokio_util::sync::CancellationToken;
//!
//! let store = Arc::new(MemoryStore::new());
//! let inference = SchemaInference::new(Arc::new(MockInferrer::new()));
//! let deps = PipelineDeps::new(store, Arc::new(MemoryBlobStore::new()), inference);
//!
//! let pipeline = Pipeline::new(deps, PipelineConfig::default());
//! let stats = pipeline.process_downloaded(&CancellationToken::new()).await?;
//! ```
//!
//! # Modules
//!
//! - [`extractor`] - Selector extraction and date normalization
//! - [`inference`] - Prompt budget, token counting and the model client
//! - [`pipeline`] - Search, download and the per-record state machine
//! - [`stores`] - Schema, record, content and blob storage
//! - [`fetchers`] - HTML fetchers (HTTP, Firecrawl) and rate limiting
//! - [`searchers`] - Search providers (Tavily)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod config;
pub mod error;
pub mod extractor;
pub mod fetchers;
pub mod inference;
pub mod pipeline;
pub mod searchers;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use config::{AppConfig, FetchStrategy, InferenceConfig, PipelineConfig};
pub use error::{FetchError, InferenceError, ParserError, Result};
pub use extractor::{extract, needs_reinference, normalize_date};
pub use inference::{PromptBudget, SchemaInference};
pub use pipeline::{
    download_pending, search_and_enqueue, FailureReason, Pipeline, PipelineDeps, RecordOutcome,
    SchemaRegistry, SearchRequest,
};
pub use stores::{FsBlobStore, MemoryBlobStore, MemoryStore};
pub use traits::{
    blob::BlobStore,
    fetcher::HtmlFetcher,
    inferrer::{SchemaInferrer, TokenCounter},
    searcher::{SearchHit, Searcher},
    store::{ContentStore, PipelineStore, RecordStore, SchemaStore},
};
pub use types::{
    BatchStats, DownloadStats, ExtractionResult, NewParsedContent, NewWorkItem, PageSchema,
    ParsedContent, RecordId, RecordStatus, SchemaId, SearchStats, StatusCounts, WorkItem,
};

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
