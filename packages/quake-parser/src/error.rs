//! Typed errors for the parser library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only the binary
//! reaches for `anyhow`, and only for fatal startup failures.

use thiserror::Error;

/// Errors that can occur inside the pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Storage operation failed (record store, schema store, blob store)
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Schema inference failed
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    /// HTML fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Search provider failed
    #[error("search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Missing or malformed configuration
    #[error("config error: {0}")]
    Config(String),

    /// URL could not be parsed or has no host
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// A bounded step ran past its deadline
    #[error("timed out: {step}")]
    Timeout { step: &'static str },

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ParserError {
    /// Wrap any error as a storage error.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(err.into())
    }
}

/// Errors raised at the schema-inference boundary.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Transport failure talking to the model endpoint
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The endpoint answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The model reply contained no JSON object
    #[error("no JSON object in model response")]
    MissingJson,

    /// The JSON object did not have the expected shape
    #[error("malformed schema response: {0}")]
    Parse(String),

    /// The model reply was empty
    #[error("empty model response")]
    EmptyResponse,
}

/// Errors raised while fetching raw HTML.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Remote rendering service reported a failure
    #[error("render service error: {0}")]
    Service(String),

    /// The response body was empty
    #[error("empty body for {url}")]
    Empty { url: String },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Result type alias for inference operations.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
