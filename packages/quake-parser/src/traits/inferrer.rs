//! Schema inference boundary.
//!
//! The inferrer is a black box: HTML plus a title in, a proposed
//! [`PageSchema`] out. Budgeting the prompt, timeouts and retry policy live on
//! the caller's side (see [`SchemaInference`](crate::inference::SchemaInference)).

use async_trait::async_trait;

use crate::error::InferenceResult;
use crate::inference::prompt::build_schema_prompt;
use crate::types::PageSchema;

/// Proposes extraction rules for a page.
#[async_trait]
pub trait SchemaInferrer: Send + Sync {
    /// Infer a schema for `domain` from one of its pages.
    ///
    /// The returned schema is unsaved (`id` is `None`).
    async fn infer(&self, html: &str, title: &str, domain: &str) -> InferenceResult<PageSchema>;

    /// The prompt this inferrer would send for `html`.
    ///
    /// Used to estimate the request size before calling `infer`.
    fn render_prompt(&self, html: &str, title: &str) -> String {
        build_schema_prompt(html, title)
    }
}

/// Estimates how many model tokens a text costs.
#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Implementations never fail: they fall back to an estimate.
    async fn count_tokens(&self, text: &str) -> usize;
}
