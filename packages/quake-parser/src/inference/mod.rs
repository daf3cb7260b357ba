//! Schema inference boundary.
//!
//! [`SchemaInference`] is what the pipeline calls. It owns everything on this
//! side of the model call:
//! - trimming the page to the prompt budget
//! - bounding the call with a timeout
//! - turning every failure into `None`
//!
//! It never retries. Retry policy belongs to the orchestrator.

pub mod budget;
pub mod openai;
pub mod prompt;
pub mod tokens;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::traits::inferrer::{SchemaInferrer, TokenCounter};
use crate::types::PageSchema;

pub use budget::PromptBudget;
pub use openai::OpenAiInferrer;
pub use prompt::{build_schema_prompt, parse_schema_response};
pub use tokens::{HeuristicTokenCounter, RemoteTokenCounter};

/// Budgeted, time-bounded access to a [`SchemaInferrer`].
#[derive(Clone)]
pub struct SchemaInference {
    inferrer: Arc<dyn SchemaInferrer>,
    counter: Arc<dyn TokenCounter>,
    budget: PromptBudget,
    timeout: Duration,
}

impl SchemaInference {
    /// Wrap an inferrer with the default budget, the character heuristic
    /// and a two-minute timeout.
    pub fn new(inferrer: Arc<dyn SchemaInferrer>) -> Self {
        Self {
            inferrer,
            counter: Arc::new(HeuristicTokenCounter),
            budget: PromptBudget::default(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_budget(mut self, budget: PromptBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn budget(&self) -> &PromptBudget {
        &self.budget
    }

    /// Infer a schema for `domain` from one page.
    ///
    /// `None` on transport failure, unparseable reply or timeout.
    pub async fn infer(&self, html: &str, title: &str, domain: &str) -> Option<PageSchema> {
        let html = self
            .budget
            .fit(html, title, self.inferrer.as_ref(), self.counter.as_ref())
            .await;

        match tokio::time::timeout(self.timeout, self.inferrer.infer(html, title, domain)).await {
            Ok(Ok(schema)) => {
                info!(
                    domain = %domain,
                    selectors = schema.main_text_selectors.len(),
                    has_date = schema.date_selector.is_some(),
                    is_valid = schema.is_valid,
                    "Schema inferred"
                );
                Some(schema)
            }
            Ok(Err(e)) => {
                warn!(domain = %domain, error = %e, "Schema inference failed");
                None
            }
            Err(_) => {
                warn!(
                    domain = %domain,
                    timeout_secs = self.timeout.as_secs(),
                    "Schema inference timed out"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockInferrer;

    #[tokio::test]
    async fn test_failure_becomes_none_without_retry() {
        let mock = Arc::new(MockInferrer::new().failing());
        let inference = SchemaInference::new(mock.clone());

        assert!(inference.infer("<p>x</p>", "t", "a.example.com").await.is_none());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_inferrer_times_out() {
        let mock = Arc::new(
            MockInferrer::new()
                .with_schema(PageSchema::new("a.example.com").with_selectors(["p"]))
                .with_delay(Duration::from_millis(200)),
        );
        let inference = SchemaInference::new(mock).with_timeout(Duration::from_millis(20));

        assert!(inference.infer("<p>x</p>", "t", "a.example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_page_is_truncated_before_the_call() {
        let mock = Arc::new(MockInferrer::new());
        let inference = SchemaInference::new(mock.clone()).with_budget(PromptBudget::new(1_000));
        let html = "<p>tremor</p>".repeat(2_000);

        inference.infer(&html, "t", "a.example.com").await;

        let seen = mock.last_html_len().unwrap();
        assert!(seen < html.len());
        assert!(HeuristicTokenCounter::estimate(&build_schema_prompt(&html[..seen], "t")) < 1_000);
    }
}
