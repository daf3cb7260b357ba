//! Token counting for prompt budgeting.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::traits::inferrer::TokenCounter;

/// Rough estimate of one token per four characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl HeuristicTokenCounter {
    pub fn estimate(text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

#[async_trait]
impl TokenCounter for HeuristicTokenCounter {
    async fn count_tokens(&self, text: &str) -> usize {
        Self::estimate(text)
    }
}

#[derive(Serialize)]
struct CountRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct CountResponse {
    count: usize,
}

/// Counts tokens with a tokenizer endpoint of the model server.
///
/// Posts `{"input": text}` and reads `{"count": n}`. Any failure falls back to
/// [`HeuristicTokenCounter`], so an unreachable tokenizer never disables
/// truncation.
#[derive(Clone)]
pub struct RemoteTokenCounter {
    client: Client,
    url: String,
}

impl RemoteTokenCounter {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }

    async fn remote_count(&self, text: &str) -> Result<usize, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .json(&CountRequest { input: text })
            .send()
            .await?
            .error_for_status()?;
        let body: CountResponse = response.json().await?;
        Ok(body.count)
    }
}

#[async_trait]
impl TokenCounter for RemoteTokenCounter {
    async fn count_tokens(&self, text: &str) -> usize {
        match self.remote_count(text).await {
            Ok(count) => count,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Token count failed, using estimate");
                HeuristicTokenCounter::estimate(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(HeuristicTokenCounter::estimate(""), 0);
        assert_eq!(HeuristicTokenCounter::estimate("abcd"), 1);
        assert_eq!(HeuristicTokenCounter::estimate("abcde"), 2);
        // Counts characters, not bytes
        assert_eq!(HeuristicTokenCounter::estimate("ééééé"), 2);
    }

    #[tokio::test]
    async fn test_unreachable_tokenizer_falls_back() {
        let counter = RemoteTokenCounter::new("http://127.0.0.1:9/tokenize/count");
        assert_eq!(counter.count_tokens("abcdefgh").await, 2);
    }
}
