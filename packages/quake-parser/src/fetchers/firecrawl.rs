//! Firecrawl rendering fetcher.
//!
//! Firecrawl renders the page in a remote browser, so JavaScript-built
//! article bodies are present in the returned HTML.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::security::SecretString;
use crate::traits::fetcher::HtmlFetcher;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Fetches fully rendered HTML through the Firecrawl scrape API.
pub struct FirecrawlFetcher {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(rename = "rawHtml")]
    raw_html: Option<String>,
}

impl FirecrawlFetcher {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
        }
    }

    /// Point at a self-hosted Firecrawl instance.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl HtmlFetcher for FirecrawlFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        debug!(url = %url, "Firecrawl scrape starting");
        let request = ScrapeRequest {
            url,
            formats: vec!["rawHtml"],
        };

        let response = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Firecrawl request failed");
                FetchError::Http(Box::new(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, error = %body, "Firecrawl API error");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        if !body.success {
            return Err(FetchError::Service(
                body.error.unwrap_or_else(|| "scrape failed".to_string()),
            ));
        }

        body.data
            .and_then(|d| d.raw_html)
            .filter(|html| !html.trim().is_empty())
            .ok_or_else(|| FetchError::Empty {
                url: url.to_string(),
            })
    }
}
