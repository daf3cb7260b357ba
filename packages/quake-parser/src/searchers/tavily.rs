//! Tavily-backed keyword search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ParserError, Result};
use crate::security::SecretString;
use crate::traits::searcher::{scoped_query, SearchHit, Searcher};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

/// Keyword search through Tavily's search API.
pub struct TavilySearcher {
    api_key: SecretString,
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct Request<'a> {
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<&'a str>,
}

#[derive(Deserialize)]
struct Response {
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    url: String,
    title: Option<String>,
}

impl TavilySearcher {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            endpoint: TAVILY_API_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// True when `link` is hosted on `site` or one of its subdomains.
pub(crate) fn on_site(link: &str, site: &str) -> bool {
    let site = site.trim().trim_start_matches("www.").to_lowercase();
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .is_some_and(|host| {
            let host = host.trim_start_matches("www.");
            host == site || host.ends_with(&format!(".{}", site))
        })
}

#[async_trait]
impl Searcher for TavilySearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let scoped = scoped_query(query, site_filter);
        let request = Request {
            query: &scoped,
            search_depth: "basic",
            max_results,
            include_domains: site_filter.into_iter().collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&request)
            .send()
            .await
            .map_err(|e| ParserError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(ParserError::Search(
                format!("Tavily API error: {}", response.status()).into(),
            ));
        }

        let body: Response = response
            .json()
            .await
            .map_err(|e| ParserError::Search(Box::new(e)))?;

        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .filter(|r| site_filter.map_or(true, |site| on_site(&r.url, site)))
            .take(max_results)
            .map(|r| {
                let title = r.title.unwrap_or_else(|| r.url.clone());
                SearchHit::new(query, r.url, title)
            })
            .collect();

        debug!(query = %query, hits = hits.len(), "Tavily search finished");
        Ok(hits)
    }
}
