//! Raw HTML fetching.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Fetches the raw HTML of a URL.
///
/// # Implementations
///
/// - `HttpFetcher` - plain HTTP GET
/// - `FirecrawlFetcher` - remote browser rendering for JavaScript-heavy sites
/// - `MockFetcher` - for testing
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}
