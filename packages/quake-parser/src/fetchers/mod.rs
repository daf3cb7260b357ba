//! HTML fetcher implementations.
//!
//! - `HttpFetcher` - plain GET, no rendering
//! - `FirecrawlFetcher` - rendered HTML from the Firecrawl API
//! - `RateLimitedFetcher` - throttling wrapper for either
//!
//! Which one runs is decided once, from configuration, by [`build_fetcher`].

pub mod firecrawl;
pub mod http;
pub mod rate_limited;

use std::sync::Arc;

use crate::config::FetchStrategy;
use crate::traits::fetcher::HtmlFetcher;

pub use firecrawl::FirecrawlFetcher;
pub use http::HttpFetcher;
pub use rate_limited::RateLimitedFetcher;

/// Build the configured fetcher, throttled to `requests_per_second`.
pub fn build_fetcher(strategy: &FetchStrategy, requests_per_second: u32) -> Arc<dyn HtmlFetcher> {
    match strategy {
        FetchStrategy::Http => Arc::new(RateLimitedFetcher::new(
            HttpFetcher::new(),
            requests_per_second,
        )),
        FetchStrategy::Firecrawl { api_key } => Arc::new(RateLimitedFetcher::new(
            FirecrawlFetcher::new(api_key.clone()),
            requests_per_second,
        )),
    }
}
