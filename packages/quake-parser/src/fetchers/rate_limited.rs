//! Rate-limited fetcher wrapper.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::fetcher::HtmlFetcher;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Wraps any fetcher so it issues at most N requests per second.
pub struct RateLimitedFetcher<F: HtmlFetcher> {
    inner: F,
    limiter: Arc<DefaultRateLimiter>,
}

impl<F: HtmlFetcher> RateLimitedFetcher<F> {
    /// A zero rate is treated as one request per second.
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(fetcher, Quota::per_second(rate))
    }

    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Get a reference to the inner fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: HtmlFetcher> HtmlFetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }
}
