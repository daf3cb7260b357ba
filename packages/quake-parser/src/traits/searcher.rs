//! Keyword search provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Keyword that produced this hit
    pub query: String,
    pub link: String,
    pub title: String,
}

impl SearchHit {
    pub fn new(query: impl Into<String>, link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            link: link.into(),
            title: title.into(),
        }
    }
}

/// Keyword search returning candidate URLs.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Search for `query`, optionally restricted to one site.
    ///
    /// Implementations must drop hits outside `site_filter` and return at
    /// most `max_results` hits.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>>;
}

/// Build the provider query for a keyword and optional site filter.
pub fn scoped_query(query: &str, site_filter: Option<&str>) -> String {
    match site_filter {
        Some(site) => format!("site:{} {}", site, query),
        None => query.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_query() {
        assert_eq!(scoped_query("earthquake", None), "earthquake");
        assert_eq!(
            scoped_query("earthquake", Some("instagram.com")),
            "site:instagram.com earthquake"
        );
    }
}
