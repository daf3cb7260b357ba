//! Keyword search into pending work items.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::Result;
use crate::traits::searcher::Searcher;
use crate::traits::store::RecordStore;
use crate::types::{NewWorkItem, SearchStats};

/// One search run.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub keywords: Vec<String>,
    /// Results requested per keyword. Default: 10.
    pub max_results: usize,
    pub site_filter: Option<String>,
    /// Skip links already in the store. Default: true.
    pub skip_existing: bool,
}

impl SearchRequest {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            max_results: 10,
            site_filter: None,
            skip_existing: true,
        }
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_site_filter(mut self, site: impl Into<String>) -> Self {
        self.site_filter = Some(site.into());
        self
    }

    pub fn with_skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }
}

/// Search every keyword and store new links as `pending` work items.
///
/// A keyword whose search fails is logged and contributes no results. Links
/// seen twice in one run are queued once.
pub async fn search_and_enqueue(
    searcher: &dyn Searcher,
    records: &dyn RecordStore,
    request: &SearchRequest,
) -> Result<SearchStats> {
    let mut stats = SearchStats::default();
    let mut seen = HashSet::new();
    let mut queued = Vec::new();
    let site = request.site_filter.as_deref();

    for keyword in &request.keywords {
        stats.searched += 1;

        let hits = match searcher.search(keyword, request.max_results, site).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query = %keyword, error = %e, "Search failed");
                continue;
            }
        };
        stats.found += hits.len();

        for hit in hits {
            if !seen.insert(hit.link.clone()) {
                stats.skipped += 1;
                continue;
            }
            if request.skip_existing && records.link_exists(&hit.link).await? {
                stats.skipped += 1;
                continue;
            }

            let mut item = NewWorkItem::new(hit.query, hit.link, hit.title);
            item.site_filter = request.site_filter.clone();
            queued.push(item);
        }
    }

    if !queued.is_empty() {
        let inserted = records.insert_items(&queued).await?;
        stats.new = inserted.len();
        // The store drops links it already has
        stats.skipped += queued.len() - inserted.len();
    }

    info!(
        searched = stats.searched,
        found = stats.found,
        new = stats.new,
        skipped = stats.skipped,
        "Search finished"
    );
    Ok(stats)
}

/// Keywords from a text file body: one per line, blank lines and `#`
/// comments dropped.
pub fn parse_keywords(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
