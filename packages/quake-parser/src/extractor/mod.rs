//! Selector-based extraction.
//!
//! Applies a [`PageSchema`] to an HTML document:
//! - every main text selector is applied in list order, and its matches are
//!   visited in document order; each match contributes its trimmed visible text
//! - the first match of the date selector is run through the fuzzy date parser
//!
//! Nothing in here fails hard. A broken selector or an unparseable date only
//! removes that field's contribution and is logged.

pub mod dates;

use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{ExtractionResult, PageSchema};

pub use dates::{normalize_date, parse_fuzzy_date};

/// Elements whose text is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extract main text and date from `html` using `schema`.
pub fn extract(html: &str, schema: &PageSchema) -> ExtractionResult {
    let document = Html::parse_document(html);

    let main_text = extract_main_text(&document, &schema.main_text_selectors);
    let date = schema
        .date_selector
        .as_deref()
        .and_then(|selector| extract_date(&document, selector));

    debug!(
        domain = %schema.domain,
        fragments = main_text.len(),
        date = ?date,
        "Extraction finished"
    );

    ExtractionResult::new(main_text, date)
}

/// Run [`extract`] off the async runtime with a deadline.
///
/// Parsing a large document is CPU-bound; a run past `timeout` is reported as
/// a failed extraction instead of stalling the caller.
pub async fn extract_bounded(html: String, schema: PageSchema, timeout: Duration) -> ExtractionResult {
    let task = tokio::task::spawn_blocking(move || extract(&html, &schema));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(error = %e, "Extraction task aborted");
            ExtractionResult::failed(format!("extraction task aborted: {}", e))
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Extraction timed out");
            ExtractionResult::failed("extraction timed out")
        }
    }
}

/// Whether a result is too poor to keep and the schema should be re-inferred.
///
/// Same rule as `ExtractionResult::success`: no main text means failure, a
/// missing date alone does not.
pub fn needs_reinference(result: &ExtractionResult) -> bool {
    !result.success
}

fn extract_main_text(document: &Html, selectors: &[String]) -> Vec<String> {
    let mut texts = Vec::new();

    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(selector = %raw, error = %e, "Skipping unparseable selector");
                continue;
            }
        };

        let before = texts.len();
        texts.extend(
            document
                .select(&selector)
                .map(visible_text)
                .filter(|text| !text.is_empty()),
        );
        debug!(selector = %raw, hits = texts.len() - before, "Applied selector");
    }

    texts
}

fn extract_date(document: &Html, raw: &str) -> Option<String> {
    let selector = match Selector::parse(raw) {
        Ok(s) => s,
        Err(e) => {
            warn!(selector = %raw, error = %e, "Unparseable date selector");
            return None;
        }
    };

    let element = document.select(&selector).next()?;
    let text = visible_text(element);
    if text.is_empty() {
        return None;
    }

    let date = normalize_date(&text);
    if date.is_none() {
        warn!(text = %text, "Failed to parse date");
    }
    date
}

/// Trimmed visible text of an element, internal whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html>
          <head><title>Quake</title><script>var tracking = "noise";</script></head>
          <body>
            <aside class="note">Magnitude 7.8 recorded near the border.</aside>
            <article>
              <p class="lead">  The ground shook for nearly   two minutes. </p>
              <p class="lead"></p>
              <p class="lead">Aftershocks continued <b>through the night</b>.</p>
            </article>
            <footer><span class="date">Published: March 3, 2024</span></footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_selector_order_then_document_order() {
        let schema = PageSchema::new("news.example.com")
            .with_selectors(["p.lead", "aside.note"])
            .with_date_selector("span.date");

        let result = extract(ARTICLE, &schema);

        assert_eq!(
            result.main_text,
            vec![
                "The ground shook for nearly two minutes.",
                "Aftershocks continued through the night.",
                "Magnitude 7.8 recorded near the border.",
            ]
        );
        assert_eq!(result.date.as_deref(), Some("2024-03-03"));
        assert!(result.success);
    }

    #[test]
    fn test_overlapping_selectors_are_not_deduplicated() {
        let schema = PageSchema::new("news.example.com").with_selectors(["aside", ".note"]);

        let result = extract(ARTICLE, &schema);

        assert_eq!(result.main_text.len(), 2);
        assert_eq!(result.main_text[0], result.main_text[1]);
    }

    #[test]
    fn test_empty_schema_yields_failure() {
        let schema = PageSchema::new("news.example.com");

        let result = extract(ARTICLE, &schema);

        assert!(result.main_text.is_empty());
        assert!(result.date.is_none());
        assert!(!result.success);
        assert!(needs_reinference(&result));
    }

    #[test]
    fn test_broken_selector_does_not_abort_the_rest() {
        let schema = PageSchema::new("news.example.com").with_selectors(["p[[", "aside.note"]);

        let result = extract(ARTICLE, &schema);

        assert_eq!(result.main_text, vec!["Magnitude 7.8 recorded near the border."]);
    }

    #[test]
    fn test_missing_date_is_not_a_failure() {
        let schema = PageSchema::new("news.example.com")
            .with_selectors(["aside.note"])
            .with_date_selector("time.published");

        let result = extract(ARTICLE, &schema);

        assert!(result.date.is_none());
        assert!(result.success);
        assert!(!needs_reinference(&result));
    }

    #[test]
    fn test_unparseable_date_is_dropped() {
        let schema = PageSchema::new("news.example.com")
            .with_selectors(["aside.note"])
            .with_date_selector("article p.lead");

        let result = extract(ARTICLE, &schema);

        assert!(result.date.is_none());
    }

    #[test]
    fn test_date_only_result_needs_reinference() {
        let schema = PageSchema::new("news.example.com")
            .with_selectors(["div.missing"])
            .with_date_selector("span.date");

        let result = extract(ARTICLE, &schema);

        assert_eq!(result.date.as_deref(), Some("2024-03-03"));
        assert!(needs_reinference(&result));
    }

    #[test]
    fn test_hidden_text_is_skipped() {
        let html = "<div class='body'>Shaking <script>evil()</script>felt <style>p{}</style>widely</div>";
        let schema = PageSchema::new("a.example.com").with_selectors(["div.body"]);

        let result = extract(html, &schema);

        assert_eq!(result.main_text, vec!["Shaking felt widely"]);
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let schema = PageSchema::new("a.example.com").with_selectors(["p"]);

        let result = extract("<p>Unclosed <div><p>tags", &schema);

        assert!(result.success);
    }

    #[tokio::test]
    async fn test_extract_bounded_matches_sync_result() {
        let schema = PageSchema::new("news.example.com").with_selectors(["aside.note"]);

        let result =
            extract_bounded(ARTICLE.to_string(), schema.clone(), Duration::from_secs(5)).await;

        assert_eq!(result, extract(ARTICLE, &schema));
    }
}
