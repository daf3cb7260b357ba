//! End-to-end flow: keywords to parsed content.
//!
//! Search hits are queued, fetched into the blob store, then parsed with a
//! schema inferred once per domain.

use std::sync::Arc;

use quake_parser::{
    download_pending,
    pipeline::html_blob_path,
    search_and_enqueue,
    testing::{MockFetcher, MockInferrer, MockSearcher},
    ContentStore, MemoryBlobStore, MemoryStore, PageSchema, Pipeline, PipelineConfig,
    PipelineDeps, PipelineStore, RecordStatus, RecordStore, SchemaInference, SearchHit,
    SearchRequest,
};
use tokio_util::sync::CancellationToken;

fn page(headline: &str, date: &str) -> String {
    format!(
        r#"<html><body>
            <article>
              <h1>{headline}</h1>
              <div class="content"><p>Shaking was reported across the region.</p></div>
              <time>{date}</time>
            </article>
            <footer>Subscribe</footer>
        </body></html>"#
    )
}

fn searcher() -> MockSearcher {
    MockSearcher::new()
        .with_hits(
            "earthquake Turkey",
            vec![
                SearchHit::new("earthquake Turkey", "https://news.example.com/tr", "Turkey"),
                SearchHit::new("earthquake Turkey", "https://wire.example.org/tr", "Wire"),
            ],
        )
        .with_hits(
            "earthquake Chile",
            vec![
                SearchHit::new("earthquake Chile", "https://news.example.com/cl", "Chile"),
                SearchHit::new("earthquake Chile", "https://news.example.com/tr", "Dup"),
                SearchHit::new("earthquake Chile", "https://gone.example.net/cl", "Gone"),
            ],
        )
}

fn fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_page(
            "https://news.example.com/tr",
            page("Quake in Turkey", "Published: February 6, 2023"),
        )
        .with_page(
            "https://news.example.com/cl",
            page("Quake in Chile", "2024-07-19T10:00:00Z"),
        )
        .with_page(
            "https://wire.example.org/tr",
            page("Wire report", "6 Feb 2023"),
        )
}

async fn run_flow<S: PipelineStore + 'static>(store: Arc<S>) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let inferrer = Arc::new(MockInferrer::new().with_schema(
        PageSchema::new("template")
            .with_selectors(["article h1", "article div.content p"])
            .with_date_selector("article time"),
    ));
    let cancel = CancellationToken::new();

    // Search
    let searcher = searcher();
    let request = SearchRequest::new(["earthquake Turkey", "earthquake Chile"]);
    let search = search_and_enqueue(&searcher, store.as_ref(), &request)
        .await
        .unwrap();
    assert_eq!(search.found, 5);
    assert_eq!(search.new, 4);
    assert_eq!(search.skipped, 1);

    // Download
    let download = download_pending(&fetcher(), blobs.as_ref(), store.as_ref(), 100, &cancel)
        .await
        .unwrap();
    assert_eq!(download.downloaded, 3);
    assert_eq!(download.failed, 1);

    // Parse
    let pipeline = Pipeline::new(
        PipelineDeps::new(
            store.clone(),
            blobs.clone(),
            SchemaInference::new(inferrer.clone()),
        ),
        PipelineConfig::default(),
    );
    let batch = pipeline.process_downloaded(&cancel).await.unwrap();
    assert_eq!(batch.total, 3);
    assert_eq!(batch.successful, 3);

    // One inference per domain
    assert_eq!(inferrer.calls_for("news.example.com"), 1);
    assert_eq!(inferrer.calls_for("wire.example.org"), 1);
    assert_eq!(inferrer.call_count(), 2);

    let counts = pipeline.statistics().await.unwrap();
    assert_eq!(counts.total, 4);
    assert_eq!(counts.parsed, 3);
    assert_eq!(counts.failed, 1);

    let parsed = store
        .list_by_status(RecordStatus::Parsed, None)
        .await
        .unwrap();
    let mut dates = Vec::new();
    for item in &parsed {
        assert_eq!(item.html_storage_path.as_deref(), Some(html_blob_path(item.id).as_str()));
        let content = store.content_for_record(item.id).await.unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].main_text.len(), 2);
        assert_eq!(
            content[0].main_text[1],
            "Shaking was reported across the region."
        );
        dates.push(content[0].date.clone().unwrap());
    }
    dates.sort();
    assert_eq!(dates, vec!["2023-02-06", "2023-02-06", "2024-07-19"]);

    // A second run finds nothing left to do
    let again = pipeline.process_downloaded(&cancel).await.unwrap();
    assert_eq!(again.total, 0);
    assert_eq!(inferrer.call_count(), 2);
}

#[tokio::test]
async fn test_search_download_parse_with_memory_store() {
    run_flow(Arc::new(MemoryStore::new())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_search_download_parse_with_sqlite_store() {
    let store = quake_parser::SqliteStore::in_memory().await.unwrap();
    run_flow(Arc::new(store)).await;
}
