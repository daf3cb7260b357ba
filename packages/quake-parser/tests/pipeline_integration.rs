//! Integration tests for the record processing pipeline.
//!
//! These drive `downloaded` work items through the public API:
//! 1. Resolve the domain schema (stored or inferred)
//! 2. Extract main text and date
//! 3. Re-infer once when extraction comes back empty
//! 4. Persist content and move the record to its final status

use std::sync::Arc;
use std::time::Duration;

use quake_parser::{
    inference::PromptBudget,
    testing::{FailingStore, MockInferrer},
    ContentStore, FailureReason, MemoryBlobStore, MemoryStore, NewWorkItem, PageSchema, Pipeline,
    PipelineConfig, PipelineDeps, PipelineStore, RecordId, RecordOutcome, RecordStatus,
    RecordStore, SchemaInference, SchemaStore,
};
use tokio_util::sync::CancellationToken;

const ARTICLE: &str = r#"
<html>
  <head><title>Quake</title><script>var x = "not text";</script></head>
  <body>
    <nav><a href="/">Home</a></nav>
    <h1>Magnitude 6.1 quake strikes coast</h1>
    <div class="body">
      <p>Residents felt strong shaking.</p>
      <p>No tsunami warning was issued.</p>
    </div>
    <span class="published">Published: March 3, 2024</span>
  </body>
</html>
"#;

fn article_schema(domain: &str) -> PageSchema {
    PageSchema::new(domain)
        .with_selectors(["h1", "div.body p"])
        .with_date_selector("span.published")
}

fn broken_schema(domain: &str) -> PageSchema {
    PageSchema::new(domain).with_selectors(["div.does-not-exist"])
}

/// Helper to build a pipeline over shared in-memory stores.
struct Harness<S> {
    store: Arc<S>,
    blobs: Arc<MemoryBlobStore>,
    inferrer: Arc<MockInferrer>,
    pipeline: Pipeline,
}

fn harness(inferrer: MockInferrer) -> Harness<MemoryStore> {
    harness_with(MemoryStore::new(), inferrer, PipelineConfig::default())
}

fn harness_with<S: PipelineStore + 'static>(
    store: S,
    inferrer: MockInferrer,
    config: PipelineConfig,
) -> Harness<S> {
    let store = Arc::new(store);
    let blobs = Arc::new(MemoryBlobStore::new());
    let inferrer = Arc::new(inferrer);
    let inference = SchemaInference::new(inferrer.clone());
    let pipeline = Pipeline::new(
        PipelineDeps::new(store.clone(), blobs.clone(), inference),
        config,
    );

    Harness {
        store,
        blobs,
        inferrer,
        pipeline,
    }
}

/// Helper to seed a downloaded record whose HTML is in the blob store.
async fn seed<S: PipelineStore>(harness: &Harness<S>, link: &str, html: &str) -> RecordId {
    let path = format!("html/{}.html", uuid::Uuid::new_v4());
    harness.blobs.insert(path.clone(), html);

    let ids = harness
        .store
        .insert_items(&[NewWorkItem::new("earthquake", link, "Quake").downloaded(path)])
        .await
        .unwrap();
    ids[0]
}

async fn status_of<S: PipelineStore>(harness: &Harness<S>, id: RecordId) -> RecordStatus {
    harness.store.get_item(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_stored_schema_extracts_without_inference() {
    let h = harness(MockInferrer::new());
    h.store
        .upsert(&article_schema("news.example.com"))
        .await
        .unwrap();
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.successful, 1);
    assert_eq!(h.inferrer.call_count(), 0);
    assert_eq!(status_of(&h, id).await, RecordStatus::Parsed);

    let content = h.store.content_for_record(id).await.unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(
        content[0].main_text,
        vec![
            "Magnitude 6.1 quake strikes coast",
            "Residents felt strong shaking.",
            "No tsunami warning was issued.",
        ]
    );
    assert_eq!(content[0].date.as_deref(), Some("2024-03-03"));
    assert_eq!(content[0].url, "https://news.example.com/quake");
}

#[tokio::test]
async fn test_new_domain_is_inferred_once_and_reused() {
    let h = harness(MockInferrer::new().with_schema(article_schema("template")));
    let first = seed(&h, "https://news.example.com/a", ARTICLE).await;
    let second = seed(&h, "https://news.example.com/b", ARTICLE).await;

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.successful, 2);
    assert_eq!(h.inferrer.calls_for("news.example.com"), 1);
    assert_eq!(h.store.schema_count(), 1);

    let stored = h
        .store
        .get_by_domain("news.example.com")
        .await
        .unwrap()
        .unwrap();
    let a = h.store.content_for_record(first).await.unwrap();
    let b = h.store.content_for_record(second).await.unwrap();
    assert_eq!(Some(a[0].schema_id), stored.id);
    assert_eq!(a[0].schema_id, b[0].schema_id);
}

#[tokio::test]
async fn test_empty_extraction_triggers_one_reinference() {
    let h = harness(
        MockInferrer::new().with_responses("news.example.com", [Some(article_schema("x"))]),
    );
    h.store
        .upsert(&broken_schema("news.example.com"))
        .await
        .unwrap();
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let item = h.store.get_item(id).await.unwrap().unwrap();
    let outcome = h.pipeline.process_record(&item, false).await;

    assert!(matches!(
        outcome,
        RecordOutcome::Parsed {
            reinferred: true,
            ..
        }
    ));
    assert_eq!(h.inferrer.call_count(), 1);

    // The corrected schema replaced the broken one in place
    let stored = h
        .store
        .get_by_domain("news.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.main_text_selectors, vec!["h1", "div.body p"]);
    assert_eq!(h.store.schema_count(), 1);
}

#[tokio::test]
async fn test_retry_is_bounded_to_two_inference_calls() {
    // Every inferred schema matches nothing
    let h = harness(MockInferrer::new().with_schema(broken_schema("x")));
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let item = h.store.get_item(id).await.unwrap().unwrap();
    let outcome = h.pipeline.process_record(&item, false).await;

    assert_eq!(outcome, RecordOutcome::Failed(FailureReason::NoContent));
    assert_eq!(h.inferrer.call_count(), 2);
    assert_eq!(status_of(&h, id).await, RecordStatus::Failed);
    assert!(h.store.content_for_record(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_off_topic_schema_short_circuits() {
    let h = harness(MockInferrer::new().with_schema(article_schema("x").invalid()));
    let first = seed(&h, "https://shop.example.com/item", ARTICLE).await;
    let second = seed(&h, "https://shop.example.com/other", ARTICLE).await;

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.failed, 2);
    // The invalid verdict is stored and reused
    assert_eq!(h.inferrer.call_count(), 1);
    for id in [first, second] {
        assert_eq!(status_of(&h, id).await, RecordStatus::Failed);
        assert!(h.store.content_for_record(id).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_correction_leaves_other_domains_alone() {
    let h = harness(
        MockInferrer::new().with_responses("a.example.com", [Some(article_schema("x"))]),
    );
    h.store.upsert(&broken_schema("a.example.com")).await.unwrap();
    let b_schema = PageSchema::new("b.example.com").with_selectors(["div.body p"]);
    h.store.upsert(&b_schema).await.unwrap();
    seed(&h, "https://a.example.com/quake", ARTICLE).await;
    seed(&h, "https://b.example.com/quake", ARTICLE).await;

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.successful, 2);
    assert_eq!(h.inferrer.calls_for("a.example.com"), 1);
    assert_eq!(h.inferrer.calls_for("b.example.com"), 0);

    let b = h.store.get_by_domain("b.example.com").await.unwrap().unwrap();
    assert!(b.same_rules(&b_schema));
}

#[tokio::test]
async fn test_concurrent_records_share_one_inference_per_domain() {
    let h = harness_with(
        MemoryStore::new(),
        MockInferrer::new()
            .with_schema(article_schema("x"))
            .with_delay(Duration::from_millis(50)),
        PipelineConfig::default().with_concurrency(4),
    );
    for n in 0..4 {
        seed(&h, &format!("https://news.example.com/{}", n), ARTICLE).await;
    }
    seed(&h, "https://other.example.com/1", ARTICLE).await;

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.successful, 5);
    assert!(stats.is_complete());
    assert_eq!(h.inferrer.calls_for("news.example.com"), 1);
    assert_eq!(h.inferrer.calls_for("other.example.com"), 1);
    assert_eq!(h.store.schema_count(), 2);
}

#[tokio::test]
async fn test_cancelled_batch_leaves_records_downloaded() {
    let h = harness(MockInferrer::new().with_schema(article_schema("x")));
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = h.pipeline.process_downloaded(&cancel).await.unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(h.inferrer.call_count(), 0);
    assert_eq!(status_of(&h, id).await, RecordStatus::Downloaded);
}

#[tokio::test]
async fn test_missing_html_fails_record() {
    let h = harness(MockInferrer::new());
    let ids = h
        .store
        .insert_items(&[NewWorkItem::new("earthquake", "https://news.example.com/x", "X")
            .downloaded("html/never-written.html")])
        .await
        .unwrap();

    let outcome = h.pipeline.process_record_by_id(ids[0], false).await.unwrap();

    assert_eq!(outcome, Some(RecordOutcome::Failed(FailureReason::MissingHtml)));
    assert_eq!(status_of(&h, ids[0]).await, RecordStatus::Failed);
    assert_eq!(h.inferrer.call_count(), 0);
}

#[tokio::test]
async fn test_inference_failure_fails_record() {
    let h = harness(MockInferrer::new().failing());
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let outcome = h.pipeline.process_record_by_id(id, false).await.unwrap();

    assert_eq!(outcome, Some(RecordOutcome::Failed(FailureReason::InferenceFailed)));
    assert_eq!(status_of(&h, id).await, RecordStatus::Failed);
    assert_eq!(h.store.schema_count(), 0);
}

#[tokio::test]
async fn test_content_write_failure_fails_record() {
    let h = harness_with(
        FailingStore::new(MemoryStore::new()).fail_content_writes(),
        MockInferrer::new().with_schema(article_schema("x")),
        PipelineConfig::default(),
    );
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let outcome = h.pipeline.process_record_by_id(id, false).await.unwrap();

    assert_eq!(outcome, Some(RecordOutcome::Failed(FailureReason::PersistFailed)));
    assert_eq!(status_of(&h, id).await, RecordStatus::Failed);
    assert_eq!(h.store.inner().content_count(), 0);
}

#[tokio::test]
async fn test_status_write_failure_keeps_one_content_row_across_runs() {
    let h = harness_with(
        FailingStore::new(MemoryStore::new()).fail_status_writes(),
        MockInferrer::new().with_schema(article_schema("x")),
        PipelineConfig::default(),
    );
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let first = h.pipeline.process_record_by_id(id, false).await.unwrap();
    let second = h.pipeline.process_record_by_id(id, false).await.unwrap();

    assert_eq!(first, Some(RecordOutcome::Failed(FailureReason::StatusNotUpdated)));
    assert_eq!(second, Some(RecordOutcome::Failed(FailureReason::StatusNotUpdated)));
    assert_eq!(status_of(&h, id).await, RecordStatus::Downloaded);
    assert_eq!(h.store.inner().content_count(), 1);
    assert_eq!(h.store.content_for_record(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_schema_write_failure_fails_record() {
    let h = harness_with(
        FailingStore::new(MemoryStore::new()).fail_schema_writes(),
        MockInferrer::new().with_schema(article_schema("x")),
        PipelineConfig::default(),
    );
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let outcome = h.pipeline.process_record_by_id(id, false).await.unwrap();

    assert_eq!(outcome, Some(RecordOutcome::Failed(FailureReason::SchemaNotSaved)));
}

#[tokio::test]
async fn test_invalid_link_fails_record() {
    let h = harness(MockInferrer::new());
    let id = seed(&h, "not a url", ARTICLE).await;

    let outcome = h.pipeline.process_record_by_id(id, false).await.unwrap();

    assert_eq!(outcome, Some(RecordOutcome::Failed(FailureReason::InvalidUrl)));
}

#[tokio::test]
async fn test_only_downloaded_records_are_processed() {
    let h = harness(MockInferrer::new().with_schema(article_schema("x")));
    let id = seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let first = h.pipeline.process_record_by_id(id, false).await.unwrap();
    assert!(first.is_some_and(|o| o.is_parsed()));

    let again = h.pipeline.process_record_by_id(id, false).await.unwrap();
    assert_eq!(again, Some(RecordOutcome::Ignored(RecordStatus::Parsed)));
    assert_eq!(h.store.content_for_record(id).await.unwrap().len(), 1);

    let unknown = h
        .pipeline
        .process_record_by_id(RecordId::new(), false)
        .await
        .unwrap();
    assert_eq!(unknown, None);
}

#[tokio::test]
async fn test_force_reinfers_stored_schema() {
    let h = harness_with(
        MemoryStore::new(),
        MockInferrer::new().with_schema(article_schema("x")),
        PipelineConfig::default().with_force_reinfer(true),
    );
    let stored_id = h
        .store
        .upsert(&article_schema("news.example.com"))
        .await
        .unwrap();
    seed(&h, "https://news.example.com/quake", ARTICLE).await;

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.successful, 1);
    assert_eq!(h.inferrer.call_count(), 1);
    // Upsert keeps the domain's identity
    let stored = h
        .store
        .get_by_domain("news.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, Some(stored_id));
}

#[tokio::test]
async fn test_oversized_page_is_truncated_before_inference() {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let inferrer = Arc::new(MockInferrer::new().with_schema(article_schema("x")));
    let inference =
        SchemaInference::new(inferrer.clone()).with_budget(PromptBudget::new(1_000));
    let pipeline = Pipeline::new(
        PipelineDeps::new(store.clone(), blobs.clone(), inference),
        PipelineConfig::default(),
    );

    let filler = "<p>aftershock report</p>".repeat(1_000);
    let html = ARTICLE.replace("</body>", &format!("{}</body>", filler));
    blobs.insert("html/big.html", html.as_str());
    store
        .insert_items(&[NewWorkItem::new("earthquake", "https://news.example.com/big", "Big")
            .downloaded("html/big.html")])
        .await
        .unwrap();

    let stats = pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    // Extraction still sees the whole page
    assert_eq!(stats.successful, 1);
    let sent = inferrer.last_html_len().unwrap();
    assert!(sent > 0);
    assert!(sent < html.len());
    assert!(sent <= 4_000);
}

#[tokio::test]
async fn test_statistics_reflect_batch_outcomes() {
    let h = harness(
        MockInferrer::new()
            .with_schema(article_schema("x"))
            .with_responses("bad.example.com", [None]),
    );
    seed(&h, "https://news.example.com/1", ARTICLE).await;
    seed(&h, "https://news.example.com/2", ARTICLE).await;
    seed(&h, "https://bad.example.com/1", ARTICLE).await;
    h.store
        .insert_items(&[NewWorkItem::new("earthquake", "https://news.example.com/3", "P")])
        .await
        .unwrap();

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);

    let counts = h.pipeline.statistics().await.unwrap();
    assert_eq!(counts.total, 4);
    assert_eq!(counts.parsed, 2);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.downloaded, 0);
}

#[tokio::test]
async fn test_batch_limit_caps_records_loaded() {
    let h = harness_with(
        MemoryStore::new(),
        MockInferrer::new().with_schema(article_schema("x")),
        PipelineConfig::default().with_batch_limit(2),
    );
    for n in 0..3 {
        seed(&h, &format!("https://news.example.com/{}", n), ARTICLE).await;
    }

    let stats = h
        .pipeline
        .process_downloaded(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(h.pipeline.statistics().await.unwrap().downloaded, 1);
}
