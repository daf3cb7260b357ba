//! Quake Parser
//!
//! Runs one pass of the pipeline: optional keyword search, download of
//! pending pages, then schema-driven parsing of everything downloaded.
//! Ctrl-C stops between records; unfinished records keep their status.

use std::sync::Arc;

use anyhow::{Context, Result};
use quake_parser::fetchers::build_fetcher;
use quake_parser::inference::{HeuristicTokenCounter, OpenAiInferrer, RemoteTokenCounter};
use quake_parser::pipeline::parse_keywords;
use quake_parser::searchers::TavilySearcher;
use quake_parser::traits::inferrer::TokenCounter;
use quake_parser::{
    download_pending, search_and_enqueue, AppConfig, FsBlobStore, Pipeline, PipelineDeps,
    SchemaInference, SearchRequest, SqliteStore,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quake_parser=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting quake parser");

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        model = %config.inference.model,
        base_url = %config.inference.base_url,
        openai_api_key = %config.openai_api_key.masked(),
        tavily_api_key = %config
            .tavily_api_key
            .as_ref()
            .map_or_else(|| "NOT SET".to_string(), |k| k.masked()),
        "Configuration loaded"
    );

    // Storage
    let store = Arc::new(
        SqliteStore::new(&config.database_url)
            .await
            .context("Failed to open database")?,
    );
    let blobs = Arc::new(FsBlobStore::new(config.blob_root.clone()));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight records");
            on_signal.cancel();
        }
    });

    // Search stage, only when both a provider key and keywords are configured
    match (&config.tavily_api_key, &config.keywords_file) {
        (Some(api_key), Some(path)) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read keywords from {}", path.display()))?;
            let mut request = SearchRequest::new(parse_keywords(&text))
                .with_max_results(config.search_max_results);
            if let Some(site) = &config.search_site_filter {
                request = request.with_site_filter(site.clone());
            }

            let searcher = TavilySearcher::new(api_key.clone());
            let stats = search_and_enqueue(&searcher, store.as_ref(), &request)
                .await
                .context("Search stage failed")?;
            tracing::info!(new = stats.new, skipped = stats.skipped, "Search stage done");
        }
        (None, Some(_)) => tracing::warn!("KEYWORDS_FILE set without TAVILY_API_KEY, skipping search"),
        _ => tracing::debug!("No keywords configured, skipping search"),
    }

    // Download stage
    let fetcher = build_fetcher(&config.fetch, config.fetch_rate_limit);
    let stats = download_pending(
        fetcher.as_ref(),
        blobs.as_ref(),
        store.as_ref(),
        config.pipeline.batch_limit,
        &cancel,
    )
    .await
    .context("Download stage failed")?;
    tracing::info!(
        downloaded = stats.downloaded,
        failed = stats.failed,
        "Download stage done"
    );

    // Parse stage
    let inferrer = OpenAiInferrer::new(config.openai_api_key.clone())
        .with_base_url(config.inference.base_url.clone())
        .with_model(config.inference.model.clone());
    let counter: Arc<dyn TokenCounter> = match &config.inference.tokenizer_url {
        Some(url) => Arc::new(RemoteTokenCounter::new(url.clone())),
        None => Arc::new(HeuristicTokenCounter),
    };
    let inference = SchemaInference::new(Arc::new(inferrer))
        .with_counter(counter)
        .with_budget(config.inference.budget());

    let pipeline = Pipeline::new(
        PipelineDeps::new(store.clone(), blobs, inference),
        config.pipeline.clone(),
    );
    let batch = pipeline
        .process_downloaded(&cancel)
        .await
        .context("Parse stage failed")?;
    tracing::info!(
        total = batch.total,
        successful = batch.successful,
        failed = batch.failed,
        skipped = batch.skipped,
        "Parse stage done"
    );

    let counts = pipeline
        .statistics()
        .await
        .context("Failed to read statistics")?;
    tracing::info!(
        total = counts.total,
        pending = counts.pending,
        downloaded = counts.downloaded,
        parsed = counts.parsed,
        failed = counts.failed,
        "Record statistics"
    );

    Ok(())
}
