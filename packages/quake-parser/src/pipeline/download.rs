//! Fetch pending work items into the blob store.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::traits::blob::BlobStore;
use crate::traits::fetcher::HtmlFetcher;
use crate::traits::store::RecordStore;
use crate::types::{DownloadStats, RecordId, RecordStatus};

/// Blob path of a record's raw HTML.
pub fn html_blob_path(id: RecordId) -> String {
    format!("html/{}.html", id)
}

/// Download up to `limit` pending records.
///
/// Each page is stored at [`html_blob_path`] and the record moves to
/// `downloaded`. A fetch, upload or status-write failure counts that record
/// as failed and the batch moves on. Records not started when `cancel`
/// fires stay `pending`.
pub async fn download_pending(
    fetcher: &dyn HtmlFetcher,
    blobs: &dyn BlobStore,
    records: &dyn RecordStore,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<DownloadStats> {
    let items = records
        .list_by_status(RecordStatus::Pending, Some(limit))
        .await?;
    let mut stats = DownloadStats {
        total: items.len(),
        ..Default::default()
    };

    for item in items {
        if cancel.is_cancelled() {
            info!("Download cancelled");
            break;
        }

        let html = match fetcher.fetch(&item.link).await {
            Ok(html) => html,
            Err(e) => {
                warn!(record_id = %item.id, url = %item.link, error = %e, "Fetch failed");
                mark_failed(records, item.id).await;
                stats.failed += 1;
                continue;
            }
        };

        let path = html_blob_path(item.id);
        let stored = match blobs.upload(&path, html.as_bytes(), "text/html").await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(record_id = %item.id, error = %e, "Failed to store HTML");
                mark_failed(records, item.id).await;
                stats.failed += 1;
                continue;
            }
        };

        match records.mark_downloaded(item.id, &stored).await {
            Ok(_) => stats.downloaded += 1,
            Err(e) => {
                warn!(record_id = %item.id, error = %e, "Failed to mark record downloaded");
                mark_failed(records, item.id).await;
                stats.failed += 1;
            }
        }
    }

    info!(
        total = stats.total,
        downloaded = stats.downloaded,
        failed = stats.failed,
        "Download finished"
    );
    Ok(stats)
}

/// Best effort: a record whose status cannot be written stays `pending`
/// and is retried on the next run.
async fn mark_failed(records: &dyn RecordStore, id: RecordId) {
    if let Err(e) = records.update_status(id, RecordStatus::Failed).await {
        warn!(record_id = %id, error = %e, "Failed to mark record failed");
    }
}
