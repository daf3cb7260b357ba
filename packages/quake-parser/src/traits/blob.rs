//! Blob storage for raw HTML.

use async_trait::async_trait;

use crate::error::Result;

/// Opaque byte storage addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, replacing any previous blob.
    ///
    /// Returns the path the blob can be read back from.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    /// Read a blob. `None` when nothing is stored at `path`.
    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Read a blob as UTF-8 text, replacing invalid sequences.
    async fn download_text(&self, path: &str) -> Result<Option<String>> {
        Ok(self
            .download(path)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}
