//! Blob stores for raw HTML.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use crate::error::{ParserError, Result};
use crate::traits::blob::BlobStore;

/// Blobs as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob path under the root, rejecting anything that escapes it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(ParserError::storage(format!("Invalid blob path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ParserError::storage)?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(ParserError::storage)?;
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ParserError::storage(e)),
        }
    }
}

/// In-memory blob store for testing.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly.
    pub fn insert(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.blobs
            .write()
            .unwrap()
            .insert(path.into(), (contents.into(), "text/html".to_string()));
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.blobs.read().unwrap().get(path).map(|(_, ct)| ct.clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        self.blobs
            .write()
            .unwrap()
            .insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().unwrap().get(path).map(|(b, _)| b.clone()))
    }
}
