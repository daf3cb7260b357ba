//! Storage implementations.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage (always available)
//! - `SqliteStore` - SQLite file-based storage (requires `sqlite` feature)
//! - `FsBlobStore` / `MemoryBlobStore` - raw HTML blobs

pub mod blob;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use blob::{FsBlobStore, MemoryBlobStore};
pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
