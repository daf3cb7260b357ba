pub mod content;
pub mod record;
pub mod schema;
pub mod stats;

pub use content::{ContentId, ExtractionResult, NewParsedContent, ParsedContent};
pub use record::{NewWorkItem, RecordId, RecordStatus, WorkItem};
pub use schema::{PageSchema, SchemaId};
pub use stats::{BatchStats, DownloadStats, SearchStats, StatusCounts};
