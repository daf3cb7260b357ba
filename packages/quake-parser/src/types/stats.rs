//! Aggregate counters returned by the batch operations.

use serde::{Deserialize, Serialize};

use super::record::RecordStatus;

/// Result of one `process_downloaded` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Records loaded for this batch
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Records left untouched because the batch was cancelled
    pub skipped: usize,
}

impl BatchStats {
    pub fn is_complete(&self) -> bool {
        self.successful + self.failed == self.total
    }
}

/// Result of one `search_and_enqueue` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Keywords searched
    pub searched: usize,
    /// Results returned by the provider
    pub found: usize,
    /// Work items inserted
    pub new: usize,
    /// Results already known
    pub skipped: usize,
}

/// Result of one `download_pending` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Work item counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub downloaded: usize,
    pub parsed: usize,
    pub analyzed: usize,
    pub failed: usize,
}

impl StatusCounts {
    /// Count one record with the given status.
    pub fn add(&mut self, status: RecordStatus, n: usize) {
        self.total += n;
        match status {
            RecordStatus::Pending => self.pending += n,
            RecordStatus::Downloaded => self.downloaded += n,
            RecordStatus::Parsed => self.parsed += n,
            RecordStatus::Analyzed => self.analyzed += n,
            RecordStatus::Failed => self.failed += n,
        }
    }

    pub fn get(&self, status: RecordStatus) -> usize {
        match status {
            RecordStatus::Pending => self.pending,
            RecordStatus::Downloaded => self.downloaded,
            RecordStatus::Parsed => self.parsed,
            RecordStatus::Analyzed => self.analyzed,
            RecordStatus::Failed => self.failed,
        }
    }
}
