use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::FileRecord;
use super::stats::ScanStatistics;

/// Everything needed to restore a scan's results later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub files: Vec<FileRecord>,
    pub stats: ScanStatistics,
    #[serde(with = "super::os_path")]
    pub root_path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

impl ScanSnapshot {
    pub fn new(files: Vec<FileRecord>, stats: ScanStatistics, root_path: PathBuf) -> Self {
        Self {
            files,
            stats,
            root_path,
            captured_at: Utc::now(),
        }
    }
}
