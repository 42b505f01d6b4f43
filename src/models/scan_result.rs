use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::stats::ScanStatistics;

/// A per-item failure absorbed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    #[serde(with = "super::os_path")]
    pub path: PathBuf,
    pub kind: ScanIssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanIssueKind {
    PermissionDenied,
    NotFound,
    SymlinkCycle,
    IoError,
}

impl ScanIssueKind {
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanIssueKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ScanIssueKind::NotFound,
            _ => ScanIssueKind::IoError,
        }
    }
}

/// Lifecycle of the scan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Idle,
    Scanning,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl ScanState {
    /// A worker is alive (possibly parked).
    pub fn is_active(self) -> bool {
        matches!(self, ScanState::Scanning | ScanState::Paused)
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Failed
        )
    }
}

/// What a finished (or restored) scan left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub state: ScanState,
    pub stats: ScanStatistics,
    pub record_count: usize,
    pub issue_count: usize,
    pub failure: Option<String>,
}
