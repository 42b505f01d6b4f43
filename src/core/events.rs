use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::models::scan_result::ScanState;

#[derive(Debug, Clone)]
pub enum Event {
    // Scan progress
    Progress {
        percent: f64,
        files_seen: u64,
        records: u64,
        current_path: PathBuf,
        status: String,
    },

    // Scan state
    ScanStarted { root: PathBuf },
    ScanPaused,
    ScanResumed,
    ScanFinished { state: ScanState, total_files: u64, duration_ms: u64 },
    ScanIssue { path: PathBuf, error: String },

    // Recovery
    RecoveryProgress { completed: usize, total: usize },
    RecoveryFinished { succeeded: usize, failed: usize },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
