use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Files seen at which the estimate reaches half of its ceiling.
const HALF_WAY_FILES: f64 = 1000.0;
/// The estimate never reaches 100 before the scan really completes.
const ESTIMATE_CEILING: f64 = 99.0;

pub struct ProgressTracker {
    pub files_seen: AtomicU64,
    pub files_recorded: AtomicU64,
    pub files_skipped: AtomicU64,
    pub dirs_scanned: AtomicU64,
    pub total_size: AtomicU64,
    pub errors_count: AtomicU64,
    /// Percent * 100, only ever raised.
    percent_bp: AtomicU64,
    current_path: Mutex<PathBuf>,
    status: Mutex<String>,
    pub start_time: Instant,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            files_seen: AtomicU64::new(0),
            files_recorded: AtomicU64::new(0),
            files_skipped: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            percent_bp: AtomicU64::new(0),
            current_path: Mutex::new(PathBuf::new()),
            status: Mutex::new(String::from("Ready")),
            start_time: Instant::now(),
        }
    }

    pub fn increment_seen(&self) {
        self.files_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_recorded(&self) -> u64 {
        self.files_recorded.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn increment_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dirs(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_size(&self, size: u64) {
        self.total_size.fetch_add(size, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_current_path(&self, path: PathBuf) {
        *self.current_path.lock().unwrap_or_else(PoisonError::into_inner) = path;
    }

    pub fn current_path(&self) -> PathBuf {
        self.current_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status.into();
    }

    pub fn status(&self) -> String {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raise the percentage estimate from the number of files seen so far.
    pub fn update_estimate(&self) -> f64 {
        let seen = self.files_seen.load(Ordering::Relaxed);
        let estimate = estimate_percent(seen);
        self.raise_percent(estimate)
    }

    /// Mark true completion; the only way to reach 100%.
    pub fn complete(&self) {
        self.percent_bp.store(100 * 100, Ordering::Relaxed);
    }

    pub fn percent(&self) -> f64 {
        self.percent_bp.load(Ordering::Relaxed) as f64 / 100.0
    }

    fn raise_percent(&self, percent: f64) -> f64 {
        let bp = (percent * 100.0).round() as u64;
        let prev = self.percent_bp.fetch_max(bp, Ordering::Relaxed);
        prev.max(bp) as f64 / 100.0
    }

    pub fn files_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < f64::EPSILON {
            return 0.0;
        }
        self.files_seen.load(Ordering::Relaxed) as f64 / elapsed
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_recorded: self.files_recorded.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            total_size: self.total_size.load(Ordering::Relaxed),
            errors_count: self.errors_count.load(Ordering::Relaxed),
            percent: self.percent(),
            status: self.status(),
            current_path: self.current_path(),
            elapsed: self.elapsed(),
            files_per_second: self.files_per_second(),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic in `files_seen`, approaches but never reaches the ceiling.
pub fn estimate_percent(files_seen: u64) -> f64 {
    let n = files_seen as f64;
    ESTIMATE_CEILING * n / (n + HALF_WAY_FILES)
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub files_seen: u64,
    pub files_recorded: u64,
    pub files_skipped: u64,
    pub dirs_scanned: u64,
    pub total_size: u64,
    pub errors_count: u64,
    pub percent: f64,
    pub status: String,
    pub current_path: PathBuf,
    pub elapsed: Duration,
    pub files_per_second: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_monotonic_and_bounded() {
        let mut last = -1.0;
        for n in [0, 1, 10, 100, 1_000, 10_000, 1_000_000, u32::MAX as u64] {
            let p = estimate_percent(n);
            assert!(p >= last);
            assert!(p < 100.0);
            last = p;
        }
        assert_eq!(estimate_percent(0), 0.0);
    }

    #[test]
    fn percent_never_decreases() {
        let tracker = ProgressTracker::new();
        tracker.raise_percent(40.0);
        assert_eq!(tracker.raise_percent(10.0), 40.0);
        assert_eq!(tracker.percent(), 40.0);
        tracker.complete();
        assert_eq!(tracker.percent(), 100.0);
    }
}
