use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::settings::Settings;
use crate::error::{ScanError, SnapshotError};
use crate::models::category::Category;
use crate::models::record::FileRecord;
use crate::models::scan_result::{ScanIssue, ScanIssueKind, ScanState, ScanSummary};
use crate::models::snapshot::ScanSnapshot;
use crate::models::stats::{format_count, human_duration, ScanStatistics};

use super::classifier::classify;
use super::control::{JobGate, JobGuard, ScanControl};
use super::events::{Event, EventSender};
use super::mime;
use super::progress::{ProgressSnapshot, ProgressTracker};
use super::signatures::dotted_extension;

/// Results owned by the engine and appended to by the worker.
#[derive(Default)]
struct ScanData {
    records: Vec<FileRecord>,
    stats: ScanStatistics,
    root: Option<PathBuf>,
    issues: Vec<ScanIssue>,
    failure: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one background scan at a time and owns its results.
///
/// State machine: `Idle -> Scanning <-> Paused -> Completed | Cancelled | Failed`.
/// A new scan may be started once the previous one has finished; starting
/// replaces the record collection and resets the statistics.
pub struct ScanEngine {
    settings: Arc<Settings>,
    event_tx: EventSender,
    gate: JobGate,
    state: Arc<Mutex<ScanState>>,
    data: Arc<Mutex<ScanData>>,
    control: Mutex<Arc<ScanControl>>,
    progress: Mutex<Arc<ProgressTracker>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScanEngine {
    pub fn new(settings: Settings, event_tx: EventSender) -> Self {
        Self::with_gate(settings, event_tx, JobGate::new())
    }

    /// Share `gate` with a [`RecoveryEngine`](super::recovery::RecoveryEngine)
    /// so the two jobs exclude each other.
    pub fn with_gate(settings: Settings, event_tx: EventSender, gate: JobGate) -> Self {
        Self {
            settings: Arc::new(settings),
            event_tx,
            gate,
            state: Arc::new(Mutex::new(ScanState::Idle)),
            data: Arc::new(Mutex::new(ScanData::default())),
            control: Mutex::new(Arc::new(ScanControl::new())),
            progress: Mutex::new(Arc::new(ProgressTracker::new())),
            worker: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> ScanState {
        *lock(&self.state)
    }

    /// Spawn the background worker and return immediately.
    ///
    /// Must be called from within a tokio runtime. The root is validated
    /// here so a bad path is reported before any work starts.
    pub fn start(&self, root: PathBuf, category: Category) -> Result<(), ScanError> {
        let mut state = lock(&self.state);
        if state.is_active() {
            return Err(ScanError::AlreadyRunning);
        }

        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(ScanError::InvalidRoot(root)),
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ScanError::NoRuntime)?;
        let guard = self.gate.try_acquire().ok_or(ScanError::Busy)?;

        {
            let mut data = lock(&self.data);
            *data = ScanData {
                stats: ScanStatistics::started_at(Utc::now()),
                root: Some(root.clone()),
                ..ScanData::default()
            };
        }

        let control = Arc::new(ScanControl::new());
        let progress = Arc::new(ProgressTracker::new());
        *lock(&self.control) = Arc::clone(&control);
        *lock(&self.progress) = Arc::clone(&progress);
        *state = ScanState::Scanning;
        drop(state);

        info!("Scan of {} started ({})", root.display(), category);

        let worker = Worker {
            root,
            category,
            settings: Arc::clone(&self.settings),
            event_tx: self.event_tx.clone(),
            state: Arc::clone(&self.state),
            data: Arc::clone(&self.data),
            control,
            progress,
            guard: Some(guard),
            last_emit: Instant::now(),
        };
        let handle = runtime.spawn_blocking(move || worker.run());
        *lock(&self.worker) = Some(handle);

        Ok(())
    }

    pub fn pause(&self) -> Result<(), ScanError> {
        let mut state = lock(&self.state);
        if *state != ScanState::Scanning {
            return Err(ScanError::NotScanning);
        }
        lock(&self.control).pause();
        *state = ScanState::Paused;
        lock(&self.progress).set_status("Scan paused");
        let _ = self.event_tx.send(Event::ScanPaused);
        info!("Scan paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), ScanError> {
        let mut state = lock(&self.state);
        if *state != ScanState::Paused {
            return Err(ScanError::NotScanning);
        }
        lock(&self.control).resume();
        *state = ScanState::Scanning;
        lock(&self.progress).set_status("Resuming scan...");
        let _ = self.event_tx.send(Event::ScanResumed);
        info!("Scan resumed");
        Ok(())
    }

    /// Request a cooperative stop. Harmless when nothing is running or when
    /// called repeatedly; the worker finishes at its next checkpoint.
    pub fn cancel(&self) {
        if self.state().is_active() {
            lock(&self.progress).set_status("Cancelling scan...");
            debug!("Scan cancellation requested");
        }
        lock(&self.control).cancel();
    }

    /// Join the current worker, if any, and report how the scan ended.
    pub async fn wait(&self) -> ScanSummary {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Scan worker did not finish cleanly: {}", e);
                let mut state = lock(&self.state);
                if state.is_active() {
                    *state = ScanState::Failed;
                    lock(&self.data).failure = Some(e.to_string());
                }
            }
        }
        self.summary()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        lock(&self.progress).snapshot()
    }

    /// Copy of every record collected so far, in traversal order.
    pub fn records(&self) -> Vec<FileRecord> {
        lock(&self.data).records.clone()
    }

    /// Records appended after the first `offset`.
    pub fn records_since(&self, offset: usize) -> Vec<FileRecord> {
        let data = lock(&self.data);
        data.records.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn record_count(&self) -> usize {
        lock(&self.data).records.len()
    }

    pub fn stats(&self) -> ScanStatistics {
        lock(&self.data).stats.clone()
    }

    pub fn issues(&self) -> Vec<ScanIssue> {
        lock(&self.data).issues.clone()
    }

    pub fn root(&self) -> Option<PathBuf> {
        lock(&self.data).root.clone()
    }

    pub fn summary(&self) -> ScanSummary {
        let state = self.state();
        let data = lock(&self.data);
        ScanSummary {
            state,
            stats: data.stats.clone(),
            record_count: data.records.len(),
            issue_count: data.issues.len(),
            failure: data.failure.clone(),
        }
    }

    /// Capture the current results. `None` before any scan or restore.
    pub fn snapshot(&self) -> Option<ScanSnapshot> {
        let data = lock(&self.data);
        let root = data.root.clone()?;
        Some(ScanSnapshot::new(
            data.records.clone(),
            data.stats.clone(),
            root,
        ))
    }

    /// Replace the live results with a previously saved snapshot.
    pub fn restore(&self, snapshot: ScanSnapshot) -> Result<(), SnapshotError> {
        let mut state = lock(&self.state);
        if state.is_active() {
            return Err(SnapshotError::ScanActive);
        }
        let mut data = lock(&self.data);
        info!(
            "Restored {} records from a scan of {}",
            snapshot.files.len(),
            snapshot.root_path.display()
        );
        *data = ScanData {
            records: snapshot.files,
            stats: snapshot.stats,
            root: Some(snapshot.root_path),
            issues: Vec::new(),
            failure: None,
        };
        *state = ScanState::Idle;
        Ok(())
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        if self.state().is_active() {
            lock(&self.control).cancel();
        }
    }
}

enum Walk {
    Finished,
    Stopped,
}

struct Worker {
    root: PathBuf,
    category: Category,
    settings: Arc<Settings>,
    event_tx: EventSender,
    state: Arc<Mutex<ScanState>>,
    data: Arc<Mutex<ScanData>>,
    control: Arc<ScanControl>,
    progress: Arc<ProgressTracker>,
    guard: Option<JobGuard>,
    last_emit: Instant,
}

impl Worker {
    fn run(mut self) {
        let _ = self.event_tx.send(Event::ScanStarted {
            root: self.root.clone(),
        });
        self.progress.set_status("Initializing scan...");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.walk()));
        let (final_state, failure) = match outcome {
            Ok(Ok(Walk::Finished)) => (ScanState::Completed, None),
            Ok(Ok(Walk::Stopped)) => (ScanState::Cancelled, None),
            Ok(Err(e)) => (ScanState::Failed, Some(e.to_string())),
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "scan worker panicked".to_string());
                (ScanState::Failed, Some(msg))
            }
        };
        self.finish(final_state, failure);
    }

    fn finish(&mut self, final_state: ScanState, failure: Option<String>) {
        let (total, duration) = {
            let mut data = lock(&self.data);
            data.stats.finish(Utc::now());
            data.failure = failure.clone();
            (data.stats.total_files, data.stats.duration())
        };
        let took = duration.map(human_duration).unwrap_or_default();

        match final_state {
            ScanState::Completed => {
                self.progress.complete();
                self.progress.set_status(format!(
                    "Scan completed. Found {} files in {}",
                    format_count(total),
                    took
                ));
                info!("Scan of {} completed: {} files in {}", self.root.display(), total, took);
            }
            ScanState::Cancelled => {
                self.progress
                    .set_status(format!("Scan cancelled after {} files", format_count(total)));
                info!("Scan of {} stopped by user after {} files", self.root.display(), total);
            }
            _ => {
                let msg = failure.unwrap_or_default();
                self.progress.set_status(format!("Scan failed: {}", msg));
                error!("Scan of {} failed: {}", self.root.display(), msg);
            }
        }

        drop(self.guard.take());
        *lock(&self.state) = final_state;

        let _ = self.event_tx.send(Event::ScanFinished {
            state: final_state,
            total_files: total,
            duration_ms: self.progress.elapsed().as_millis() as u64,
        });
    }

    fn walk(&mut self) -> Result<Walk, ScanError> {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            if !self.control.checkpoint() {
                return Ok(Walk::Stopped);
            }

            if self.settings.follow_symlinks {
                match std::fs::canonicalize(&dir) {
                    Ok(real) if visited.contains(&real) => {
                        self.note_issue(
                            dir.clone(),
                            ScanIssueKind::SymlinkCycle,
                            format!("Symlink cycle detected: {}", dir.display()),
                        );
                        continue;
                    }
                    Ok(real) => {
                        visited.insert(real);
                    }
                    Err(_) => {}
                }
            }

            let (entries, entry_errors) = match read_dir_batch(&dir) {
                Ok(batch) => batch,
                Err(e) if dir == self.root => {
                    return Err(ScanError::Failed(format!(
                        "cannot read {}: {}",
                        dir.display(),
                        e
                    )));
                }
                Err(e) => {
                    self.note_issue(dir.clone(), ScanIssueKind::from_io(&e), e.to_string());
                    continue;
                }
            };
            self.progress.increment_dirs();
            self.progress.set_current_path(dir.clone());

            for (path, e) in entry_errors {
                self.note_issue(path, ScanIssueKind::from_io(&e), e.to_string());
            }

            let mut subdirs = Vec::new();
            for entry in entries {
                let file_type = entry.metadata.file_type();
                let is_dir = if file_type.is_symlink() {
                    if !self.settings.follow_symlinks {
                        continue;
                    }
                    match std::fs::metadata(&entry.path) {
                        Ok(target) => target.is_dir(),
                        Err(e) => {
                            self.note_issue(entry.path, ScanIssueKind::from_io(&e), e.to_string());
                            continue;
                        }
                    }
                } else if file_type.is_dir() {
                    true
                } else if file_type.is_file() {
                    false
                } else {
                    continue;
                };

                if is_dir {
                    subdirs.push(entry.path);
                    continue;
                }

                if !self.control.checkpoint() {
                    return Ok(Walk::Stopped);
                }
                self.process_file(entry.path);
                self.maybe_emit(&dir);
            }

            // Popped from the back, so reverse to descend in name order.
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(Walk::Finished)
    }

    fn process_file(&mut self, path: PathBuf) {
        self.progress.increment_seen();

        let metadata = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                self.note_issue(path, ScanIssueKind::from_io(&e), e.to_string());
                return;
            }
        };
        let size = metadata.len();
        if size > self.settings.max_file_size {
            debug!("Skipping {} ({} bytes over limit)", path.display(), size);
            self.progress.increment_skipped();
            return;
        }

        let extension = dotted_extension(&path);
        if !self.category.accepts(&extension) {
            self.progress.increment_skipped();
            return;
        }

        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(e) => {
                self.note_issue(path, ScanIssueKind::from_io(&e), e.to_string());
                return;
            }
        };

        let status = classify(&path, &extension);
        let mime_type = mime::detect(&path, &extension);
        let record = FileRecord::new(path, size, status, mime_type, modified);

        {
            let mut data = lock(&self.data);
            data.stats.record(status, size);
            data.records.push(record);
        }
        self.progress.increment_recorded();
        self.progress.add_size(size);
    }

    fn maybe_emit(&mut self, dir: &Path) {
        let seen = self.progress.files_seen.load(std::sync::atomic::Ordering::Relaxed);
        let every = self.settings.progress_every_files;
        let due_by_count = every > 0 && seen % every == 0;
        let due_by_time =
            self.last_emit.elapsed() >= Duration::from_millis(self.settings.progress_interval_ms);
        if !due_by_count && !due_by_time {
            return;
        }
        self.last_emit = Instant::now();

        let percent = self.progress.update_estimate();
        let records = self
            .progress
            .files_recorded
            .load(std::sync::atomic::Ordering::Relaxed);
        self.progress.set_status(format!("Scanning: {}", dir.display()));
        let _ = self.event_tx.send(Event::Progress {
            percent,
            files_seen: seen,
            records,
            current_path: dir.to_path_buf(),
            status: format!("Found {} files...", format_count(records)),
        });
    }

    fn note_issue(&self, path: PathBuf, kind: ScanIssueKind, message: String) {
        warn!("Error scanning {}: {}", path.display(), message);
        self.progress.increment_errors();
        {
            let mut data = lock(&self.data);
            if data.issues.len() < self.settings.max_issues {
                data.issues.push(ScanIssue {
                    path: path.clone(),
                    kind,
                    message: message.clone(),
                });
            }
        }
        let _ = self.event_tx.send(Event::ScanIssue {
            path,
            error: message,
        });
    }
}

/// Collected directory entry from batch I/O.
struct DirEntryData {
    path: PathBuf,
    metadata: std::fs::Metadata,
}

/// Read all entries and their (non-following) metadata from a directory,
/// sorted by name. Returns (entries, entry_errors) or an error if the
/// directory itself can't be read.
fn read_dir_batch(
    dir_path: &Path,
) -> std::io::Result<(Vec<DirEntryData>, Vec<(PathBuf, std::io::Error)>)> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for entry_result in std::fs::read_dir(dir_path)? {
        match entry_result {
            Ok(entry) => {
                let entry_path = entry.path();
                match std::fs::symlink_metadata(&entry_path) {
                    Ok(meta) => entries.push(DirEntryData {
                        path: entry_path,
                        metadata: meta,
                    }),
                    Err(e) => errors.push((entry_path, e)),
                }
            }
            Err(e) => errors.push((dir_path.to_path_buf(), e)),
        }
    }

    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok((entries, errors))
}
