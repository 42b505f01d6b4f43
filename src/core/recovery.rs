use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::RecoveryError;
use crate::models::record::{FileRecord, FileStatus};

use super::control::{JobGate, JobGuard};
use super::events::{Event, EventSender};

/// Where recovered files land under the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// `dest/<basename>`
    Flat,
    /// `dest/<path relative to scan_root>`, creating directories as needed.
    Structured { scan_root: PathBuf },
    /// Flat, plus a `<file>.meta.json` sidecar describing the original.
    FlatWithMetadata,
}

/// Decides whether a file that is not `Good` should be copied anyway.
pub trait Confirm: Send + Sync {
    fn confirm(&self, name: &str, status: FileStatus) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str, FileStatus) -> bool + Send + Sync,
{
    fn confirm(&self, name: &str, status: FileStatus) -> bool {
        self(name, status)
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryFailure {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Destination paths of the files written, in input order.
    pub recovered: Vec<PathBuf>,
    pub failures: Vec<RecoveryFailure>,
}

impl RecoveryReport {
    fn fail(&mut self, source: &Path, reason: impl Into<String>) {
        self.failed += 1;
        self.failures.push(RecoveryFailure {
            source: source.to_path_buf(),
            reason: reason.into(),
        });
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Recovered {} files, {} failed",
            self.succeeded, self.failed
        )
    }
}

#[derive(Serialize)]
struct RecoveryMetadata<'a> {
    #[serde(serialize_with = "crate::models::os_path::serialize")]
    original_path: &'a Path,
    status: FileStatus,
    mime_type: &'a str,
    size_bytes: u64,
    modified_at: DateTime<Utc>,
    recovered_at: DateTime<Utc>,
}

/// Copies selected records to a destination without ever overwriting.
#[derive(Clone)]
pub struct RecoveryEngine {
    event_tx: EventSender,
    gate: JobGate,
}

impl RecoveryEngine {
    pub fn new(event_tx: EventSender, gate: JobGate) -> Self {
        Self { event_tx, gate }
    }

    /// Run a batch on the calling thread.
    ///
    /// The destination is checked before anything is copied; an unwritable
    /// destination rejects the whole batch. Per-file problems only count
    /// toward `failed`.
    pub fn recover(
        &self,
        records: &[FileRecord],
        destination: &Path,
        layout: &Layout,
        confirm: &dyn Confirm,
    ) -> Result<RecoveryReport, RecoveryError> {
        let guard = self.prepare(destination)?;
        let report = self.run_batch(records, destination, layout, confirm);
        drop(guard);
        Ok(report)
    }

    /// Same as [`recover`](Self::recover) but on a blocking worker. The
    /// precondition checks still happen before this returns.
    pub fn spawn(
        &self,
        records: Vec<FileRecord>,
        destination: PathBuf,
        layout: Layout,
        confirm: Arc<dyn Confirm>,
    ) -> Result<JoinHandle<RecoveryReport>, RecoveryError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| RecoveryError::NoRuntime)?;
        let guard = self.prepare(&destination)?;
        let engine = self.clone();
        Ok(runtime.spawn_blocking(move || {
            let report = engine.run_batch(&records, &destination, &layout, confirm.as_ref());
            drop(guard);
            report
        }))
    }

    fn prepare(&self, destination: &Path) -> Result<JobGuard, RecoveryError> {
        let guard = self.gate.try_acquire().ok_or(RecoveryError::Busy)?;
        check_destination(destination)?;
        Ok(guard)
    }

    fn run_batch(
        &self,
        records: &[FileRecord],
        destination: &Path,
        layout: &Layout,
        confirm: &dyn Confirm,
    ) -> RecoveryReport {
        let total = records.len();
        let mut report = RecoveryReport::default();
        info!(
            "Recovering {} files to {}",
            total,
            destination.display()
        );

        for (i, record) in records.iter().enumerate() {
            if !record.status.is_recoverable() && !confirm.confirm(&record.name, record.status) {
                debug!("Declined to recover {} file {}", record.status, record.path.display());
                report.fail(&record.path, format!("{} file declined", record.status));
            } else {
                match recover_one(record, destination, layout) {
                    Ok(dest) => {
                        debug!("Recovered {} -> {}", record.path.display(), dest.display());
                        report.succeeded += 1;
                        report.recovered.push(dest);
                    }
                    Err(e) => {
                        warn!("Failed to recover {}: {}", record.path.display(), e);
                        report.fail(&record.path, e.to_string());
                    }
                }
            }

            let _ = self.event_tx.send(Event::RecoveryProgress {
                completed: i + 1,
                total,
            });
        }

        info!("{}", report.summary_line());
        let _ = self.event_tx.send(Event::RecoveryFinished {
            succeeded: report.succeeded,
            failed: report.failed,
        });
        report
    }
}

/// Destination must be an existing directory we can create files in.
pub fn check_destination(destination: &Path) -> Result<(), RecoveryError> {
    let not_writable = |reason: String| RecoveryError::DestinationNotWritable {
        path: destination.to_path_buf(),
        reason,
    };

    match fs::metadata(destination) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(not_writable("not a directory".into())),
        Err(e) => return Err(not_writable(e.to_string())),
    }

    tempfile::Builder::new()
        .prefix(".filerescue-writable")
        .tempfile_in(destination)
        .map(drop)
        .map_err(|e| not_writable(e.to_string()))
}

/// Where `record` should go before collision handling.
///
/// Only plain name components are joined onto `destination`, so a record
/// carrying `..` or an absolute name (e.g. from a hand-edited session file)
/// is refused instead of escaping the destination.
pub fn planned_destination(
    record: &FileRecord,
    destination: &Path,
    layout: &Layout,
) -> io::Result<PathBuf> {
    let relative = match layout {
        Layout::Flat | Layout::FlatWithMetadata => flat_name(record),
        Layout::Structured { scan_root } => match record.path.strip_prefix(scan_root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => {
                debug!(
                    "{} is outside {}, recovering flat",
                    record.path.display(),
                    scan_root.display()
                );
                flat_name(record)
            }
        },
    };

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.file_name().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing unsafe destination name {}", relative.display()),
        ));
    }
    Ok(destination.join(relative))
}

fn flat_name(record: &FileRecord) -> PathBuf {
    match record.path.file_name() {
        Some(name) => PathBuf::from(name),
        None => PathBuf::from(record.name.as_str()),
    }
}

/// First of `path`, `stem_1.ext`, `stem_2.ext`, ... that does not exist yet.
pub fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u64;
    loop {
        let candidate = parent.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn recover_one(record: &FileRecord, destination: &Path, layout: &Layout) -> io::Result<PathBuf> {
    let planned = planned_destination(record, destination, layout)?;
    if let Some(parent) = planned.parent() {
        fs::create_dir_all(parent)?;
    }
    let target = unique_destination(&planned);
    copy_atomic(&record.path, &target)?;

    if *layout == Layout::FlatWithMetadata {
        if let Err(e) = write_sidecar(record, &target) {
            let _ = fs::remove_file(&target);
            return Err(e);
        }
    }
    Ok(target)
}

/// Copy content, permissions and timestamps into a temp file next to `dest`,
/// then link it into place. `dest` is never overwritten and no partial file
/// is left behind on failure.
pub fn copy_atomic(source: &Path, dest: &Path) -> io::Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent directory")
    })?;

    let mut input = File::open(source)?;
    let meta = input.metadata()?;
    if !meta.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(".filerescue-")
        .suffix(".part")
        .tempfile_in(parent)?;
    io::copy(&mut input, tmp.as_file_mut())?;

    let file = tmp.as_file();
    file.set_permissions(meta.permissions())?;
    let mut times = FileTimes::new();
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    file.set_times(times)?;
    file.sync_all()?;

    tmp.persist_noclobber(dest).map_err(|e| e.error)?;
    Ok(())
}

fn sidecar_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".meta.json");
    target.with_file_name(name)
}

fn write_sidecar(record: &FileRecord, target: &Path) -> io::Result<()> {
    let meta = RecoveryMetadata {
        original_path: &record.path,
        status: record.status,
        mime_type: &record.mime_type,
        size_bytes: record.size_bytes,
        modified_at: record.modified_at,
        recovered_at: Utc::now(),
    };
    let json = serde_json::to_vec_pretty(&meta)?;

    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    io::Write::write_all(&mut tmp, &json)?;
    tmp.persist_noclobber(sidecar_path(target))
        .map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn record_at(path: &str) -> FileRecord {
        FileRecord::new(
            PathBuf::from(path),
            0,
            FileStatus::Good,
            "text/plain",
            SystemTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn collision_suffix_goes_before_extension() {
        let dir = std::env::temp_dir().join("filerescue_recovery_unique");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let path = dir.join("report.pdf");
        assert_eq!(unique_destination(&path), path);

        fs::write(&path, b"a").unwrap();
        assert_eq!(unique_destination(&path), dir.join("report_1.pdf"));

        fs::write(dir.join("report_1.pdf"), b"b").unwrap();
        assert_eq!(unique_destination(&path), dir.join("report_2.pdf"));

        fs::write(dir.join("README"), b"c").unwrap();
        assert_eq!(unique_destination(&dir.join("README")), dir.join("README_1"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn structured_keeps_relative_path() {
        let record = record_at("/data/root/sub/dir/a.txt");
        let layout = Layout::Structured {
            scan_root: PathBuf::from("/data/root"),
        };
        assert_eq!(
            planned_destination(&record, Path::new("/dest"), &layout).unwrap(),
            PathBuf::from("/dest/sub/dir/a.txt")
        );
    }

    #[test]
    fn structured_outside_root_falls_back_to_flat() {
        let record = record_at("/elsewhere/a.txt");
        let layout = Layout::Structured {
            scan_root: PathBuf::from("/data/root"),
        };
        assert_eq!(
            planned_destination(&record, Path::new("/dest"), &layout).unwrap(),
            PathBuf::from("/dest/a.txt")
        );
    }

    #[test]
    fn parent_components_are_refused() {
        let record = record_at("/data/root/../../etc/passwd");
        let layout = Layout::Structured {
            scan_root: PathBuf::from("/data/root"),
        };
        assert!(planned_destination(&record, Path::new("/dest"), &layout).is_err());

        let mut sneaky = record_at("/data/root/a.txt");
        sneaky.path = PathBuf::from("/data/root/..");
        sneaky.name = "../../escape.txt".into();
        assert!(planned_destination(&sneaky, Path::new("/dest"), &Layout::Flat).is_err());
    }

    #[test]
    fn sidecar_sits_next_to_copy() {
        assert_eq!(
            sidecar_path(Path::new("/dest/photo_1.jpg")),
            PathBuf::from("/dest/photo_1.jpg.meta.json")
        );
    }

    #[test]
    fn closures_are_confirmers() {
        let yes = |_: &str, _: FileStatus| true;
        let only_damaged = |_: &str, s: FileStatus| s == FileStatus::Damaged;
        assert!(yes.confirm("x", FileStatus::Corrupted));
        assert!(only_damaged.confirm("x", FileStatus::Damaged));
        assert!(!only_damaged.confirm("x", FileStatus::Corrupted));
    }
}
