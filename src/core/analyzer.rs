use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::record::{FileRecord, FileStatus};

pub struct Analyzer;

impl Analyzer {
    /// One summary per containing folder, largest first.
    pub fn group_by_folder(records: &[FileRecord]) -> Vec<FolderSummary> {
        let total_bytes: u64 = records.iter().map(|r| r.size_bytes).sum();
        let mut folders: HashMap<&Path, FolderSummary> = HashMap::new();

        for record in records {
            let entry = folders
                .entry(record.containing_folder.as_path())
                .or_insert_with(|| FolderSummary::new(record.containing_folder.clone()));
            entry.file_count += 1;
            entry.total_bytes += record.size_bytes;
            if !record.status.is_recoverable() {
                entry.damaged_count += 1;
            }
        }

        let mut result: Vec<FolderSummary> = folders.into_values().collect();
        for folder in &mut result {
            if total_bytes > 0 {
                folder.percentage = folder.total_bytes as f64 / total_bytes as f64 * 100.0;
            }
        }
        result.sort_by(|a, b| {
            b.total_bytes
                .cmp(&a.total_bytes)
                .then_with(|| a.folder.cmp(&b.folder))
        });
        result
    }

    /// Fold folders below `threshold` (a fraction of total bytes) into one
    /// trailing "Others" row.
    pub fn merge_small_folders(folders: &[FolderSummary], threshold: f64) -> Vec<FolderSummary> {
        let mut result = Vec::new();
        let mut others = FolderSummary::new(PathBuf::from("Others"));
        let mut merged = 0usize;

        for folder in folders {
            if folder.percentage / 100.0 >= threshold {
                result.push(folder.clone());
            } else {
                others.file_count += folder.file_count;
                others.total_bytes += folder.total_bytes;
                others.damaged_count += folder.damaged_count;
                others.percentage += folder.percentage;
                merged += 1;
            }
        }

        if merged > 0 {
            others.merged_count = merged;
            result.push(others);
        }
        result
    }

    /// Indices of `records` that pass `filter`, in scan order.
    pub fn filter_indices(records: &[FileRecord], filter: &RecordFilter) -> Vec<usize> {
        let query = filter.query.to_lowercase();
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.folder.as_ref().map_or(true, |f| &r.containing_folder == f))
            .filter(|(_, r)| filter.status.map_or(true, |s| r.status == s))
            .filter(|(_, r)| query.is_empty() || r.name.to_lowercase().contains(&query))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn status_counts(records: &[FileRecord]) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in records {
            match record.status {
                FileStatus::Good => counts.good += 1,
                FileStatus::Damaged => counts.damaged += 1,
                FileStatus::Corrupted => counts.corrupted += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderSummary {
    pub folder: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
    pub damaged_count: usize,
    /// Share of all scanned bytes, 0-100.
    pub percentage: f64,
    /// Number of folders folded into this row; 0 for real folders.
    pub merged_count: usize,
}

impl FolderSummary {
    fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            file_count: 0,
            total_bytes: 0,
            damaged_count: 0,
            percentage: 0.0,
            merged_count: 0,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_count > 0
    }
}

/// Folder, status and name criteria; empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub folder: Option<PathBuf>,
    pub status: Option<FileStatus>,
    /// Case-insensitive substring of the file name.
    pub query: String,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.folder.is_none() && self.status.is_none() && self.query.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub good: usize,
    pub damaged: usize,
    pub corrupted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn record(path: &str, size: u64, status: FileStatus) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size, status, "unknown", SystemTime::UNIX_EPOCH)
    }

    fn sample() -> Vec<FileRecord> {
        vec![
            record("/r/a/Photo.JPG", 700, FileStatus::Good),
            record("/r/a/notes.txt", 100, FileStatus::Damaged),
            record("/r/b/report.pdf", 150, FileStatus::Corrupted),
            record("/r/c/tiny.bin", 50, FileStatus::Good),
        ]
    }

    #[test]
    fn folders_sorted_by_size() {
        let folders = Analyzer::group_by_folder(&sample());
        assert_eq!(folders.len(), 3);
        assert_eq!(folders[0].folder, PathBuf::from("/r/a"));
        assert_eq!(folders[0].file_count, 2);
        assert_eq!(folders[0].total_bytes, 800);
        assert_eq!(folders[0].damaged_count, 1);
        assert!((folders[0].percentage - 80.0).abs() < 1e-9);
    }

    #[test]
    fn small_folders_merge_into_others() {
        let folders = Analyzer::group_by_folder(&sample());
        let merged = Analyzer::merge_small_folders(&folders, 0.10);
        assert_eq!(merged.len(), 3);
        let others = merged.last().unwrap();
        assert!(others.is_merged());
        assert_eq!(others.total_bytes, 50);
    }

    #[test]
    fn filters_and_search() {
        let records = sample();
        let by_folder = RecordFilter {
            folder: Some(PathBuf::from("/r/a")),
            ..RecordFilter::default()
        };
        assert_eq!(Analyzer::filter_indices(&records, &by_folder), vec![0, 1]);

        let good = RecordFilter {
            status: Some(FileStatus::Good),
            ..RecordFilter::default()
        };
        assert_eq!(Analyzer::filter_indices(&records, &good), vec![0, 3]);

        let search = RecordFilter {
            query: "photo".into(),
            ..RecordFilter::default()
        };
        assert_eq!(Analyzer::filter_indices(&records, &search), vec![0]);
        assert!(RecordFilter::default().is_empty());
        assert_eq!(Analyzer::filter_indices(&records, &RecordFilter::default()).len(), 4);

        let combined = RecordFilter {
            folder: Some(PathBuf::from("/r/a")),
            status: Some(FileStatus::Good),
            query: "TXT".into(),
        };
        assert!(Analyzer::filter_indices(&records, &combined).is_empty());

        let counts = Analyzer::status_counts(&records);
        assert_eq!(counts, StatusCounts { good: 2, damaged: 1, corrupted: 1 });
    }
}
