use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::FileStatus;

/// Running counters for a scan.
///
/// `Good` records count as recoverable; `Damaged` and `Corrupted` both land in
/// `damaged_count`. `corrupted_count` is the `Corrupted` share of that bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_files: u64,
    pub recoverable_count: u64,
    pub damaged_count: u64,
    pub corrupted_count: u64,
    pub scanned_bytes: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ScanStatistics {
    /// Zeroed counters stamped with a start time.
    pub fn started_at(start: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start),
            ..Self::default()
        }
    }

    pub fn record(&mut self, status: FileStatus, size_bytes: u64) {
        self.total_files += 1;
        self.scanned_bytes += size_bytes;
        match status {
            FileStatus::Good => self.recoverable_count += 1,
            FileStatus::Damaged => self.damaged_count += 1,
            FileStatus::Corrupted => {
                self.damaged_count += 1;
                self.corrupted_count += 1;
            }
        }
    }

    pub fn finish(&mut self, end: DateTime<Utc>) {
        self.end_time = Some(end);
    }

    pub fn is_consistent(&self) -> bool {
        self.total_files == self.recoverable_count + self.damaged_count
            && self.corrupted_count <= self.damaged_count
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            (Some(start), None) => Some(Utc::now() - start),
            _ => None,
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Files: {} | Recoverable: {} | Damaged: {}",
            format_count(self.total_files),
            format_count(self.recoverable_count),
            format_count(self.damaged_count),
        )
    }
}

pub fn human_readable_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn human_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    if secs < 1 {
        format!("{} ms", duration.num_milliseconds().max(0))
    } else if secs < 60 {
        format!("{} seconds", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupted_counts_toward_damaged() {
        let mut stats = ScanStatistics::started_at(Utc::now());
        stats.record(FileStatus::Good, 10);
        stats.record(FileStatus::Damaged, 20);
        stats.record(FileStatus::Corrupted, 0);

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.recoverable_count, 1);
        assert_eq!(stats.damaged_count, 2);
        assert_eq!(stats.corrupted_count, 1);
        assert_eq!(stats.scanned_bytes, 30);
        assert!(stats.is_consistent());
    }

    #[test]
    fn count_formatting() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
