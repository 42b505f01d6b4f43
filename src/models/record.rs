use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Integrity verdict for a discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    /// Readable, header matches, structural check (if any) passed.
    Good,
    /// Readable but the header or structure does not match its extension.
    Damaged,
    /// Not a regular readable file, or an I/O error hit during checks.
    Corrupted,
}

impl FileStatus {
    pub fn is_recoverable(self) -> bool {
        self == FileStatus::Good
    }

    pub fn label(self) -> &'static str {
        match self {
            FileStatus::Good => "Good",
            FileStatus::Damaged => "Damaged",
            FileStatus::Corrupted => "Corrupted",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "good" => Ok(FileStatus::Good),
            "damaged" => Ok(FileStatus::Damaged),
            "corrupted" => Ok(FileStatus::Corrupted),
            other => Err(format!("unknown file status: {other}")),
        }
    }
}

/// One file discovered by a scan. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: CompactString,
    #[serde(with = "super::os_path")]
    pub path: PathBuf,
    pub size_bytes: u64,
    pub status: FileStatus,
    pub mime_type: CompactString,
    pub modified_at: DateTime<Utc>,
    #[serde(with = "super::os_path")]
    pub containing_folder: PathBuf,
}

impl FileRecord {
    pub fn new(
        path: PathBuf,
        size_bytes: u64,
        status: FileStatus,
        mime_type: impl Into<CompactString>,
        modified: SystemTime,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::from(path.to_string_lossy()));
        let containing_folder = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            name,
            path,
            size_bytes,
            status,
            mime_type: mime_type.into(),
            modified_at: DateTime::<Utc>::from(modified),
            containing_folder,
        }
    }

    /// Lowercase, dot-prefixed extension (`".pdf"`), or empty when there is none.
    pub fn extension(&self) -> String {
        crate::core::signatures::dotted_extension(&self.path)
    }

    pub fn human_readable_size(&self) -> String {
        super::stats::human_readable_size(self.size_bytes)
    }
}
