use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::debug;

use crate::models::stats::human_readable_size;

const HASH_CHUNK: usize = 64 * 1024;

/// Extra information about a single file, gathered on demand.
/// Every field degrades to `None` instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDetails {
    pub path: PathBuf,
    pub size_bytes: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub attributes: Option<Vec<&'static str>>,
    pub blake3: Option<String>,
}

impl FileDetails {
    pub fn inspect(path: &Path) -> Self {
        let meta = std::fs::metadata(path).ok();
        let blake3 = match hash_file(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                debug!("Could not hash {}: {}", path.display(), e);
                None
            }
        };

        Self {
            path: path.to_path_buf(),
            size_bytes: meta.as_ref().map(|m| m.len()),
            modified: meta
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
            created: meta
                .as_ref()
                .and_then(|m| m.created().ok())
                .map(DateTime::<Utc>::from),
            attributes: meta.as_ref().map(|_| attributes(path)),
            blake3,
        }
    }

    /// Label/value pairs for display.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        const UNKNOWN: &str = "Unknown";
        let time = |t: Option<DateTime<Utc>>| {
            t.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        vec![
            ("Path", self.path.display().to_string()),
            (
                "Size",
                self.size_bytes
                    .map(human_readable_size)
                    .unwrap_or_else(|| UNKNOWN.to_string()),
            ),
            ("Modified", time(self.modified)),
            ("Created", time(self.created)),
            (
                "Attributes",
                match &self.attributes {
                    Some(attrs) if attrs.is_empty() => "No special attributes".to_string(),
                    Some(attrs) => attrs.join(", "),
                    None => UNKNOWN.to_string(),
                },
            ),
            (
                "BLAKE3",
                self.blake3.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            ),
        ]
    }
}

/// Stream the file through BLAKE3 and return the hex digest.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(unix)]
fn attributes(path: &Path) -> Vec<&'static str> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return Vec::new();
    };
    [
        (libc::R_OK, "Readable"),
        (libc::W_OK, "Writable"),
        (libc::X_OK, "Executable"),
    ]
    .into_iter()
    .filter(|(mode, _)| unsafe { libc::access(c_path.as_ptr(), *mode) } == 0)
    .map(|(_, label)| label)
    .collect()
}

#[cfg(not(unix))]
fn attributes(path: &Path) -> Vec<&'static str> {
    let mut attrs = Vec::new();
    if File::open(path).is_ok() {
        attrs.push("Readable");
    }
    if std::fs::metadata(path).is_ok_and(|m| !m.permissions().readonly()) {
        attrs.push("Writable");
    }
    let ext = crate::core::signatures::dotted_extension(path);
    if matches!(ext.as_str(), ".exe" | ".bat" | ".cmd" | ".com") {
        attrs.push("Executable");
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_of_regular_file() {
        let dir = std::env::temp_dir().join("filerescue_details");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        let details = FileDetails::inspect(&path);
        assert_eq!(details.size_bytes, Some(5));
        assert!(details.modified.is_some());
        assert!(details.attributes.as_ref().unwrap().contains(&"Readable"));
        assert_eq!(
            details.blake3.as_deref(),
            Some(blake3::hash(b"hello").to_hex().as_str())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_unknown_everywhere() {
        let details = FileDetails::inspect(Path::new("/nonexistent/filerescue/nothing"));
        assert_eq!(details.size_bytes, None);
        assert_eq!(details.blake3, None);
        assert!(details.lines().iter().skip(1).all(|(_, v)| v == "Unknown"));
    }
}
