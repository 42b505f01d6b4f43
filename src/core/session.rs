use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::models::snapshot::ScanSnapshot;

const MAGIC: [u8; 4] = *b"FRSS";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

/// Write `snapshot` to `path` atomically (temp file, then rename).
pub async fn save(snapshot: &ScanSnapshot, path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let config = bincode::config::standard();
    let header = Header {
        magic: MAGIC,
        version: FORMAT_VERSION,
    };
    let mut bytes = bincode::serde::encode_to_vec(&header, config)?;
    bytes.extend(bincode::serde::encode_to_vec(snapshot, config)?);

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    info!(
        "Saved {} records to {}",
        snapshot.files.len(),
        path.display()
    );
    Ok(())
}

/// Read a snapshot written by [`save`]. Nothing is touched on failure.
pub async fn load(path: &Path) -> Result<ScanSnapshot, SnapshotError> {
    let bytes = tokio::fs::read(path).await?;
    let snapshot = decode(&bytes)?;
    debug!(
        "Loaded {} records from {}",
        snapshot.files.len(),
        path.display()
    );
    Ok(snapshot)
}

fn decode(bytes: &[u8]) -> Result<ScanSnapshot, SnapshotError> {
    let config = bincode::config::standard();
    let (header, used): (Header, usize) = bincode::serde::decode_from_slice(bytes, config)
        .map_err(|_| SnapshotError::BadMagic)?;
    if header.magic != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    if header.version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(header.version));
    }
    let (snapshot, _) = bincode::serde::decode_from_slice(&bytes[used..], config)?;
    Ok(snapshot)
}

/// Small JSON summary stored next to each session so listings don't need to
/// decode the record list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    #[serde(with = "crate::models::os_path")]
    pub root_path: PathBuf,
    pub captured_at: DateTime<Utc>,
    pub total_files: u64,
    pub recoverable_count: u64,
    pub damaged_count: u64,
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub path: PathBuf,
    pub meta: SessionMeta,
}

/// Sessions kept under the data directory, one per scan root.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key(root: &Path) -> String {
        let hash = blake3::hash(root.to_string_lossy().as_bytes());
        hash.to_hex()[..16].to_string()
    }

    pub fn session_path(&self, root: &Path) -> PathBuf {
        self.dir.join(format!("{}.session", Self::key(root)))
    }

    fn meta_path(&self, root: &Path) -> PathBuf {
        self.dir.join(format!("{}.meta.json", Self::key(root)))
    }

    /// Save the snapshot as the session for its root, replacing any older one.
    pub async fn save(&self, snapshot: &ScanSnapshot) -> Result<PathBuf, SnapshotError> {
        let session_file = self.session_path(&snapshot.root_path);
        save(snapshot, &session_file).await?;

        let meta = SessionMeta {
            root_path: snapshot.root_path.clone(),
            captured_at: snapshot.captured_at,
            total_files: snapshot.stats.total_files,
            recoverable_count: snapshot.stats.recoverable_count,
            damaged_count: snapshot.stats.damaged_count,
        };
        let meta_bytes = serde_json::to_vec_pretty(&meta).map_err(std::io::Error::from)?;
        let meta_file = self.meta_path(&snapshot.root_path);
        let tmp_meta = meta_file.with_extension("json.tmp");
        tokio::fs::write(&tmp_meta, &meta_bytes).await?;
        tokio::fs::rename(&tmp_meta, &meta_file).await?;

        Ok(session_file)
    }

    /// The stored session for `root`, if one exists and decodes.
    pub async fn load(&self, root: &Path) -> Option<ScanSnapshot> {
        let session_file = self.session_path(root);
        if !session_file.exists() {
            return None;
        }
        match load(&session_file).await {
            Ok(snapshot) if snapshot.root_path == root => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                debug!("Ignoring unreadable session {}: {}", session_file.display(), e);
                None
            }
        }
    }

    /// All stored sessions, newest first.
    pub async fn list(&self) -> Result<Vec<SessionEntry>, SnapshotError> {
        let mut sessions = Vec::new();
        if !self.dir.exists() {
            return Ok(sessions);
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_meta = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".meta.json"));
            if !is_meta {
                continue;
            }
            let Ok(bytes) = tokio::fs::read(&path).await else {
                continue;
            };
            let Ok(meta) = serde_json::from_slice::<SessionMeta>(&bytes) else {
                continue;
            };
            let session_file = self.session_path(&meta.root_path);
            if session_file.exists() {
                sessions.push(SessionEntry {
                    path: session_file,
                    meta,
                });
            }
        }

        sessions.sort_by(|a, b| b.meta.captured_at.cmp(&a.meta.captured_at));
        Ok(sessions)
    }

    pub async fn clear(&self) -> Result<(), SnapshotError> {
        if !self.dir.exists() {
            return Ok(());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name.ends_with(".session") || name.ends_with(".meta.json") || name.ends_with(".tmp") {
                    tokio::fs::remove_file(&path).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_rejected_as_bad_magic() {
        assert!(matches!(decode(b"hello world"), Err(SnapshotError::BadMagic)));
        assert!(matches!(decode(b""), Err(SnapshotError::BadMagic)));
    }

    #[test]
    fn newer_version_is_rejected() {
        let header = Header {
            magic: MAGIC,
            version: FORMAT_VERSION + 1,
        };
        let bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard()).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(SnapshotError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn session_key_is_stable_per_root() {
        let store = SessionStore::new(PathBuf::from("/tmp/sessions"));
        let a = store.session_path(Path::new("/mnt/usb"));
        assert_eq!(a, store.session_path(Path::new("/mnt/usb")));
        assert_ne!(a, store.session_path(Path::new("/mnt/other")));
        assert!(a.to_string_lossy().ends_with(".session"));
    }
}
