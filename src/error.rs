use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scan root {0} is not a readable directory")]
    InvalidRoot(PathBuf),

    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("no scan is running")]
    NotScanning,

    #[error("a recovery batch is in progress")]
    Busy,

    #[error("no tokio runtime available to run the scan worker")]
    NoRuntime,

    #[error("scan failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("destination {path} is not writable: {reason}")]
    DestinationNotWritable { path: PathBuf, reason: String },

    #[error("a scan is in progress")]
    Busy,

    #[error("no tokio runtime available to run the recovery worker")]
    NoRuntime,
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("not a scan session file")]
    BadMagic,

    #[error("unsupported session format version {0}")]
    UnsupportedVersion(u32),

    #[error("cannot replace results while a scan is running")]
    ScanActive,
}

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("usage of {mount_point} unavailable: {source}")]
    Unavailable {
        mount_point: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}
