use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Files larger than this are skipped without classification.
    pub max_file_size: u64,
    pub follow_symlinks: bool,
    /// Emit a progress event at least this often while files are flowing.
    pub progress_interval_ms: u64,
    /// ...or every this many recorded files, whichever comes first.
    pub progress_every_files: u64,
    /// Cap on retained scan issues; further issues are only logged.
    pub max_issues: usize,
    pub recovery_folder: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs_data_dir().unwrap_or_else(|| PathBuf::from(".filerescue"));
        let recovery_folder = std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Documents").join("Recovered_Files"))
            .unwrap_or_else(|| PathBuf::from("Recovered_Files"));

        Self {
            max_file_size: 500 * 1024 * 1024,
            follow_symlinks: false,
            progress_interval_ms: 2000,
            progress_every_files: 500,
            max_issues: 10_000,
            recovery_folder,
            data_dir,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        Self::default().data_dir.join("settings.json")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("filerescue.log")
    }
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library/Application Support/filerescue"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("filerescue"))
    }
    #[cfg(windows)]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("filerescue"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", windows)))]
    {
        Some(PathBuf::from(".filerescue"))
    }
}
