use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::stats::human_readable_size;

/// A mounted volume as seen at listing time. `None` capacity means the usage
/// query failed for this mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub device_id: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub free_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
}

impl VolumeInfo {
    pub fn label(&self) -> String {
        match self.free_bytes {
            Some(free) => format!("{} ({} free)", self.device_id, human_readable_size(free)),
            None => format!("{} (Unknown free space)", self.device_id),
        }
    }

    pub fn usage_known(&self) -> bool {
        self.free_bytes.is_some() && self.total_bytes.is_some()
    }
}
