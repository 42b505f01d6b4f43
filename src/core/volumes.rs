use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::VolumeError;
use crate::models::volume::VolumeInfo;

/// One row of the OS mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Free and total bytes of a mounted filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

/// Source of mounts and their usage.
pub trait MountTable {
    fn mounts(&self) -> Vec<MountEntry>;
    fn usage(&self, mount_point: &Path) -> Result<Usage, VolumeError>;
}

/// List the mounted volumes of this machine.
pub fn list_volumes() -> Vec<VolumeInfo> {
    list_volumes_from(&SystemMounts)
}

/// Volumes without a filesystem type are skipped. A volume whose usage can't
/// be read is still listed, with unknown capacity.
pub fn list_volumes_from(table: &dyn MountTable) -> Vec<VolumeInfo> {
    table
        .mounts()
        .into_iter()
        .filter(|m| !m.fs_type.trim().is_empty())
        .map(|m| {
            let usage = match table.usage(&m.mount_point) {
                Ok(usage) => Some(usage),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            };
            VolumeInfo {
                device_id: m.device,
                mount_point: m.mount_point,
                fs_type: m.fs_type,
                free_bytes: usage.map(|u| u.free_bytes),
                total_bytes: usage.map(|u| u.total_bytes),
            }
        })
        .collect()
}

/// The real mount table of the running OS.
pub struct SystemMounts;

#[cfg(target_os = "linux")]
impl MountTable for SystemMounts {
    fn mounts(&self) -> Vec<MountEntry> {
        let table = match std::fs::read_to_string("/proc/self/mounts") {
            Ok(table) => table,
            Err(e) => {
                warn!("Cannot read mount table: {}", e);
                return Vec::new();
            }
        };
        let virtual_types = std::fs::read_to_string("/proc/filesystems")
            .map(|s| nodev_filesystems(&s))
            .unwrap_or_default();

        parse_mounts(&table)
            .into_iter()
            .filter(|m| !virtual_types.contains(&m.fs_type))
            .collect()
    }

    fn usage(&self, mount_point: &Path) -> Result<Usage, VolumeError> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let unavailable = |source: std::io::Error| VolumeError::Unavailable {
            mount_point: mount_point.to_path_buf(),
            source,
        };

        let c_path = CString::new(mount_point.as_os_str().as_bytes())
            .map_err(|e| unavailable(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut st) };
        if ret != 0 {
            return Err(unavailable(std::io::Error::last_os_error()));
        }

        let block = st.f_frsize as u64;
        Ok(Usage {
            free_bytes: st.f_bavail as u64 * block,
            total_bytes: st.f_blocks as u64 * block,
        })
    }
}

#[cfg(not(target_os = "linux"))]
impl MountTable for SystemMounts {
    fn mounts(&self) -> Vec<MountEntry> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        disks
            .iter()
            .map(|d| MountEntry {
                device: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_path_buf(),
                fs_type: d.file_system().to_string_lossy().into_owned(),
            })
            .collect()
    }

    fn usage(&self, mount_point: &Path) -> Result<Usage, VolumeError> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        disks
            .iter()
            .find(|d| d.mount_point() == mount_point)
            .map(|d| Usage {
                free_bytes: d.available_space(),
                total_bytes: d.total_space(),
            })
            .ok_or_else(|| VolumeError::Unavailable {
                mount_point: mount_point.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "volume disappeared"),
            })
    }
}

/// Parse `/proc/self/mounts` style text.
pub fn parse_mounts(table: &str) -> Vec<MountEntry> {
    table
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next().unwrap_or("");
            Some(MountEntry {
                device: unescape_octal(device),
                mount_point: PathBuf::from(unescape_octal(mount_point)),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Filesystem types flagged `nodev` in `/proc/filesystems`, except those that
/// commonly back real storage.
fn nodev_filesystems(list: &str) -> Vec<String> {
    list.lines()
        .filter_map(|line| line.strip_prefix("nodev"))
        .map(|fs| fs.trim().to_string())
        .filter(|fs| fs != "zfs")
        .collect()
}

/// Mount tables escape space, tab, newline and backslash as `\ooo`.
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeMounts {
        entries: Vec<MountEntry>,
        usage: HashMap<PathBuf, Usage>,
    }

    impl MountTable for FakeMounts {
        fn mounts(&self) -> Vec<MountEntry> {
            self.entries.clone()
        }

        fn usage(&self, mount_point: &Path) -> Result<Usage, VolumeError> {
            self.usage
                .get(mount_point)
                .copied()
                .ok_or_else(|| VolumeError::Unavailable {
                    mount_point: mount_point.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                })
        }
    }

    fn entry(device: &str, mount: &str, fs: &str) -> MountEntry {
        MountEntry {
            device: device.into(),
            mount_point: PathBuf::from(mount),
            fs_type: fs.into(),
        }
    }

    #[test]
    fn unreadable_usage_is_unknown_not_omitted() {
        let table = FakeMounts {
            entries: vec![
                entry("/dev/sda1", "/", "ext4"),
                entry("/dev/sdb1", "/media/card", "vfat"),
                entry("none", "/weird", ""),
            ],
            usage: HashMap::from([(
                PathBuf::from("/"),
                Usage {
                    free_bytes: 10,
                    total_bytes: 100,
                },
            )]),
        };

        let volumes = list_volumes_from(&table);
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].free_bytes, Some(10));
        assert_eq!(volumes[0].total_bytes, Some(100));
        assert_eq!(volumes[1].device_id, "/dev/sdb1");
        assert_eq!(volumes[1].free_bytes, None);
        assert!(!volumes[1].usage_known());
    }

    #[test]
    fn mount_table_parsing() {
        let table = "/dev/sda1 / ext4 rw,relatime 0 0\n\
                     /dev/sdc1 /media/My\\040Disk vfat rw 0 0\n\
                     \n";
        let mounts = parse_mounts(table);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1].mount_point, PathBuf::from("/media/My Disk"));
        assert_eq!(mounts[1].fs_type, "vfat");
    }

    #[test]
    fn nodev_types_are_collected() {
        let list = "nodev\tsysfs\nnodev\tproc\n\text4\nnodev\tzfs\n";
        assert_eq!(nodev_filesystems(list), vec!["sysfs", "proc"]);
    }
}
