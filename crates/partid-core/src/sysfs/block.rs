//! Helpers related to block devices in sysfs.
//!
//! Geometry comes from `/sys/block/<dev>` and its partition subdirectories.
//! All sizes and offsets in sysfs are expressed in 512-byte sectors.

pub use crate::device::DeviceNode;
use crate::path::{dev_name, resolve_lexically};
use crate::reconcile::OsPartitionGeometry;
use crate::{PartError, PartResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub name: String,
    pub size_in_sectors: u64,
    pub size_in_bytes: u64,
    pub device_node: DeviceNode,
    pub start_in_sectors: u64,
    pub start_in_bytes: u64,
    /// Partition number as assigned by the kernel.
    pub partition: u32,
    #[serde(rename = "PARTUUID", skip_serializing_if = "Option::is_none")]
    pub partuuid: Option<String>,
}

impl OsPartitionGeometry for PartitionInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_in_sectors(&self) -> u64 {
        self.start_in_sectors
    }

    fn size_in_sectors(&self) -> u64 {
        self.size_in_sectors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDeviceInfo {
    pub name: String,
    pub size_in_sectors: u64,
    pub size_in_bytes: u64,
    pub device_node: DeviceNode,
    #[serde(rename = "PTUUID", skip_serializing_if = "Option::is_none")]
    pub ptuuid: Option<String>,
    pub partitions: Vec<PartitionInfo>,
}

/// Reads a sysfs attribute holding a decimal integer.
fn read_integral(path: &Path) -> PartResult<u64> {
    let raw = fs::read_to_string(path)?;
    raw.trim()
        .parse()
        .map_err(|_| PartError::Parse(format!("{}: {:?}", path.display(), raw.trim())))
}

/// Reads a `major:minor` sysfs `dev` attribute.
fn read_device_node(path: &Path) -> PartResult<DeviceNode> {
    let raw = fs::read_to_string(path)?;
    let parse_err = || PartError::Parse(format!("{}: {:?}", path.display(), raw.trim()));
    let (major, minor) = raw.trim().split_once(':').ok_or_else(parse_err)?;
    Ok(DeviceNode {
        major: major.parse().map_err(|_| parse_err())?,
        minor: minor.parse().map_err(|_| parse_err())?,
    })
}

fn read_partition(sysfs_path: &Path, name: String) -> PartResult<PartitionInfo> {
    let size_in_sectors = read_integral(&sysfs_path.join("size"))?;
    let start_in_sectors = read_integral(&sysfs_path.join("start"))?;
    let partition = read_integral(&sysfs_path.join("partition"))?;
    let partition = u32::try_from(partition)
        .map_err(|_| PartError::Parse(format!("{}: partition {}", name, partition)))?;

    Ok(PartitionInfo {
        size_in_sectors,
        size_in_bytes: size_in_sectors.saturating_mul(SECTOR_SIZE),
        device_node: read_device_node(&sysfs_path.join("dev"))?,
        start_in_sectors,
        start_in_bytes: start_in_sectors.saturating_mul(SECTOR_SIZE),
        partition,
        partuuid: None,
        name,
    })
}

/// Looks up a whole-disk device by kernel name, including its partitions.
pub fn find_by_name(sys_block_root: &Path, name: &str) -> PartResult<BlockDeviceInfo> {
    let sysfs_path = sys_block_root.join(name);
    if name.is_empty() || name.contains('/') || !sysfs_path.is_dir() {
        return Err(PartError::DeviceNotFound(name.to_string()));
    }

    let size_in_sectors = read_integral(&sysfs_path.join("size"))?;
    let device_node = read_device_node(&sysfs_path.join("dev"))?;

    let mut partitions = Vec::new();
    for entry in fs::read_dir(&sysfs_path)? {
        let entry = entry?;
        let part_name = entry.file_name().to_string_lossy().to_string();
        if !part_name.starts_with(name) {
            continue;
        }
        partitions.push(read_partition(&entry.path(), part_name)?);
    }
    partitions.sort_by_key(|p| p.partition);

    Ok(BlockDeviceInfo {
        name: name.to_string(),
        size_in_sectors,
        size_in_bytes: size_in_sectors.saturating_mul(SECTOR_SIZE),
        device_node,
        ptuuid: None,
        partitions,
    })
}

/// Looks up a device by its node path. Only paths directly under `/dev` are
/// accepted; relative paths are resolved against the current directory.
pub fn find_by_device_path(
    sys_block_root: &Path,
    dev_path: &Path,
) -> PartResult<BlockDeviceInfo> {
    let cwd = std::env::current_dir()?;
    let resolved = resolve_lexically(dev_path, &cwd);
    let name = dev_name(&resolved)
        .ok_or_else(|| PartError::UnsupportedPath(dev_path.display().to_string()))?;
    find_by_name(sys_block_root, &name)
}

pub fn find_all(sys_block_root: &Path, skip_virtual: bool) -> PartResult<Vec<BlockDeviceInfo>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(sys_block_root)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if skip_virtual && should_skip_block_device(&name) {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match find_by_name(sys_block_root, &name) {
            Ok(info) => out.push(info),
            Err(err) => log::warn!("skipping block device {}: {}", name, err),
        }
    }
    Ok(out)
}

pub fn should_skip_block_device(name: &str) -> bool {
    name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("zram")
        || name.starts_with("dm-")
        || name.starts_with("md")
        || name.starts_with("sr")
}
