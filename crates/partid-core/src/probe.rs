//! Partition table probing.
//!
//! Reads the boot sector, and the primary GPT when the boot sector is a
//! protective MBR, and normalizes both table kinds into sector ranges keyed
//! by PARTUUID.

use crate::device::{DeviceHandle, DeviceNode, DeviceOpener, FileDevice};
use crate::gpt::{GptTable, GPT_BLOCK_SIZE};
use crate::guards::DeviceGuard;
use crate::legacy::synthesize_partuuid;
use crate::mbr::{MbrPartitionEntry, MbrTable, BOOT_SECTOR_SIZE};
use crate::reader::read_exactly;
use crate::PartResult;
use serde::Serialize;
use std::path::Path;

/// Header sector plus 32 sectors holding 128 standard-size entries.
pub const GPT_READ_SECTORS: usize = 33;

/// A partition as described by the on-disk table. `end_in_sectors` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbedPartition {
    pub start_in_sectors: u64,
    pub end_in_sectors: u64,
    #[serde(rename = "PARTUUID")]
    pub partuuid: String,
}

/// Result of probing one device. Empty when there is no partition table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbedTable {
    /// Disk GUID; GPT only.
    #[serde(rename = "PTUUID", skip_serializing_if = "Option::is_none")]
    pub ptuuid: Option<String>,
    pub partitions: Vec<ProbedPartition>,
}

/// Probes an already open device. Read and GPT decode failures are returned
/// to the caller as-is.
pub fn probe<D: DeviceHandle + ?Sized>(device: &mut D) -> PartResult<ProbedTable> {
    let sector = read_exactly(device, 0, BOOT_SECTOR_SIZE)?;
    let Some(mbr) = MbrTable::parse(&sector) else {
        log::debug!("boot sector has no 0x55AA signature; no partition table");
        return Ok(ProbedTable::default());
    };

    match mbr.protective_entry() {
        Some(entry) => {
            let offset = gpt_offset(entry);
            log::debug!("protective MBR found; reading primary GPT at byte {}", offset);
            let buf = read_exactly(device, offset, GPT_READ_SECTORS * GPT_BLOCK_SIZE)?;
            let gpt = GptTable::parse(&buf)?;
            Ok(table_from_gpt(&gpt))
        }
        None => {
            log::debug!("legacy MBR with signature {:#010x}", mbr.signature);
            Ok(table_from_mbr(&mbr))
        }
    }
}

/// Opens `name` through `opener`, probes it and closes it again on every path.
pub fn probe_device<O: DeviceOpener + ?Sized>(
    opener: &O,
    name: &str,
    node: Option<DeviceNode>,
) -> PartResult<ProbedTable> {
    let handle = opener.open(name, node)?;
    let mut guard = DeviceGuard::new(name, handle);
    let table = probe(guard.handle_mut())?;
    guard.close()?;
    Ok(table)
}

/// Probes a device node or disk image by path.
pub fn probe_path(path: &Path) -> PartResult<ProbedTable> {
    let handle = FileDevice::open(path)?;
    let mut guard = DeviceGuard::new(path.display().to_string(), handle);
    let table = probe(guard.handle_mut())?;
    guard.close()?;
    Ok(table)
}

/// Byte offset of the primary GPT header. A protective entry without a
/// starting LBA falls back to LBA 1.
fn gpt_offset(entry: &MbrPartitionEntry) -> u64 {
    let lba = if entry.first_lba != 0 {
        u64::from(entry.first_lba)
    } else {
        1
    };
    lba * GPT_BLOCK_SIZE as u64
}

fn table_from_gpt(gpt: &GptTable) -> ProbedTable {
    let partitions = gpt
        .partitions
        .iter()
        .map(|entry| ProbedPartition {
            start_in_sectors: entry.first_lba,
            end_in_sectors: entry.last_lba,
            partuuid: entry.unique_guid.to_string(),
        })
        .collect();

    ProbedTable {
        ptuuid: Some(gpt.disk_guid.to_string()),
        partitions,
    }
}

fn table_from_mbr(mbr: &MbrTable) -> ProbedTable {
    let partitions = mbr
        .used_entries()
        .filter_map(|(ordinal, entry)| {
            let Some(end_in_sectors) = entry.last_lba() else {
                log::debug!("MBR slot {} is empty at LBA 0; skipping", ordinal);
                return None;
            };
            Some(ProbedPartition {
                start_in_sectors: u64::from(entry.first_lba),
                end_in_sectors,
                partuuid: synthesize_partuuid(mbr.signature, ordinal),
            })
        })
        .collect();

    ProbedTable {
        ptuuid: None,
        partitions,
    }
}
