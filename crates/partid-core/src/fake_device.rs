//! Fake device implementation for testing.
//!
//! Serves reads from an in-memory byte array and records every operation,
//! so probing can be exercised without root privileges or real hardware.

use crate::device::{DeviceHandle, DeviceNode, DeviceOpener};
use crate::gpt::{crc32, GPT_BLOCK_SIZE};
use crate::mbr::{MbrPartitionEntry, BOOT_SECTOR_SIZE, PROTECTIVE_MBR_TYPE};
use crate::{PartError, PartResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Linux filesystem data partition type.
pub const GUID_LINUX_FS: Uuid = Uuid::from_u128(0x0fc63daf_8483_4772_8e79_3d69d8477de4);
/// EFI system partition type.
pub const GUID_EFI_SYSTEM: Uuid = Uuid::from_u128(0xc12a7328_f81f_11d2_ba4b_00a0c93ec93b);

const GPT_ENTRY_COUNT: usize = 128;
const GPT_ENTRY_SIZE: usize = 128;
const GPT_HEADER_SIZE: usize = 92;

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read { offset: u64, length: usize },
    Close,
}

#[derive(Debug, Default)]
struct FakeDeviceState {
    operations: Vec<Operation>,
    closed: bool,
}

/// In-memory device. Clones share the recorded state.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    data: Arc<Vec<u8>>,
    read_limit: Option<usize>,
    state: Arc<Mutex<FakeDeviceState>>,
}

impl FakeDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            read_limit: None,
            state: Arc::new(Mutex::new(FakeDeviceState::default())),
        }
    }

    /// Cap every read at `limit` bytes to simulate truncated I/O.
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = Some(limit);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Number of read requests issued.
    pub fn read_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| matches!(op, Operation::Read { .. }))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record_operation(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }
}

impl DeviceHandle for FakeDevice {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> PartResult<usize> {
        self.record_operation(Operation::Read {
            offset,
            length: buf.len(),
        });
        if self.is_closed() {
            return Err(PartError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "fake device is closed",
            )));
        }

        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let mut end = start.saturating_add(buf.len()).min(self.data.len());
        if let Some(limit) = self.read_limit {
            end = end.min(start.saturating_add(limit));
        }
        let n = end - start;
        buf[..n].copy_from_slice(&self.data[start..end]);
        Ok(n)
    }

    fn close(&mut self) -> PartResult<()> {
        self.record_operation(Operation::Close);
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out [`FakeDevice`]s by name; unknown names fail like a missing node.
#[derive(Debug, Clone, Default)]
pub struct FakeOpener {
    devices: HashMap<String, FakeDevice>,
    denied: Vec<String>,
}

impl FakeOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, name: &str, device: FakeDevice) -> Self {
        self.devices.insert(name.to_string(), device);
        self
    }

    /// Opening `name` fails with [`PartError::PermissionDenied`].
    pub fn with_denied(mut self, name: &str) -> Self {
        self.denied.push(name.to_string());
        self
    }

    pub fn device(&self, name: &str) -> Option<&FakeDevice> {
        self.devices.get(name)
    }
}

impl DeviceOpener for FakeOpener {
    type Handle = FakeDevice;

    fn open(&self, name: &str, _node: Option<DeviceNode>) -> PartResult<FakeDevice> {
        if self.denied.iter().any(|d| d == name) {
            log::info!("FAKE DEVICE: open {} denied", name);
            return Err(PartError::PermissionDenied);
        }
        log::info!("FAKE DEVICE: open {}", name);
        self.devices
            .get(name)
            .cloned()
            .ok_or_else(|| PartError::DeviceNotFound(name.to_string()))
    }
}

#[derive(Debug, Clone)]
struct GptLayout {
    disk_guid: Uuid,
    header_lba: u64,
    entries: Vec<(Uuid, Uuid, u64, u64)>,
}

/// Builds raw disk images carrying an MBR or a protective MBR plus primary GPT.
///
/// Only what the prober reads is laid out; there is no backup GPT.
#[derive(Debug, Clone)]
pub struct DiskImage {
    signature: u32,
    slots: [MbrPartitionEntry; 4],
    gpt: Option<GptLayout>,
}

impl DiskImage {
    pub fn mbr(signature: u32) -> Self {
        Self {
            signature,
            slots: [MbrPartitionEntry::default(); 4],
            gpt: None,
        }
    }

    /// Protective MBR in slot 1 pointing at a GPT header in LBA 1.
    pub fn gpt(disk_guid: Uuid) -> Self {
        let mut image = Self::mbr(0);
        image.slots[0] = MbrPartitionEntry {
            kind: PROTECTIVE_MBR_TYPE,
            first_lba: 1,
            sector_count: 0,
        };
        image.gpt = Some(GptLayout {
            disk_guid,
            header_lba: 1,
            entries: Vec::new(),
        });
        image
    }

    /// Set MBR slot `slot` (1-based).
    pub fn partition(mut self, slot: usize, kind: u8, first_lba: u32, sector_count: u32) -> Self {
        assert!((1..=4).contains(&slot), "MBR slot must be 1..=4");
        self.slots[slot - 1] = MbrPartitionEntry {
            kind,
            first_lba,
            sector_count,
        };
        self
    }

    pub fn gpt_partition(
        mut self,
        type_guid: Uuid,
        unique_guid: Uuid,
        first: u64,
        last: u64,
    ) -> Self {
        if let Some(gpt) = self.gpt.as_mut() {
            gpt.entries.push((type_guid, unique_guid, first, last));
        }
        self
    }

    /// Leave the next GPT entry unused (all zeroes, nil type GUID).
    pub fn gpt_gap(self) -> Self {
        self.gpt_partition(Uuid::nil(), Uuid::nil(), 0, 0)
    }

    /// Move the GPT header to `lba` and point the protective entry at it.
    pub fn gpt_header_at(mut self, lba: u32) -> Self {
        if let Some(gpt) = self.gpt.as_mut() {
            gpt.header_lba = u64::from(lba);
        }
        if let Some(entry) = self.slots.iter_mut().find(|e| e.kind == PROTECTIVE_MBR_TYPE) {
            entry.first_lba = lba;
        }
        self
    }

    /// Lay the image out over `sectors` 512-byte sectors.
    pub fn build(&self, sectors: u64) -> Vec<u8> {
        let len = usize::try_from(sectors).unwrap_or(usize::MAX) * BOOT_SECTOR_SIZE;
        let mut data = vec![0u8; len];

        let mut slots = self.slots;
        for slot in slots.iter_mut() {
            if slot.kind == PROTECTIVE_MBR_TYPE && slot.sector_count == 0 {
                slot.sector_count =
                    u32::try_from(sectors.saturating_sub(1)).unwrap_or(u32::MAX);
            }
        }
        write_boot_sector(&mut data, self.signature, &slots);

        if let Some(gpt) = &self.gpt {
            write_gpt(&mut data, gpt, sectors);
        }
        data
    }
}

fn write_boot_sector(data: &mut [u8], signature: u32, slots: &[MbrPartitionEntry; 4]) {
    assert!(data.len() >= BOOT_SECTOR_SIZE, "image smaller than a boot sector");
    data[440..444].copy_from_slice(&signature.to_le_bytes());
    for (i, slot) in slots.iter().enumerate() {
        let raw = &mut data[446 + i * 16..446 + (i + 1) * 16];
        raw[4] = slot.kind;
        raw[8..12].copy_from_slice(&slot.first_lba.to_le_bytes());
        raw[12..16].copy_from_slice(&slot.sector_count.to_le_bytes());
    }
    data[510] = 0x55;
    data[511] = 0xAA;
}

fn write_gpt(data: &mut [u8], gpt: &GptLayout, sectors: u64) {
    let header_at = gpt.header_lba as usize * GPT_BLOCK_SIZE;
    let entries_at = header_at + GPT_BLOCK_SIZE;
    let array_len = GPT_ENTRY_COUNT * GPT_ENTRY_SIZE;
    assert!(
        data.len() >= entries_at + array_len,
        "image too small for a primary GPT at LBA {}",
        gpt.header_lba
    );
    assert!(gpt.entries.len() <= GPT_ENTRY_COUNT, "too many GPT entries");

    let mut array = vec![0u8; array_len];
    for (i, (type_guid, unique_guid, first, last)) in gpt.entries.iter().enumerate() {
        let raw = &mut array[i * GPT_ENTRY_SIZE..(i + 1) * GPT_ENTRY_SIZE];
        raw[0..16].copy_from_slice(&type_guid.to_bytes_le());
        raw[16..32].copy_from_slice(&unique_guid.to_bytes_le());
        raw[32..40].copy_from_slice(&first.to_le_bytes());
        raw[40..48].copy_from_slice(&last.to_le_bytes());
    }

    let mut header = [0u8; GPT_HEADER_SIZE];
    header[0..8].copy_from_slice(b"EFI PART");
    header[8..12].copy_from_slice(&0x0001_0000u32.to_le_bytes());
    header[12..16].copy_from_slice(&(GPT_HEADER_SIZE as u32).to_le_bytes());
    header[24..32].copy_from_slice(&gpt.header_lba.to_le_bytes());
    header[32..40].copy_from_slice(&sectors.saturating_sub(1).to_le_bytes());
    header[40..48].copy_from_slice(&(gpt.header_lba + 33).to_le_bytes());
    header[48..56].copy_from_slice(&sectors.saturating_sub(34).to_le_bytes());
    header[56..72].copy_from_slice(&gpt.disk_guid.to_bytes_le());
    header[72..80].copy_from_slice(&(gpt.header_lba + 1).to_le_bytes());
    header[80..84].copy_from_slice(&(GPT_ENTRY_COUNT as u32).to_le_bytes());
    header[84..88].copy_from_slice(&(GPT_ENTRY_SIZE as u32).to_le_bytes());
    header[88..92].copy_from_slice(&crc32(&array).to_le_bytes());
    let header_crc = crc32(&header);
    header[16..20].copy_from_slice(&header_crc.to_le_bytes());

    data[header_at..header_at + GPT_HEADER_SIZE].copy_from_slice(&header);
    data[entries_at..entries_at + array_len].copy_from_slice(&array);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_device_records_reads_and_close() {
        let mut dev = FakeDevice::new(vec![7u8; 16]);
        let observer = dev.clone();
        let mut buf = [0u8; 4];
        assert_eq!(dev.read_at(&mut buf, 2).unwrap(), 4);
        dev.close().unwrap();

        assert_eq!(
            observer.operations(),
            vec![
                Operation::Read {
                    offset: 2,
                    length: 4
                },
                Operation::Close
            ]
        );
        assert!(observer.is_closed());
    }

    #[test]
    fn fake_device_reads_nothing_past_end() {
        let mut dev = FakeDevice::new(vec![1u8; 8]);
        let mut buf = [0u8; 4];
        assert_eq!(dev.read_at(&mut buf, 100).unwrap(), 0);
    }

    #[test]
    fn disk_image_gpt_sets_protective_entry() {
        let image = DiskImage::gpt(Uuid::nil()).build(64);
        assert_eq!(image.len(), 64 * 512);
        assert_eq!(image[446 + 4], PROTECTIVE_MBR_TYPE);
        assert_eq!(&image[454..458], &1u32.to_le_bytes());
        assert_eq!(&image[458..462], &63u32.to_le_bytes());
        assert_eq!(&image[512..520], b"EFI PART");
    }

    #[test]
    fn disk_image_gpt_header_can_move() {
        let image = DiskImage::gpt(Uuid::nil()).gpt_header_at(8).build(64);
        assert_eq!(&image[454..458], &8u32.to_le_bytes());
        assert_eq!(&image[8 * 512..8 * 512 + 8], b"EFI PART");
    }

    #[test]
    fn disk_image_gpt_gap_leaves_zeroed_entry() {
        let image = DiskImage::gpt(Uuid::nil())
            .gpt_gap()
            .gpt_partition(GUID_LINUX_FS, Uuid::from_u128(1), 34, 63)
            .build(64);
        let entries = 2 * 512;
        assert!(image[entries..entries + 128].iter().all(|b| *b == 0));
        assert_eq!(
            &image[entries + 128..entries + 144],
            &GUID_LINUX_FS.to_bytes_le()
        );
    }

    #[test]
    fn fake_opener_denies_configured_devices() {
        let opener = FakeOpener::new()
            .with_device("sda", FakeDevice::new(vec![0u8; 512]))
            .with_denied("sdb");
        assert!(opener.open("sda", None).is_ok());
        assert!(matches!(
            opener.open("sdb", None),
            Err(PartError::PermissionDenied)
        ));
        assert!(matches!(
            opener.open("sdc", None),
            Err(PartError::DeviceNotFound(_))
        ));
    }
}
