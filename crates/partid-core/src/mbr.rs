//! Master Boot Record decoding.
//!
//! Only the four primary slots are decoded. Extended/logical partitions are
//! reported as plain primary entries and never followed.

/// Size of the boot sector (LBA 0).
pub const BOOT_SECTOR_SIZE: usize = 512;

const DISK_SIGNATURE_OFFSET: usize = 440;
const PARTITION_TABLE_OFFSET: usize = 446;
const PARTITION_ENTRY_SIZE: usize = 16;
const BOOT_SIGNATURE_OFFSET: usize = 510;
const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Partition type of the single entry in a protective MBR.
pub const PROTECTIVE_MBR_TYPE: u8 = 0xEE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MbrPartitionEntry {
    pub kind: u8,
    pub first_lba: u32,
    pub sector_count: u32,
}

impl MbrPartitionEntry {
    fn parse(raw: &[u8]) -> Self {
        Self {
            kind: raw[4],
            first_lba: le_u32(&raw[8..12]),
            sector_count: le_u32(&raw[12..16]),
        }
    }

    /// Only a zero type marks an empty slot.
    pub fn is_used(&self) -> bool {
        self.kind != 0
    }

    pub fn is_protective(&self) -> bool {
        self.kind == PROTECTIVE_MBR_TYPE
    }

    /// Inclusive last sector. A zero-length slot ends one sector before it
    /// starts; `None` when that would fall before LBA 0.
    pub fn last_lba(&self) -> Option<u64> {
        (u64::from(self.first_lba) + u64::from(self.sector_count)).checked_sub(1)
    }
}

/// A decoded MBR. Slots keep their on-disk order, unused ones included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbrTable {
    pub signature: u32,
    pub partitions: [MbrPartitionEntry; 4],
}

impl MbrTable {
    /// Decodes a boot sector. Returns `None` if it does not carry the `0x55AA`
    /// boot signature, i.e. there is no partition table.
    pub fn parse(sector: &[u8]) -> Option<Self> {
        if sector.len() < BOOT_SECTOR_SIZE {
            return None;
        }
        if sector[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2] != BOOT_SIGNATURE {
            return None;
        }

        let mut partitions = [MbrPartitionEntry::default(); 4];
        for (slot, entry) in partitions.iter_mut().enumerate() {
            let start = PARTITION_TABLE_OFFSET + slot * PARTITION_ENTRY_SIZE;
            *entry = MbrPartitionEntry::parse(&sector[start..start + PARTITION_ENTRY_SIZE]);
        }

        Some(Self {
            signature: le_u32(&sector[DISK_SIGNATURE_OFFSET..DISK_SIGNATURE_OFFSET + 4]),
            partitions,
        })
    }

    /// First slot typed `0xEE`, if the disk is GPT-protected.
    pub fn protective_entry(&self) -> Option<&MbrPartitionEntry> {
        self.partitions.iter().find(|entry| entry.is_protective())
    }

    /// Used slots paired with their 1-based physical slot number.
    pub fn used_entries(&self) -> impl Iterator<Item = (u32, &MbrPartitionEntry)> {
        self.partitions
            .iter()
            .zip(1u32..)
            .filter(|(entry, _)| entry.is_used())
            .map(|(entry, ordinal)| (ordinal, entry))
    }
}

fn le_u32(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}
