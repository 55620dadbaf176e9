//! GUID Partition Table decoding.
//!
//! The input is the header sector immediately followed by the entry array,
//! as read from the location the protective MBR points at.

use crate::{PartError, PartResult};
use crc::{Crc, CRC_32_ISO_HDLC};
use uuid::Uuid;

/// Logical block size assumed for GPT structures.
pub const GPT_BLOCK_SIZE: usize = 512;

const SIGNATURE: [u8; 8] = *b"EFI PART";
const MIN_HEADER_SIZE: usize = 92;
const MIN_ENTRY_SIZE: usize = 128;

const HEADER_SIZE_OFFSET: usize = 12;
const HEADER_CRC_OFFSET: usize = 16;
const DISK_GUID_OFFSET: usize = 56;
const ENTRY_COUNT_OFFSET: usize = 80;
const ENTRY_SIZE_OFFSET: usize = 84;
const ENTRIES_CRC_OFFSET: usize = 88;

const HASHER_ISO_HDLC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC32 as used by GPT headers and entry arrays.
pub fn crc32(data: &[u8]) -> u32 {
    HASHER_ISO_HDLC.checksum(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GptPartitionEntry {
    pub type_guid: Uuid,
    pub unique_guid: Uuid,
    pub first_lba: u64,
    pub last_lba: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptTable {
    pub disk_guid: Uuid,
    /// Used entries only, in entry-array order.
    pub partitions: Vec<GptPartitionEntry>,
}

impl GptTable {
    pub fn parse(buf: &[u8]) -> PartResult<Self> {
        if buf.len() < GPT_BLOCK_SIZE {
            return Err(malformed(format!(
                "need at least {} bytes for the header, got {}",
                GPT_BLOCK_SIZE,
                buf.len()
            )));
        }
        let (header, entries) = buf.split_at(GPT_BLOCK_SIZE);

        if header[..8] != SIGNATURE {
            return Err(malformed("missing \"EFI PART\" signature"));
        }

        let header_size = le_u32(header, HEADER_SIZE_OFFSET) as usize;
        if !(MIN_HEADER_SIZE..=GPT_BLOCK_SIZE).contains(&header_size) {
            return Err(malformed(format!("invalid header size {}", header_size)));
        }

        let expected_crc = le_u32(header, HEADER_CRC_OFFSET);
        let mut scratch = header[..header_size].to_vec();
        scratch[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].fill(0);
        let actual_crc = crc32(&scratch);
        if actual_crc != expected_crc {
            return Err(malformed(format!(
                "header CRC mismatch (stored {:#010x}, computed {:#010x})",
                expected_crc, actual_crc
            )));
        }

        let entry_count = le_u32(header, ENTRY_COUNT_OFFSET) as usize;
        let entry_size = le_u32(header, ENTRY_SIZE_OFFSET) as usize;
        if entry_size < MIN_ENTRY_SIZE
            || entry_size % MIN_ENTRY_SIZE != 0
            || !(entry_size / MIN_ENTRY_SIZE).is_power_of_two()
        {
            return Err(malformed(format!("invalid entry size {}", entry_size)));
        }

        let array_len = entry_count
            .checked_mul(entry_size)
            .filter(|len| *len <= entries.len())
            .ok_or_else(|| {
                malformed(format!(
                    "{} entries of {} bytes exceed the {} bytes read",
                    entry_count,
                    entry_size,
                    entries.len()
                ))
            })?;
        let array = &entries[..array_len];

        let expected_crc = le_u32(header, ENTRIES_CRC_OFFSET);
        let actual_crc = crc32(array);
        if actual_crc != expected_crc {
            return Err(malformed(format!(
                "entry array CRC mismatch (stored {:#010x}, computed {:#010x})",
                expected_crc, actual_crc
            )));
        }

        let mut partitions = Vec::new();
        for (index, raw) in array.chunks_exact(entry_size).enumerate() {
            let type_guid = guid_at(raw, 0);
            if type_guid.is_nil() {
                continue;
            }
            let entry = GptPartitionEntry {
                type_guid,
                unique_guid: guid_at(raw, 16),
                first_lba: le_u64(raw, 32),
                last_lba: le_u64(raw, 40),
            };
            if entry.last_lba < entry.first_lba {
                return Err(malformed(format!(
                    "entry {} ends ({}) before it starts ({})",
                    index, entry.last_lba, entry.first_lba
                )));
            }
            partitions.push(entry);
        }

        Ok(Self {
            disk_guid: guid_at(header, DISK_GUID_OFFSET),
            partitions,
        })
    }
}

fn malformed(reason: impl Into<String>) -> PartError {
    PartError::MalformedGpt(reason.into())
}

/// GUIDs are stored with the first three fields little-endian.
fn guid_at(raw: &[u8], offset: usize) -> Uuid {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&raw[offset..offset + 16]);
    Uuid::from_bytes_le(bytes)
}

fn le_u32(raw: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&raw[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn le_u64(raw: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
