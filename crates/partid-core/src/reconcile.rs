//! Joins OS-reported partition geometry with probed partition identities.
//!
//! Matching is by exact `(start, end)` sector range. Anything else (overlap,
//! containment, off-by-one) leaves the OS partition without a PARTUUID.

use crate::probe::ProbedPartition;
use crate::sysfs::block::PartitionInfo;
use serde::Serialize;
use std::collections::HashMap;

/// Geometry of a partition as reported by the operating system.
pub trait OsPartitionGeometry {
    fn name(&self) -> &str;
    fn start_in_sectors(&self) -> u64;
    fn size_in_sectors(&self) -> u64;

    /// Inclusive end sector; `None` for zero-sized partitions.
    fn end_in_sectors(&self) -> Option<u64> {
        let size = self.size_in_sectors();
        if size == 0 {
            return None;
        }
        self.start_in_sectors().checked_add(size - 1)
    }
}

/// Plain OS geometry record, for callers that do not go through sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsPartition {
    pub name: String,
    pub start_in_sectors: u64,
    pub size_in_sectors: u64,
}

impl OsPartition {
    pub fn new(name: impl Into<String>, start_in_sectors: u64, size_in_sectors: u64) -> Self {
        Self {
            name: name.into(),
            start_in_sectors,
            size_in_sectors,
        }
    }
}

impl OsPartitionGeometry for OsPartition {
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
pub struct ReconciledPartition {
    pub name: String,
    pub start_in_sectors: u64,
    pub size_in_sectors: u64,
    #[serde(rename = "PARTUUID", skip_serializing_if = "Option::is_none")]
    pub partuuid: Option<String>,
}

/// Lookup of probed PARTUUIDs by inclusive sector range.
#[derive(Debug, Clone, Default)]
pub struct PartuuidIndex<'a> {
    by_range: HashMap<(u64, u64), &'a str>,
}

impl<'a> PartuuidIndex<'a> {
    /// Duplicate ranges keep the first probed entry.
    pub fn new(probed: &'a [ProbedPartition]) -> Self {
        let mut by_range = HashMap::with_capacity(probed.len());
        for part in probed {
            let key = (part.start_in_sectors, part.end_in_sectors);
            if by_range.contains_key(&key) {
                log::debug!(
                    "duplicate probed range {}..={}; keeping the first PARTUUID",
                    key.0,
                    key.1
                );
                continue;
            }
            by_range.insert(key, part.partuuid.as_str());
        }
        Self { by_range }
    }

    pub fn lookup<G: OsPartitionGeometry + ?Sized>(&self, partition: &G) -> Option<&'a str> {
        let end = partition.end_in_sectors()?;
        self.by_range
            .get(&(partition.start_in_sectors(), end))
            .copied()
    }
}

/// Attaches a PARTUUID to every OS partition whose range matches a probed one.
pub fn reconcile<G: OsPartitionGeometry>(
    os_partitions: &[G],
    probed: &[ProbedPartition],
) -> Vec<ReconciledPartition> {
    let index = PartuuidIndex::new(probed);
    os_partitions
        .iter()
        .map(|part| {
            let partuuid = index.lookup(part).map(str::to_string);
            if partuuid.is_none() {
                log::debug!("no probed partition matches {}", part.name());
            }
            ReconciledPartition {
                name: part.name().to_string(),
                start_in_sectors: part.start_in_sectors(),
                size_in_sectors: part.size_in_sectors(),
                partuuid,
            }
        })
        .collect()
}

/// In-place variant of [`reconcile`] for enumerated sysfs partitions.
/// Unmatched partitions have their PARTUUID cleared.
pub fn attach_partuuids(partitions: &mut [PartitionInfo], probed: &[ProbedPartition]) {
    let index = PartuuidIndex::new(probed);
    for part in partitions.iter_mut() {
        part.partuuid = index.lookup(&*part).map(str::to_string);
    }
}
