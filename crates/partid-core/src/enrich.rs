//! Best-effort enrichment of enumerated devices with partition identity.
//!
//! This is the only place where probe failures are downgraded: a device that
//! cannot be opened or probed keeps its OS geometry and simply has no
//! PTUUID/PARTUUID fields.

use crate::device::DeviceOpener;
use crate::probe::probe_device;
use crate::reconcile::attach_partuuids;
use crate::sysfs::block::BlockDeviceInfo;
use std::io;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Probed,
    /// Probe failed; the reason is kept for diagnostics.
    Skipped(String),
}

impl Enrichment {
    pub fn is_probed(&self) -> bool {
        matches!(self, Enrichment::Probed)
    }
}

pub fn enrich_device<O: DeviceOpener + ?Sized>(
    opener: &O,
    device: &mut BlockDeviceInfo,
) -> Enrichment {
    match probe_device(opener, &device.name, Some(device.device_node)) {
        Ok(table) => {
            log::debug!(
                "{}: {} probed partition(s), PTUUID {:?}",
                device.name,
                table.partitions.len(),
                table.ptuuid
            );
            attach_partuuids(&mut device.partitions, &table.partitions);
            device.ptuuid = table.ptuuid;
            Enrichment::Probed
        }
        Err(err) => {
            if err.is_access_denied() {
                log::info!(
                    "{}: no read access, partition identity unavailable",
                    device.name
                );
            } else {
                log::warn!("{}: probe failed: {}", device.name, err);
            }
            device.ptuuid = None;
            for part in device.partitions.iter_mut() {
                part.partuuid = None;
            }
            Enrichment::Skipped(err.to_string())
        }
    }
}

/// Probes every device on its own thread. Outcomes are returned in input order.
///
/// A device whose worker thread cannot be created (e.g. under a pids limit)
/// is skipped, not fatal.
pub fn enrich_all<O: DeviceOpener + Sync + ?Sized>(
    opener: &O,
    devices: &mut [BlockDeviceInfo],
) -> Vec<Enrichment> {
    thread::scope(|scope| {
        let handles: Vec<_> = devices
            .iter_mut()
            .map(|device| {
                let name = device.name.clone();
                thread::Builder::new()
                    .name(format!("probe-{}", name))
                    .spawn_scoped(scope, move || enrich_device(opener, device))
                    .map_err(|err| spawn_failed(&name, &err))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Enrichment::Skipped("probe thread panicked".to_string())),
                Err(skipped) => skipped,
            })
            .collect()
    })
}

fn spawn_failed(name: &str, err: &io::Error) -> Enrichment {
    log::warn!("{}: could not start probe thread: {}", name, err);
    Enrichment::Skipped(format!("could not start probe thread: {}", err))
}
