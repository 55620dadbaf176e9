//! partid core library.
//!
//! Probes MBR/GPT partition tables on block devices, derives stable
//! PTUUID/PARTUUID identifiers, and reconciles them with the partition
//! geometry the kernel reports in sysfs.

pub mod device;
pub mod enrich;
pub mod error;
pub mod fake_device;
pub mod gpt;
pub mod guards;
pub mod legacy;
pub mod mbr;
pub mod path;
pub mod probe;
pub mod reader;
pub mod reconcile;
pub mod sysfs;

pub use device::{DevNodeOpener, DeviceHandle, DeviceNode, DeviceOpener, FileDevice};
pub use enrich::{enrich_all, enrich_device, Enrichment};
pub use error::{PartError, PartResult};
pub use fake_device::{DiskImage, FakeDevice, FakeOpener};
pub use guards::DeviceGuard;
pub use legacy::synthesize_partuuid;
pub use probe::{probe, probe_device, probe_path, ProbedPartition, ProbedTable};
pub use reader::read_exactly;
pub use reconcile::{reconcile, OsPartition, OsPartitionGeometry, ReconciledPartition};
pub use sysfs::block::{find_all, find_by_device_path, find_by_name, BlockDeviceInfo, PartitionInfo};
