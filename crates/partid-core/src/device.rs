//! Device open/read capability.
//!
//! The prober only needs positioned reads and an explicit close, so both the
//! real `/dev` backend and the in-memory fake implement the same small traits.

use crate::{PartError, PartResult};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Kernel `major:minor` pair of a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceNode {
    pub major: u32,
    pub minor: u32,
}

/// An open, readable block device (or anything that behaves like one).
pub trait DeviceHandle {
    /// Read up to `buf.len()` bytes starting at byte `offset`, returning the count read.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> PartResult<usize>;

    /// Release the underlying resource. Further reads are an error.
    fn close(&mut self) -> PartResult<()>;
}

/// Opens devices by kernel name (e.g. `sda`, `nvme0n1`) and, when known, by
/// their `major:minor` node.
pub trait DeviceOpener {
    type Handle: DeviceHandle;

    fn open(&self, name: &str, node: Option<DeviceNode>) -> PartResult<Self::Handle>;
}

/// Opens block devices read-only under `dev_root`.
///
/// Tries `<dev_root>/block/<major>:<minor>` first, then `<dev_root>/<name>`
/// with sysfs `!` separators turned back into `/` (`cciss!c0d0` lives at
/// `/dev/cciss/c0d0`).
#[derive(Debug, Clone)]
pub struct DevNodeOpener {
    dev_root: PathBuf,
}

impl DevNodeOpener {
    pub fn new(dev_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
        }
    }

    pub fn dev_root(&self) -> &Path {
        &self.dev_root
    }

    /// Node paths to try, in order.
    pub fn candidates(&self, name: &str, node: Option<DeviceNode>) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(node) = node {
            paths.push(
                self.dev_root
                    .join("block")
                    .join(format!("{}:{}", node.major, node.minor)),
            );
        }
        paths.push(self.dev_root.join(name.replace('!', "/")));
        paths
    }
}

impl Default for DevNodeOpener {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl DeviceOpener for DevNodeOpener {
    type Handle = FileDevice;

    fn open(&self, name: &str, node: Option<DeviceNode>) -> PartResult<FileDevice> {
        let mut last_err = PartError::DeviceNotFound(name.to_string());
        for path in self.candidates(name, node) {
            match FileDevice::open(&path) {
                Err(PartError::DeviceNotFound(missing)) => {
                    log::debug!("{}: no node at {}", name, missing);
                    last_err = PartError::DeviceNotFound(missing);
                }
                other => return other,
            }
        }
        Err(last_err)
    }
}

/// A device node or image file read with `pread(2)`.
#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    file: Option<File>,
}

impl FileDevice {
    pub fn open(path: &Path) -> PartResult<Self> {
        let file = File::open(path).map_err(|err| map_open_err(path, err))?;
        log::debug!("opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeviceHandle for FileDevice {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> PartResult<usize> {
        let file = self.file.as_ref().ok_or_else(|| {
            PartError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} is closed", self.path.display()),
            ))
        })?;
        let offset = libc::off_t::try_from(offset)
            .map_err(|_| PartError::Parse(format!("offset {} out of range", offset)))?;
        nix::sys::uio::pread(file, buf, offset).map_err(map_nix_err)
    }

    fn close(&mut self) -> PartResult<()> {
        if self.file.take().is_some() {
            log::debug!("closed {}", self.path.display());
        }
        Ok(())
    }
}

fn map_open_err(path: &Path, err: std::io::Error) -> PartError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => PartError::PermissionDenied,
        std::io::ErrorKind::NotFound => PartError::DeviceNotFound(path.display().to_string()),
        _ => PartError::Io(err),
    }
}

fn map_nix_err(err: nix::errno::Errno) -> PartError {
    use nix::errno::Errno;
    match err {
        Errno::EACCES | Errno::EPERM => PartError::PermissionDenied,
        other => PartError::Nix(other),
    }
}
