use crate::device::DeviceHandle;
use crate::PartResult;

/// RAII guard that closes a device handle when dropped.
#[derive(Debug)]
pub struct DeviceGuard<D: DeviceHandle> {
    name: String,
    handle: D,
    active: bool,
}

impl<D: DeviceHandle> DeviceGuard<D> {
    pub fn new(name: impl Into<String>, handle: D) -> Self {
        Self {
            name: name.into(),
            handle,
            active: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle_mut(&mut self) -> &mut D {
        &mut self.handle
    }

    /// Close now and surface the close error instead of logging it.
    pub fn close(mut self) -> PartResult<()> {
        self.active = false;
        self.handle.close()
    }
}

impl<D: DeviceHandle> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = self.handle.close() {
            log::warn!("device guard failed to close {}: {}", self.name, err);
        }
    }
}
