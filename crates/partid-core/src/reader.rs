//! Exact-length positioned reads.

use crate::device::DeviceHandle;
use crate::{PartError, PartResult};

/// Reads exactly `length` bytes at `offset` with a single request.
///
/// Any shortfall (end of device, truncated I/O) is reported as
/// [`PartError::ShortRead`]. There are no retries.
pub fn read_exactly<D: DeviceHandle + ?Sized>(
    device: &mut D,
    offset: u64,
    length: usize,
) -> PartResult<Vec<u8>> {
    let mut buf = vec![0u8; length];
    let actual = device.read_at(&mut buf, offset)?;
    if actual != length {
        return Err(PartError::ShortRead {
            offset,
            expected: length,
            actual,
        });
    }
    Ok(buf)
}
