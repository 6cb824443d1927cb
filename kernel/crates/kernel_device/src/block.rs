use crate::DeviceError;

/// The surface every block device frontend offers, no matter how requests
/// reach the backing store.
pub trait BlockDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Smallest addressable unit in bytes.
    fn sector_size(&self) -> u32;

    /// Total size of the device in bytes.
    fn media_size(&self) -> u64;

    fn stripe_size(&self) -> u64;

    fn stripe_offset(&self) -> u64 {
        0
    }

    /// Reads `buf.len()` bytes at `offset`, returning the number of bytes read.
    ///
    /// # Errors
    /// Returns [`DeviceError::OutOfRange`] if the range exceeds the media and
    /// [`DeviceError::NotConfigured`] if the device is gone.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, DeviceError>;

    /// Writes `buf` at `offset`, returning the number of bytes written.
    ///
    /// # Errors
    /// See [`read_at`](Self::read_at).
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize, DeviceError>;

    /// # Errors
    /// Returns [`DeviceError::NotConfigured`] if the device is gone.
    fn flush(&self) -> Result<(), DeviceError>;

    /// Discards `length` bytes at `offset`.
    ///
    /// # Errors
    /// Returns [`DeviceError::InvalidArgument`] unless both values are
    /// multiples of the sector size.
    fn delete(&self, offset: u64, length: u64) -> Result<(), DeviceError>;
}

/// Checks that `[offset, offset + len)` lies within a device of `media_size` bytes.
///
/// # Errors
/// Returns [`DeviceError::OutOfRange`] otherwise.
pub fn check_range(media_size: u64, offset: u64, len: u64) -> Result<(), DeviceError> {
    match offset.checked_add(len) {
        Some(end) if end <= media_size => Ok(()),
        _ => Err(DeviceError::OutOfRange { offset, len }),
    }
}

/// Checks that a delete range starts and ends on sector boundaries.
///
/// # Errors
/// Returns [`DeviceError::InvalidArgument`] otherwise.
pub fn check_aligned(sector_size: u32, offset: u64, length: u64) -> Result<(), DeviceError> {
    let sector_size = u64::from(sector_size);
    if sector_size == 0 || offset % sector_size != 0 || length % sector_size != 0 {
        return Err(DeviceError::InvalidArgument);
    }
    Ok(())
}
