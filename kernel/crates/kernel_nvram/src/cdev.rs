//! The character device frontend.
//!
//! Reads and writes copy straight against the mapped window under the device
//! lock; there is no queue and no worker.

use kernel_device::block::{check_aligned, check_range};
use kernel_device::{BlockDevice, DeviceError};
use kernel_virtual_memory::MappedWindow;
use log::trace;
use spin::Mutex;

use crate::IoctlError;
use crate::error::window_error;

/// Disk ioctls understood by [`NvramCharDevice::ioctl`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DiskIoctl {
    SectorSize,
    MediaSize,
    Flush,
    Delete { offset: u64, length: u64 },
    StripeSize,
    StripeOffset,
    Other(u64),
}

pub struct NvramCharDevice {
    name: String,
    sector_size: u32,
    stripe_size: u64,
    media_size: u64,
    /// `None` once the device has been destroyed.
    window: Mutex<Option<MappedWindow>>,
}

impl NvramCharDevice {
    #[must_use]
    pub fn new(name: impl Into<String>, sector_size: u32, stripe_size: u64, window: MappedWindow) -> Self {
        Self {
            name: name.into(),
            sector_size,
            stripe_size,
            media_size: window.len(),
            window: Mutex::new(Some(window)),
        }
    }

    /// Answers a disk ioctl. Queries return their value, commands `None`.
    ///
    /// # Errors
    /// [`IoctlError::Unknown`] for requests other than the disk ioctls,
    /// [`DeviceError::InvalidArgument`] for a misaligned delete and
    /// [`DeviceError::NotConfigured`] after the device is destroyed.
    pub fn ioctl(&self, request: DiskIoctl) -> Result<Option<u64>, IoctlError> {
        let value = match request {
            DiskIoctl::SectorSize => Some(u64::from(self.sector_size)),
            DiskIoctl::MediaSize => Some(self.media_size),
            DiskIoctl::StripeSize => Some(self.stripe_size),
            DiskIoctl::StripeOffset => Some(self.stripe_offset()),
            DiskIoctl::Flush => {
                self.flush()?;
                None
            }
            DiskIoctl::Delete { offset, length } => {
                self.delete(offset, length)?;
                None
            }
            DiskIoctl::Other(cmd) => return Err(IoctlError::Unknown(cmd)),
        };
        Ok(value)
    }

    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.window.lock().is_none()
    }

    /// Takes the window away from the device, waiting for a copy in
    /// progress. Every access afterwards fails with `NotConfigured`.
    pub(crate) fn revoke(&self) -> Option<MappedWindow> {
        self.window.lock().take()
    }
}

impl BlockDevice for NvramCharDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn media_size(&self) -> u64 {
        self.media_size
    }

    fn stripe_size(&self) -> u64 {
        self.stripe_size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, DeviceError> {
        check_range(self.media_size, offset, buf.len() as u64)?;
        let window = self.window.lock();
        let window = window.as_ref().ok_or(DeviceError::NotConfigured)?;
        window.read_at(offset, buf).map_err(window_error)?;
        trace!("{}: read {:#x} bytes at {offset:#x}", self.name, buf.len());
        Ok(buf.len())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize, DeviceError> {
        check_range(self.media_size, offset, buf.len() as u64)?;
        let mut window = self.window.lock();
        let window = window.as_mut().ok_or(DeviceError::NotConfigured)?;
        window.write_at(offset, buf).map_err(window_error)?;
        trace!("{}: wrote {:#x} bytes at {offset:#x}", self.name, buf.len());
        Ok(buf.len())
    }

    fn flush(&self) -> Result<(), DeviceError> {
        if self.is_revoked() {
            return Err(DeviceError::NotConfigured);
        }
        Ok(())
    }

    fn delete(&self, offset: u64, length: u64) -> Result<(), DeviceError> {
        check_aligned(self.sector_size, offset, length)?;
        if self.is_revoked() {
            return Err(DeviceError::NotConfigured);
        }
        Ok(())
    }
}
