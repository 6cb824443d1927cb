#![no_std]
extern crate alloc;

use alloc::string::String;

use thiserror::Error;

pub mod block;
pub mod devfs;
pub mod errno;

pub use block::BlockDevice;

/// Per-request failure of a storage device.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum DeviceError {
    #[error("operation not supported")]
    NotSupported,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("access of {len:#x} bytes at offset {offset:#x} is beyond the end of the device")]
    OutOfRange { offset: u64, len: u64 },
    #[error("device not configured")]
    NotConfigured,
}

impl DeviceError {
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::NotSupported => errno::EOPNOTSUPP,
            Self::InvalidArgument => errno::EINVAL,
            Self::OutOfRange { .. } => errno::EIO,
            Self::NotConfigured => errno::ENXIO,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RegisterDeviceError {
    #[error("device {0} is already registered")]
    AlreadyRegistered(String),
    #[error("invalid device name {0:?}")]
    InvalidName(String),
}
