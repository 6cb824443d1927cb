use kernel_device::{DeviceError, RegisterDeviceError, errno};
use kernel_physical_memory::LocateError;
use kernel_virtual_memory::{MapError, WindowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("nvram memory not found: {0}")]
    NotFound(#[from] LocateError),
    #[error("could not add the nvram memory to the address map: {0}")]
    MapFailed(#[from] MapError),
    #[error("could not register nvram device: {0}")]
    Register(#[from] RegisterDeviceError),
    #[error("could not spawn nvram I/O worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

impl CreateError {
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) => errno::ENOENT,
            Self::MapFailed(_) | Self::WorkerSpawn(_) => errno::ENOMEM,
            Self::Register(RegisterDeviceError::AlreadyRegistered(_)) => errno::EEXIST,
            Self::Register(RegisterDeviceError::InvalidName(_)) => errno::EINVAL,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("unknown control command {0:#x}")]
    NotSupported(u64),
    #[error(transparent)]
    Create(#[from] CreateError),
}

impl ControlError {
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotSupported(_) => errno::ENOTTY,
            Self::Create(e) => e.errno(),
        }
    }
}

/// Failure of a character device ioctl.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum IoctlError {
    /// Not a disk ioctl; the caller should fall back to the generic handlers.
    #[error("unknown ioctl {0:#x}")]
    Unknown(u64),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl IoctlError {
    #[must_use]
    pub fn errno(self) -> i32 {
        match self {
            Self::Unknown(_) => errno::ENOIOCTL,
            Self::Device(e) => e.errno(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("sector size {0} is not a power of two")]
    SectorSize(u32),
    #[error("stripe size {stripe_size} is not a multiple of the sector size {sector_size}")]
    StripeSize { stripe_size: u64, sector_size: u32 },
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
}

pub(crate) fn window_error(error: WindowError) -> DeviceError {
    match error {
        WindowError::OutOfRange { offset, len, .. } => DeviceError::OutOfRange { offset, len },
    }
}
