//! Block device over firmware-reserved non-volatile memory.
//!
//! The loader's memory map names a physical range (SMAP type 12 by default)
//! that keeps its contents across reboots. [`NvramController`] finds that
//! range, maps it and publishes it either as a storage-stack provider whose
//! requests are served by an I/O worker thread, or as a character device
//! that copies synchronously. Destruction drains all outstanding requests
//! before the mapping is released.
//!
//! [`NvramController`]: controller::NvramController

pub mod cdev;
pub mod config;
pub mod controller;
pub mod ctl;
mod error;
pub mod provider;
pub mod worker;

pub use error::{ConfigError, ControlError, CreateError, IoctlError};
