//! Error numbers reported to the kernel side of the device interfaces.

pub const ENOENT: i32 = 2;
pub const EIO: i32 = 5;
pub const ENXIO: i32 = 6;
pub const ENOMEM: i32 = 12;
pub const EEXIST: i32 = 17;
pub const EINVAL: i32 = 22;
pub const ENOTTY: i32 = 25;
pub const EOPNOTSUPP: i32 = 45;

/// Returned by a device ioctl handler for a request it does not know, so the
/// caller can try the generic handlers.
pub const ENOIOCTL: i32 = -3;
