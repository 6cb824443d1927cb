//! Control commands accepted by [`NvramController::ioctl`](crate::controller::NvramController::ioctl).

use crate::ControlError;

const IOC_VOID: u64 = 0x2000_0000;

/// Encodes a parameterless ioctl number.
const fn io(group: u8, num: u8) -> u64 {
    IOC_VOID | ((group as u64) << 8) | num as u64
}

pub const NVRAM_GEOM_CREATE: u64 = io(b'N', 1);
pub const NVRAM_DEVFS_CREATE: u64 = io(b'N', 2);
pub const NVRAM_DESTROY: u64 = io(b'N', 3);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControlCommand {
    CreateProvider,
    CreateCharDevice,
    Destroy,
}

impl ControlCommand {
    #[must_use]
    pub const fn number(self) -> u64 {
        match self {
            Self::CreateProvider => NVRAM_GEOM_CREATE,
            Self::CreateCharDevice => NVRAM_DEVFS_CREATE,
            Self::Destroy => NVRAM_DESTROY,
        }
    }
}

impl TryFrom<u64> for ControlCommand {
    type Error = ControlError;

    fn try_from(cmd: u64) -> Result<Self, Self::Error> {
        match cmd {
            NVRAM_GEOM_CREATE => Ok(Self::CreateProvider),
            NVRAM_DEVFS_CREATE => Ok(Self::CreateCharDevice),
            NVRAM_DESTROY => Ok(Self::Destroy),
            _ => Err(ControlError::NotSupported(cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(NVRAM_GEOM_CREATE, 0x2000_4e01);
        assert_eq!(NVRAM_DEVFS_CREATE, 0x2000_4e02);
        assert_eq!(NVRAM_DESTROY, 0x2000_4e03);
    }

    #[test]
    fn test_decode() {
        for cmd in [
            ControlCommand::CreateProvider,
            ControlCommand::CreateCharDevice,
            ControlCommand::Destroy,
        ] {
            assert_eq!(ControlCommand::try_from(cmd.number()).unwrap(), cmd);
        }
        assert!(matches!(
            ControlCommand::try_from(0x2000_4e04),
            Err(ControlError::NotSupported(0x2000_4e04))
        ));
    }
}
