//! Character Device Integration Tests

mod common;

use common::{NVRAM_BASE, NVRAM_LEN, host};
use kernel_device::{BlockDevice, DeviceError, errno};
use kernel_nvram::IoctlError;
use kernel_nvram::cdev::DiskIoctl;
use kernel_physical_memory::PhysAddr;

#[test]
fn sees_what_firmware_left_behind() {
    let host = host();
    assert!(host.ram.write_phys(PhysAddr::new(NVRAM_BASE + 0x200), b"crash log"));

    let _ = host.controller.create_chardev().unwrap();
    let node = host.devfs.lookup("nvram_blk_dev").unwrap();
    let mut buf = [0; 9];
    assert_eq!(node.read_at(0x200, &mut buf), Ok(9));
    assert_eq!(&buf, b"crash log");

    // mapped memory belongs to the device now
    assert!(!host.ram.write_phys(PhysAddr::new(NVRAM_BASE), b"x"));
}

#[test]
fn ioctls() {
    let host = host();
    let _ = host.controller.create_chardev().unwrap();
    let cdev = host.controller.chardev().unwrap();

    assert_eq!(cdev.ioctl(DiskIoctl::SectorSize), Ok(Some(512)));
    assert_eq!(cdev.ioctl(DiskIoctl::MediaSize), Ok(Some(NVRAM_LEN)));
    assert_eq!(cdev.ioctl(DiskIoctl::StripeSize), Ok(Some(4096)));
    assert_eq!(cdev.ioctl(DiskIoctl::StripeOffset), Ok(Some(0)));
    assert_eq!(
        cdev.ioctl(DiskIoctl::Delete {
            offset: 100,
            length: 512
        }),
        Err(IoctlError::Device(DeviceError::InvalidArgument))
    );
    assert_eq!(
        cdev.ioctl(DiskIoctl::Delete {
            offset: 512,
            length: 1024
        }),
        Ok(None)
    );

    let err = cdev.ioctl(DiskIoctl::Other(0x8004_6418)).unwrap_err();
    assert_eq!(err.errno(), errno::ENOIOCTL);
    assert!(host.controller.state().initialized);
}

#[test]
fn access_after_destroy_fails() {
    let host = host();
    let _ = host.controller.create_chardev().unwrap();
    let cdev = host.controller.chardev().unwrap();
    host.controller.destroy();

    assert!(host.devfs.lookup("nvram_blk_dev").is_none());
    let mut buf = [0; 16];
    let err = cdev.read_at(0, &mut buf).unwrap_err();
    assert_eq!(err, DeviceError::NotConfigured);
    assert_eq!(err.errno(), errno::ENXIO);
}

#[test]
fn out_of_range() {
    let host = host();
    let _ = host.controller.create_chardev().unwrap();
    let node = host.controller.block_device().unwrap();

    let err = node.write_at(NVRAM_LEN - 1, &[0; 2]).unwrap_err();
    assert_eq!(
        err,
        DeviceError::OutOfRange {
            offset: NVRAM_LEN - 1,
            len: 2
        }
    );
    assert_eq!(err.errno(), errno::EIO);
    assert_eq!(node.write_at(NVRAM_LEN - 2, &[0; 2]), Ok(2));
}
