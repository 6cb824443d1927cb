//! Creation and destruction of the NVRAM device.
//!
//! At most one device exists per controller, either as a storage-stack
//! provider served by an I/O worker or as a character device. The controller
//! owns everything the device is made of and tears it down in the reverse
//! order of creation.

use std::sync::Arc;

use kernel_device::devfs::{DevFs, NodeHandle};
use kernel_device::{BlockDevice, DeviceError};
use kernel_geom::{BioQueue, GeomTopology, ProviderHandle};
use kernel_physical_memory::{MemoryRegion, SmapTable};
use kernel_virtual_memory::{MappedWindow, PhysicalMapper};
use log::{error, info, warn};
use parking_lot::Mutex;

use crate::cdev::NvramCharDevice;
use crate::config::NvramConfig;
use crate::ctl::ControlCommand;
use crate::provider::NvramProvider;
use crate::worker::BioWorker;
use crate::{ControlError, CreateError};

/// What the controller needs from the rest of the kernel.
#[derive(Clone)]
pub struct Platform {
    pub memory_map: SmapTable,
    pub mapper: Arc<dyn PhysicalMapper>,
    pub topology: Arc<dyn GeomTopology>,
    pub devfs: Arc<dyn DevFs>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DiskType {
    None,
    Provider,
    CharDevice,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceState {
    pub disk_type: DiskType,
    pub initialized: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[must_use]
pub enum CreateStatus {
    Created,
    /// A device already exists; nothing was changed.
    AlreadyCreated,
}

struct ProviderDevice {
    region: MemoryRegion,
    provider: Arc<NvramProvider>,
    handle: ProviderHandle,
    worker: BioWorker,
}

struct CharDevice {
    region: MemoryRegion,
    cdev: Arc<NvramCharDevice>,
    handle: NodeHandle,
}

enum Device {
    None,
    Provider(ProviderDevice),
    CharDevice(CharDevice),
}

impl Device {
    fn state(&self) -> DeviceState {
        let disk_type = match self {
            Self::None => DiskType::None,
            Self::Provider(_) => DiskType::Provider,
            Self::CharDevice(_) => DiskType::CharDevice,
        };
        DeviceState {
            disk_type,
            initialized: disk_type != DiskType::None,
        }
    }
}

pub struct NvramController {
    config: NvramConfig,
    platform: Platform,
    device: Mutex<Device>,
}

impl NvramController {
    #[must_use]
    pub fn new(config: NvramConfig, platform: Platform) -> Self {
        Self {
            config,
            platform,
            device: Mutex::new(Device::None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &NvramConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.device.lock().state()
    }

    /// The region backing the current device.
    #[must_use]
    pub fn region(&self) -> Option<MemoryRegion> {
        match &*self.device.lock() {
            Device::None => None,
            Device::Provider(dev) => Some(dev.region),
            Device::CharDevice(dev) => Some(dev.region),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Option<Arc<NvramProvider>> {
        match &*self.device.lock() {
            Device::Provider(dev) => Some(dev.provider.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn chardev(&self) -> Option<Arc<NvramCharDevice>> {
        match &*self.device.lock() {
            Device::CharDevice(dev) => Some(dev.cdev.clone()),
            _ => None,
        }
    }

    /// The current device through the frontend-independent interface.
    #[must_use]
    pub fn block_device(&self) -> Option<Arc<dyn BlockDevice>> {
        match &*self.device.lock() {
            Device::None => None,
            Device::Provider(dev) => Some(dev.provider.clone()),
            Device::CharDevice(dev) => Some(dev.cdev.clone()),
        }
    }

    fn map_region(&self) -> Result<(MemoryRegion, MappedWindow), CreateError> {
        let region = self.platform.memory_map.locate(self.config.smap_type())?;
        info!(
            "nvram: found memory at {} of size {:#x}",
            region.base(),
            region.len()
        );
        let window = MappedWindow::map(self.platform.mapper.clone(), region)?;
        Ok((region, window))
    }

    /// Creates the device as a storage-stack provider.
    ///
    /// # Errors
    /// Returns [`CreateError`] if any creation step fails; nothing is left
    /// behind in that case.
    pub fn create_provider(&self) -> Result<CreateStatus, CreateError> {
        let mut device = self.device.lock();
        if device.state().initialized {
            warn!("nvram: device already created");
            return Ok(CreateStatus::AlreadyCreated);
        }

        let created = self.build_provider().inspect_err(|e| error!("nvram: create failed: {e}"))?;
        info!(
            "nvram: provider {} created with {:#x} bytes",
            created.handle.name(),
            created.region.len()
        );
        *device = Device::Provider(created);
        Ok(CreateStatus::Created)
    }

    fn build_provider(&self) -> Result<ProviderDevice, CreateError> {
        let (region, window) = self.map_region()?;

        let queue = Arc::new(BioQueue::new());
        let worker = BioWorker::spawn(&self.config.worker_name, queue.clone(), window)?;

        let name = self.config.provider_name();
        let provider = Arc::new(NvramProvider::new(
            &name,
            self.config.sector_size,
            self.config.stripe_size,
            region.len(),
            queue,
        ));
        let registered = self.platform.topology.register_provider(
            &name,
            self.config.sector_size,
            region.len(),
            provider.clone(),
        );
        let handle = match registered {
            Ok(handle) => handle,
            Err(e) => {
                drop(worker.stop());
                return Err(e.into());
            }
        };

        Ok(ProviderDevice {
            region,
            provider,
            handle,
            worker,
        })
    }

    /// Creates the device as a character device node.
    ///
    /// # Errors
    /// Returns [`CreateError`] if any creation step fails; nothing is left
    /// behind in that case.
    pub fn create_chardev(&self) -> Result<CreateStatus, CreateError> {
        let mut device = self.device.lock();
        if device.state().initialized {
            warn!("nvram: device already created");
            return Ok(CreateStatus::AlreadyCreated);
        }

        let created = self.build_chardev().inspect_err(|e| error!("nvram: create failed: {e}"))?;
        info!(
            "nvram: /dev/{} created with {:#x} bytes",
            created.handle.name(),
            created.region.len()
        );
        *device = Device::CharDevice(created);
        Ok(CreateStatus::Created)
    }

    fn build_chardev(&self) -> Result<CharDevice, CreateError> {
        let (region, window) = self.map_region()?;

        let cdev = Arc::new(NvramCharDevice::new(
            &self.config.device_name,
            self.config.sector_size,
            self.config.stripe_size,
            window,
        ));
        let registered = self.platform.devfs.register_node(
            &self.config.device_name,
            self.config.node_permissions(),
            cdev.clone(),
        );
        let handle = match registered {
            Ok(handle) => handle,
            Err(e) => {
                drop(cdev.revoke());
                return Err(e.into());
            }
        };

        Ok(CharDevice {
            region,
            cdev,
            handle,
        })
    }

    /// Tears the device down. Destroying when nothing exists does nothing.
    pub fn destroy(&self) {
        let mut device = self.device.lock();
        match std::mem::replace(&mut *device, Device::None) {
            Device::None => info!("nvram: no device to destroy"),
            Device::Provider(dev) => {
                let window = dev.worker.stop();
                self.platform
                    .topology
                    .withdraw(dev.handle, DeviceError::NotConfigured);
                drop(window);
                info!("nvram: provider destroyed, released {}", dev.region.base());
            }
            Device::CharDevice(dev) => {
                self.platform.devfs.unregister(dev.handle);
                drop(dev.cdev.revoke());
                info!("nvram: char device destroyed, released {}", dev.region.base());
            }
        }
    }

    /// Runs a control command by number.
    ///
    /// # Errors
    /// [`ControlError::NotSupported`] for unknown commands, otherwise the
    /// creation error.
    pub fn ioctl(&self, cmd: u64) -> Result<(), ControlError> {
        match ControlCommand::try_from(cmd)? {
            ControlCommand::CreateProvider => {
                let _ = self.create_provider()?;
            }
            ControlCommand::CreateCharDevice => {
                let _ = self.create_chardev()?;
            }
            ControlCommand::Destroy => self.destroy(),
        }
        Ok(())
    }

    /// Module unload: removes the device if there is one.
    pub fn shutdown(&self) {
        if self.state().initialized {
            self.destroy();
        }
    }
}

impl Drop for NvramController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use kernel_device::devfs::NodeRegistry;
    use kernel_geom::Topology;
    use kernel_physical_memory::{PhysAddr, SmapEntry, SmapType};
    use kernel_virtual_memory::RamBackedMapper;

    use super::*;

    const BASE: u64 = 0x100_0000;
    const LEN: u64 = 0x1_0000;

    fn controller() -> (NvramController, Arc<Topology>, Arc<NodeRegistry>) {
        let topology = Arc::new(Topology::new());
        let devfs = Arc::new(NodeRegistry::new());
        let platform = Platform {
            memory_map: SmapTable::new(vec![
                SmapEntry::new(0, 0x9_fc00, SmapType::MEMORY),
                SmapEntry::new(BASE, LEN, SmapType::ARXCIS),
            ]),
            mapper: Arc::new(RamBackedMapper::new(PhysAddr::new(BASE), LEN as usize)),
            topology: topology.clone(),
            devfs: devfs.clone(),
        };
        (
            NvramController::new(NvramConfig::default(), platform),
            topology,
            devfs,
        )
    }

    #[test]
    fn test_initial_state() {
        let (controller, _, _) = controller();
        assert_eq!(
            controller.state(),
            DeviceState {
                disk_type: DiskType::None,
                initialized: false
            }
        );
        assert!(controller.block_device().is_none());
        assert!(controller.region().is_none());
    }

    #[test]
    fn test_provider_lifecycle() {
        let (controller, topology, devfs) = controller();
        assert_eq!(controller.create_provider().unwrap(), CreateStatus::Created);
        assert_eq!(controller.state().disk_type, DiskType::Provider);
        assert_eq!(topology.info("nvram_blk_dev0").unwrap().media_size, LEN);
        assert!(devfs.is_empty());
        assert!(controller.provider().is_some());
        assert!(controller.chardev().is_none());

        controller.destroy();
        assert_eq!(controller.state().disk_type, DiskType::None);
        assert!(topology.is_empty());
    }

    #[test]
    fn test_chardev_lifecycle() {
        let (controller, topology, devfs) = controller();
        assert_eq!(controller.create_chardev().unwrap(), CreateStatus::Created);
        assert_eq!(controller.state().disk_type, DiskType::CharDevice);
        assert!(devfs.lookup("nvram_blk_dev").is_some());
        assert!(topology.is_empty());

        controller.destroy();
        assert!(devfs.is_empty());
        assert!(!controller.state().initialized);
    }

    #[test]
    fn test_second_create_is_reported() {
        let (controller, _, _) = controller();
        assert_eq!(controller.create_chardev().unwrap(), CreateStatus::Created);
        assert_eq!(
            controller.create_provider().unwrap(),
            CreateStatus::AlreadyCreated
        );
        assert_eq!(controller.state().disk_type, DiskType::CharDevice);
    }

    #[test]
    fn test_ioctl() {
        let (controller, _, _) = controller();
        controller.ioctl(crate::ctl::NVRAM_GEOM_CREATE).unwrap();
        controller.ioctl(crate::ctl::NVRAM_DEVFS_CREATE).unwrap();
        assert_eq!(controller.state().disk_type, DiskType::Provider);
        controller.ioctl(crate::ctl::NVRAM_DESTROY).unwrap();
        assert!(!controller.state().initialized);

        let err = controller.ioctl(0xdead).unwrap_err();
        assert_eq!(err.errno(), kernel_device::errno::ENOTTY);
    }

    #[test]
    fn test_drop_destroys() {
        let (controller, topology, _) = controller();
        let _ = controller.create_provider().unwrap();
        drop(controller);
        assert!(topology.is_empty());
    }
}
