//! A host platform for driving the controller: an in-memory storage stack,
//! device node registry and a RAM arena standing in for the reserved range.

#![allow(dead_code)]

use std::sync::Arc;

use kernel_device::devfs::NodeRegistry;
use kernel_geom::Topology;
use kernel_nvram::config::NvramConfig;
use kernel_nvram::controller::{NvramController, Platform};
use kernel_physical_memory::{PhysAddr, SmapEntry, SmapTable, SmapType};
use kernel_virtual_memory::RamBackedMapper;

pub const NVRAM_BASE: u64 = 0x100_0000;
pub const NVRAM_LEN: u64 = 0x10_0000;

pub struct Host {
    pub controller: NvramController,
    pub topology: Arc<Topology>,
    pub devfs: Arc<NodeRegistry>,
    pub ram: Arc<RamBackedMapper>,
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A firmware map the way a PC reports it, with the NVRAM range in it.
pub fn memory_map() -> Vec<SmapEntry> {
    vec![
        SmapEntry::new(0, 0x9_fc00, SmapType::MEMORY),
        SmapEntry::new(0x9_fc00, 0x400, SmapType::RESERVED),
        SmapEntry::new(0x10_0000, 0xf0_0000, SmapType::MEMORY),
        SmapEntry::new(NVRAM_BASE, NVRAM_LEN, SmapType::ARXCIS),
        SmapEntry::new(0x110_0000, 0x3ef0_0000, SmapType::MEMORY),
    ]
}

pub fn host_with(entries: Vec<SmapEntry>, ram: Arc<RamBackedMapper>) -> Host {
    init_logging();
    let topology = Arc::new(Topology::new());
    let devfs = Arc::new(NodeRegistry::new());
    let platform = Platform {
        memory_map: SmapTable::new(entries),
        mapper: ram.clone(),
        topology: topology.clone(),
        devfs: devfs.clone(),
    };
    Host {
        controller: NvramController::new(NvramConfig::default(), platform),
        topology,
        devfs,
        ram,
    }
}

pub fn host() -> Host {
    host_with(memory_map(), nvram_ram())
}

pub fn nvram_ram() -> Arc<RamBackedMapper> {
    Arc::new(RamBackedMapper::new(PhysAddr::new(NVRAM_BASE), NVRAM_LEN as usize))
}
