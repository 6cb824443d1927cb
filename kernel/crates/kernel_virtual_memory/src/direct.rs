use kernel_physical_memory::PhysAddr;

use crate::live::LiveMappings;
use crate::{PhysicalMapper, VirtAddr};

/// Maps physical memory through a higher half direct map (HHDM): every
/// physical address is reachable at `phys + offset`.
#[derive(Debug)]
pub struct DirectMap {
    offset: u64,
    live: LiveMappings,
}

impl DirectMap {
    /// # Safety
    /// Every physical range later passed to [`PhysicalMapper::map`] must be
    /// mapped readable and writable at `phys + offset`, and nothing else may
    /// access it while it is mapped through this mapper.
    #[must_use]
    pub const unsafe fn new(offset: u64) -> Self {
        Self {
            offset,
            live: LiveMappings::new(),
        }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub const fn phys_to_virt(&self, phys: PhysAddr) -> Option<VirtAddr> {
        match phys.as_u64().checked_add(self.offset) {
            Some(v) => Some(VirtAddr::new(v)),
            None => None,
        }
    }
}

// SAFETY: the caller of `DirectMap::new` vouches for the direct map, and
// `LiveMappings` refuses aliasing requests.
unsafe impl PhysicalMapper for DirectMap {
    fn map(&self, base: PhysAddr, len: u64) -> Option<VirtAddr> {
        let start = self.phys_to_virt(base)?;
        start.as_u64().checked_add(len)?;
        if !self.live.insert(base, len) {
            return None;
        }
        Some(start)
    }

    unsafe fn unmap(&self, base: PhysAddr, len: u64) {
        self.live.remove(base, len);
    }
}
