use crate::{PhysAddr, SmapType};

/// A contiguous range of physical memory taken from the firmware memory map.
///
/// Regions are created once by [`locate`](crate::locate) and never change
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Starting physical address of the region
    base: PhysAddr,
    /// Length of the region in bytes
    length: u64,
    /// Memory map type the region was reported with
    typ: SmapType,
}

impl MemoryRegion {
    pub const fn new(base: PhysAddr, length: u64, typ: SmapType) -> Self {
        Self { base, length, typ }
    }

    /// Returns the base address of this region.
    pub const fn base(&self) -> PhysAddr {
        self.base
    }

    /// Returns the length of this region in bytes.
    pub const fn len(&self) -> u64 {
        self.length
    }

    /// Returns true if this region contains no bytes.
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub const fn typ(&self) -> SmapType {
        self.typ
    }

    /// Returns the first address past the end of the region, or `None` if
    /// the region wraps the physical address space.
    pub const fn end(&self) -> Option<PhysAddr> {
        self.base.checked_add(self.length)
    }

    /// Returns true if `addr` lies inside this region.
    pub fn contains(&self, addr: PhysAddr) -> bool {
        addr >= self.base && (addr - self.base) < self.length
    }
}
