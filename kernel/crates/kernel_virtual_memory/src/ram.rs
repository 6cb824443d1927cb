use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt::{Debug, Formatter};

use kernel_physical_memory::PhysAddr;

use crate::live::LiveMappings;
use crate::{PhysicalMapper, VirtAddr};

/// A mapper backed by ordinary heap memory standing in for the physical
/// range `[base, base + len)`.
///
/// Contents survive unmapping, the same way battery-backed memory survives a
/// device being torn down, so data written through one window is visible to
/// the next window over the same range.
pub struct RamBackedMapper {
    base: PhysAddr,
    ram: Box<[UnsafeCell<u8>]>,
    live: LiveMappings,
}

// SAFETY: the arena is only reached through raw pointers handed out by `map`,
// and `LiveMappings` guarantees those never alias. `read_phys`/`write_phys`
// refuse ranges that are currently mapped.
unsafe impl Sync for RamBackedMapper {}

impl Debug for RamBackedMapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RamBackedMapper")
            .field("base", &self.base)
            .field("len", &self.ram.len())
            .finish_non_exhaustive()
    }
}

impl RamBackedMapper {
    #[must_use]
    pub fn new(base: PhysAddr, len: usize) -> Self {
        Self {
            base,
            ram: (0..len).map(|_| UnsafeCell::new(0)).collect(),
            live: LiveMappings::new(),
        }
    }

    #[must_use]
    pub fn base(&self) -> PhysAddr {
        self.base
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ram.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ram.is_empty()
    }

    /// Returns the arena offset of `[addr, addr + len)`, or `None` if the
    /// range is not completely backed.
    fn arena_offset(&self, addr: PhysAddr, len: u64) -> Option<usize> {
        if addr < self.base {
            return None;
        }
        let offset = addr - self.base;
        let end = offset.checked_add(len)?;
        if end > self.ram.len() as u64 {
            return None;
        }
        usize::try_from(offset).ok()
    }

    fn arena_ptr(&self, offset: usize) -> *mut u8 {
        // SAFETY: callers pass offsets obtained from `arena_offset`.
        unsafe { UnsafeCell::raw_get(self.ram.as_ptr().add(offset)) }
    }

    /// Reads backing memory directly, bypassing any window. Returns `None` if
    /// the range is not backed or is currently mapped.
    #[must_use]
    pub fn read_phys(&self, addr: PhysAddr, len: usize) -> Option<Vec<u8>> {
        let offset = self.arena_offset(addr, len as u64)?;
        if self.live.overlaps(addr, len as u64) {
            return None;
        }
        let mut out = alloc::vec![0u8; len];
        // SAFETY: range is backed and unmapped, so nobody else is accessing it.
        unsafe {
            core::ptr::copy_nonoverlapping(self.arena_ptr(offset), out.as_mut_ptr(), len);
        }
        Some(out)
    }

    /// Writes backing memory directly, as firmware would before handing over
    /// control. Returns false if the range is not backed or is currently mapped.
    pub fn write_phys(&self, addr: PhysAddr, data: &[u8]) -> bool {
        let Some(offset) = self.arena_offset(addr, data.len() as u64) else {
            return false;
        };
        if self.live.overlaps(addr, data.len() as u64) {
            return false;
        }
        // SAFETY: see `read_phys`.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), self.arena_ptr(offset), data.len());
        }
        true
    }
}

// SAFETY: returned pointers stay inside the arena, which lives as long as the
// mapper, and `LiveMappings` refuses overlapping requests.
unsafe impl PhysicalMapper for RamBackedMapper {
    fn map(&self, base: PhysAddr, len: u64) -> Option<VirtAddr> {
        let offset = self.arena_offset(base, len)?;
        if !self.live.insert(base, len) {
            return None;
        }
        Some(VirtAddr::from_ptr(self.arena_ptr(offset)))
    }

    unsafe fn unmap(&self, base: PhysAddr, len: u64) {
        self.live.remove(base, len);
    }
}
