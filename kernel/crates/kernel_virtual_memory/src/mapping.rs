use alloc::sync::Arc;
use core::fmt::{Debug, Formatter};
use core::ptr;

use kernel_physical_memory::{MemoryRegion, PhysAddr};
use log::debug;
use thiserror::Error;

use crate::{Segment, VirtAddr};

/// Maps device memory into the kernel's addressable space.
///
/// # Safety
/// An implementation must only return addresses that are valid for reads and
/// writes of `len` bytes until the matching [`unmap`](Self::unmap), and must
/// never hand out two live mappings that alias the same physical memory.
pub unsafe trait PhysicalMapper: Send + Sync {
    /// Maps `len` bytes starting at `base`. Returns `None` if the request
    /// cannot be satisfied.
    fn map(&self, base: PhysAddr, len: u64) -> Option<VirtAddr>;

    /// Removes a mapping previously established by [`map`](Self::map).
    ///
    /// # Safety
    /// No access through the mapping may happen after this call.
    unsafe fn unmap(&self, base: PhysAddr, len: u64);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum MapError {
    #[error("could not map {len:#x} bytes at {base}")]
    MapFailed { base: PhysAddr, len: u64 },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum WindowError {
    #[error("access of {len:#x} bytes at offset {offset:#x} exceeds the {size:#x} byte window")]
    OutOfRange { offset: u64, len: u64, size: u64 },
}

/// An addressable view of a [`MemoryRegion`].
///
/// The window owns its mapping: dropping it unmaps the region. Reads borrow
/// the window, writes need it exclusively, so whoever holds the window is
/// the only party that can touch the memory behind it.
pub struct MappedWindow {
    region: MemoryRegion,
    segment: Segment,
    mapper: Arc<dyn PhysicalMapper>,
}

impl Debug for MappedWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MappedWindow")
            .field("region", &self.region)
            .field("segment", &self.segment)
            .finish_non_exhaustive()
    }
}

impl MappedWindow {
    /// Maps all of `region`.
    ///
    /// # Errors
    /// Returns [`MapError::MapFailed`] if the region is empty or the mapper
    /// refuses the request.
    pub fn map(mapper: Arc<dyn PhysicalMapper>, region: MemoryRegion) -> Result<Self, MapError> {
        let failed = MapError::MapFailed {
            base: region.base(),
            len: region.len(),
        };
        if region.is_empty() {
            return Err(failed);
        }
        let start = mapper.map(region.base(), region.len()).ok_or(failed)?;
        if start.is_null() {
            // SAFETY: the mapping was just created and nothing has accessed it.
            unsafe { mapper.unmap(region.base(), region.len()) };
            return Err(failed);
        }
        debug!(
            "mapped {:#x} bytes of physical memory at {:#x} to {:#x}",
            region.len(),
            region.base(),
            start
        );
        Ok(Self {
            region,
            segment: Segment::new(start, region.len()),
            mapper,
        })
    }

    #[must_use]
    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }

    #[must_use]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.segment.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segment.len == 0
    }

    fn checked(&self, offset: u64, len: usize) -> Result<VirtAddr, WindowError> {
        let len = len as u64;
        self.segment
            .subrange(offset, len)
            .ok_or(WindowError::OutOfRange {
                offset,
                len,
                size: self.segment.len,
            })
    }

    /// Copies `buf.len()` bytes starting at `offset` out of the window.
    ///
    /// # Errors
    /// Returns [`WindowError::OutOfRange`] if the range is not inside the window.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), WindowError> {
        let src = self.checked(offset, buf.len())?;
        // SAFETY: the source range was checked to lie inside the mapping, which
        // stays valid while `self` exists. `buf` is a Rust slice and cannot
        // alias the mapping.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr::<u8>(), buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    /// Copies `buf` into the window starting at `offset`.
    ///
    /// # Errors
    /// Returns [`WindowError::OutOfRange`] if the range is not inside the window.
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), WindowError> {
        let dst = self.checked(offset, buf.len())?;
        // SAFETY: see `read_at`; `&mut self` guarantees no concurrent reader.
        unsafe {
            ptr::copy_nonoverlapping(buf.as_ptr(), dst.as_mut_ptr::<u8>(), buf.len());
        }
        Ok(())
    }

    /// Unmaps the window. Equivalent to dropping it.
    pub fn unmap(self) {
        drop(self);
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        // SAFETY: the window is the only handle to the mapping and it is going away.
        unsafe { self.mapper.unmap(self.region.base(), self.region.len()) };
        debug!(
            "unmapped {:#x} bytes of physical memory at {:#x}",
            self.region.len(),
            self.region.base()
        );
    }
}
