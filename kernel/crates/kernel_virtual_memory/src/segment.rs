use crate::VirtAddr;

/// A contiguous range of virtual addresses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Segment {
    pub start: VirtAddr,
    pub len: u64,
}

impl Segment {
    #[must_use]
    pub const fn new(start: VirtAddr, len: u64) -> Self {
        Self { start, len }
    }

    #[must_use]
    pub fn contains(&self, addr: VirtAddr) -> bool {
        self.start <= addr && addr - self.start < self.len
    }

    /// Returns the address `offset` bytes into the segment if the
    /// `len`-byte range starting there lies completely inside it.
    #[must_use]
    pub fn subrange(&self, offset: u64, len: u64) -> Option<VirtAddr> {
        let end = offset.checked_add(len)?;
        if end > self.len {
            return None;
        }
        Some(self.start + offset)
    }
}
