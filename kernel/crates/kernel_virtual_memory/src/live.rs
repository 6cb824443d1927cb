use alloc::vec::Vec;

use kernel_physical_memory::PhysAddr;
use spin::Mutex;

/// Book-keeping of the physical ranges a mapper currently has mapped.
///
/// A range that overlaps a live mapping cannot be mapped a second time, so
/// every window handed out is the only alias of its memory.
#[derive(Debug, Default)]
pub(crate) struct LiveMappings {
    ranges: Mutex<Vec<(u64, u64)>>,
}

impl LiveMappings {
    pub(crate) const fn new() -> Self {
        Self {
            ranges: Mutex::new(Vec::new()),
        }
    }

    /// Records `[base, base + len)` as mapped. Returns false if it overlaps
    /// a live mapping or wraps the address space.
    pub(crate) fn insert(&self, base: PhysAddr, len: u64) -> bool {
        let start = base.as_u64();
        let Some(end) = start.checked_add(len) else {
            return false;
        };
        let mut ranges = self.ranges.lock();
        if ranges.iter().any(|&(s, e)| start < e && s < end) {
            return false;
        }
        ranges.push((start, end));
        true
    }

    pub(crate) fn remove(&self, base: PhysAddr, len: u64) {
        let start = base.as_u64();
        let end = start.saturating_add(len);
        self.ranges.lock().retain(|&r| r != (start, end));
    }

    pub(crate) fn overlaps(&self, base: PhysAddr, len: u64) -> bool {
        let start = base.as_u64();
        let end = start.saturating_add(len);
        self.ranges.lock().iter().any(|&(s, e)| start < e && s < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overlap() {
        let live = LiveMappings::new();
        assert!(live.insert(PhysAddr::new(0x1000), 0x1000));
        assert!(!live.insert(PhysAddr::new(0x1800), 0x1000));
        assert!(!live.insert(PhysAddr::new(0x0), 0x1001));
        // adjacent ranges do not overlap
        assert!(live.insert(PhysAddr::new(0x2000), 0x1000));
        assert!(live.insert(PhysAddr::new(0x0), 0x1000));
    }

    #[test]
    fn test_remove() {
        let live = LiveMappings::new();
        assert!(live.insert(PhysAddr::new(0x1000), 0x1000));
        assert!(live.overlaps(PhysAddr::new(0x1fff), 1));
        live.remove(PhysAddr::new(0x1000), 0x1000);
        assert!(!live.overlaps(PhysAddr::new(0x1fff), 1));
        assert!(live.insert(PhysAddr::new(0x1000), 0x1000));
    }

    #[test]
    fn test_wrapping_range() {
        let live = LiveMappings::new();
        assert!(!live.insert(PhysAddr::new(u64::MAX), 2));
    }
}
