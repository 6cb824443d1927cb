//! BIOS system memory map (INT 15h, E820) handling.
//!
//! The loader hands the kernel the firmware memory map as a packed array of
//! 20-byte entries, preceded in the module metadata by a 32-bit byte count.
//! [`locate`] picks the region reserved for a given entry type out of it.

use alloc::vec::Vec;
use core::fmt;

use log::{debug, info, warn};
use thiserror::Error;
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use crate::{MemoryRegion, PhysAddr};

/// Size of a single SMAP entry as laid out by the firmware.
pub const SMAP_ENTRY_SIZE: usize = size_of::<RawSmapEntry>();

/// Type tag of a memory map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SmapType(pub u32);

impl SmapType {
    pub const MEMORY: Self = Self(1);
    pub const RESERVED: Self = Self(2);
    pub const ACPI_RECLAIM: Self = Self(3);
    pub const ACPI_NVS: Self = Self(4);
    pub const UNUSABLE: Self = Self(5);
    pub const PERSISTENT: Self = Self(7);
    /// Vendor type used by firmware to carve out battery-backed NVRAM.
    pub const ARXCIS: Self = Self(12);
}

impl fmt::Display for SmapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawSmapEntry {
    base: U64,
    length: U64,
    typ: U32,
}

/// One entry of the firmware memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmapEntry {
    pub base: u64,
    pub length: u64,
    pub typ: SmapType,
}

impl SmapEntry {
    pub const fn new(base: u64, length: u64, typ: SmapType) -> Self {
        Self { base, length, typ }
    }
}

impl From<&RawSmapEntry> for SmapEntry {
    fn from(raw: &RawSmapEntry) -> Self {
        Self {
            base: raw.base.get(),
            length: raw.length.get(),
            typ: SmapType(raw.typ.get()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SmapError {
    #[error("memory map is {0} bytes, not a multiple of the entry size")]
    Ragged(usize),
    #[error("memory map metadata is truncated")]
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("no usable memory map entry of type {0}")]
    NotFound(SmapType),
}

/// A decoded firmware memory map, in firmware order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmapTable {
    entries: Vec<SmapEntry>,
}

impl SmapTable {
    #[must_use]
    pub fn new(entries: Vec<SmapEntry>) -> Self {
        Self { entries }
    }

    /// Decodes a packed array of SMAP entries.
    ///
    /// # Errors
    /// Returns [`SmapError::Ragged`] if `bytes` does not hold a whole number
    /// of entries.
    pub fn parse(bytes: &[u8]) -> Result<Self, SmapError> {
        let raw = <[RawSmapEntry]>::ref_from_bytes(bytes)
            .map_err(|_| SmapError::Ragged(bytes.len()))?;
        Ok(Self {
            entries: raw.iter().map(SmapEntry::from).collect(),
        })
    }

    /// Decodes the SMAP blob found in loader metadata: a little-endian `u32`
    /// byte count followed by the entries themselves. Trailing bytes after
    /// the counted area are ignored.
    ///
    /// # Errors
    /// Returns [`SmapError::Truncated`] if the blob is shorter than its
    /// size prefix claims.
    pub fn from_preload(blob: &[u8]) -> Result<Self, SmapError> {
        let (size, rest) = U32::read_from_prefix(blob).map_err(|_| SmapError::Truncated)?;
        let size = size.get() as usize;
        let entries = rest.get(..size).ok_or(SmapError::Truncated)?;
        Self::parse(entries)
    }

    #[must_use]
    pub fn entries(&self) -> &[SmapEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmapEntry> {
        self.entries.iter()
    }

    /// See [`locate`].
    ///
    /// # Errors
    /// Returns [`LocateError::NotFound`] if no usable entry of type `typ` exists.
    pub fn locate(&self, typ: SmapType) -> Result<MemoryRegion, LocateError> {
        locate(&self.entries, typ)
    }
}

/// Returns the first memory map entry of type `typ` as a [`MemoryRegion`].
///
/// The region is assumed to be contiguous. Further entries of the same type
/// are not merged into it, they are only reported.
///
/// # Errors
/// Returns [`LocateError::NotFound`] if no entry matches or the first match
/// has zero length.
pub fn locate(entries: &[SmapEntry], typ: SmapType) -> Result<MemoryRegion, LocateError> {
    let mut found: Option<MemoryRegion> = None;

    for entry in entries {
        debug!(
            "smap type = {}, base = {:#x}, length = {:#x}",
            entry.typ, entry.base, entry.length
        );
        if entry.typ != typ {
            continue;
        }
        if found.is_some() {
            warn!(
                "ignoring smap type {} fragment at {:#x} ({:#x} bytes), only the first one is used",
                typ, entry.base, entry.length
            );
            continue;
        }
        found = Some(MemoryRegion::new(
            PhysAddr::new(entry.base),
            entry.length,
            typ,
        ));
    }

    match found {
        Some(region) if !region.is_empty() => {
            info!(
                "smap type {} region at {:#x}, {:#x} bytes",
                typ,
                region.base(),
                region.len()
            );
            Ok(region)
        }
        _ => {
            info!("smap type {typ} memory not found");
            Err(LocateError::NotFound(typ))
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn encode(entries: &[SmapEntry]) -> Vec<u8> {
        let mut out = Vec::new();
        for e in entries {
            out.extend_from_slice(&e.base.to_le_bytes());
            out.extend_from_slice(&e.length.to_le_bytes());
            out.extend_from_slice(&e.typ.0.to_le_bytes());
        }
        out
    }

    fn sample() -> Vec<SmapEntry> {
        vec![
            SmapEntry::new(0x0, 0x9_f000, SmapType::MEMORY),
            SmapEntry::new(0x9_f000, 0x1000, SmapType::RESERVED),
            SmapEntry::new(0x10_0000, 0xf0_0000, SmapType::MEMORY),
            SmapEntry::new(0x100_0000, 0x10_0000, SmapType::ARXCIS),
            SmapEntry::new(0x200_0000, 0x10_0000, SmapType::ARXCIS),
        ]
    }

    #[test]
    fn test_entry_size() {
        assert_eq!(SMAP_ENTRY_SIZE, 20);
    }

    #[test]
    fn test_locate_first_match() {
        let region = locate(&sample(), SmapType::ARXCIS).unwrap();
        assert_eq!(region.base(), PhysAddr::new(0x100_0000));
        assert_eq!(region.len(), 0x10_0000);
        assert_eq!(region.typ(), SmapType::ARXCIS);
    }

    #[test]
    fn test_locate_not_found() {
        assert_eq!(
            locate(&sample(), SmapType::ACPI_NVS),
            Err(LocateError::NotFound(SmapType::ACPI_NVS))
        );
        assert_eq!(
            locate(&[], SmapType::ARXCIS),
            Err(LocateError::NotFound(SmapType::ARXCIS))
        );
    }

    #[test]
    fn test_locate_zero_length() {
        // only the first match counts, even if a later one is usable
        let entries = [
            SmapEntry::new(0x100_0000, 0, SmapType::ARXCIS),
            SmapEntry::new(0x200_0000, 0x1000, SmapType::ARXCIS),
        ];
        assert_eq!(
            locate(&entries, SmapType::ARXCIS),
            Err(LocateError::NotFound(SmapType::ARXCIS))
        );
    }

    #[test]
    fn test_parse() {
        let table = SmapTable::parse(&encode(&sample())).unwrap();
        assert_eq!(table.entries(), sample().as_slice());
        assert_eq!(
            table.locate(SmapType::ARXCIS).unwrap().base(),
            PhysAddr::new(0x100_0000)
        );
    }

    #[test]
    fn test_parse_empty() {
        let table = SmapTable::parse(&[]).unwrap();
        assert!(table.entries().is_empty());
    }

    #[test]
    fn test_parse_ragged() {
        let mut bytes = encode(&sample());
        bytes.pop();
        assert_eq!(
            SmapTable::parse(&bytes),
            Err(SmapError::Ragged(5 * SMAP_ENTRY_SIZE - 1))
        );
    }

    #[test]
    fn test_from_preload() {
        let entries = encode(&sample()[..2]);
        let mut blob = Vec::new();
        blob.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        blob.extend_from_slice(&entries);
        // trailing metadata belongs to the next record
        blob.extend_from_slice(&[0xff; 7]);

        let table = SmapTable::from_preload(&blob).unwrap();
        assert_eq!(table.entries(), &sample()[..2]);
    }

    #[test]
    fn test_from_preload_truncated() {
        assert_eq!(SmapTable::from_preload(&[0x14, 0]), Err(SmapError::Truncated));

        let mut blob = Vec::new();
        blob.extend_from_slice(&40u32.to_le_bytes());
        blob.extend_from_slice(&encode(&sample()[..1]));
        assert_eq!(SmapTable::from_preload(&blob), Err(SmapError::Truncated));
    }
}
