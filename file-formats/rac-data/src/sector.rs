//! Sector addressing
//!
//! Archives address their lumps in units of 0x800 byte disc sectors. A value of
//! zero in an offset or size field means the lump is absent.

use std::fmt;

use binrw::{BinRead, BinWrite};

use crate::error::{RacDataError, Result};

/// Size of a disc sector in bytes
pub const SECTOR_SIZE: u64 = 0x800;

/// A count of sectors, used for both offsets and sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sector32 {
    pub sectors: u32,
}

impl Sector32 {
    pub const fn new(sectors: u32) -> Self {
        Self { sectors }
    }

    pub fn bytes(self) -> u64 {
        u64::from(self.sectors) * SECTOR_SIZE
    }

    /// Number of sectors needed to hold `size` bytes
    pub fn size_from_bytes(size: u64) -> Result<Self> {
        let sectors = size.div_ceil(SECTOR_SIZE);
        u32::try_from(sectors)
            .map(Self::new)
            .map_err(|_| RacDataError::format(format!("0x{size:x} bytes do not fit in a sector count")))
    }

    /// Sector containing byte `offset`, which must be sector aligned
    pub fn from_aligned_offset(offset: u64) -> Result<Self> {
        if offset % SECTOR_SIZE != 0 {
            return Err(RacDataError::format(format!(
                "Offset 0x{offset:x} is not sector aligned"
            )));
        }
        Self::size_from_bytes(offset)
    }

    pub fn is_zero(self) -> bool {
        self.sectors == 0
    }
}

impl fmt::Display for Sector32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.sectors)
    }
}

/// An (offset, size) pair where both halves are measured in sectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorRange {
    pub offset: Sector32,
    pub size: Sector32,
}

impl SectorRange {
    pub const fn new(offset: u32, size: u32) -> Self {
        Self {
            offset: Sector32::new(offset),
            size: Sector32::new(size),
        }
    }

    pub fn is_empty(self) -> bool {
        self.size.is_zero()
    }

    pub fn end(self) -> Sector32 {
        Sector32::new(self.offset.sectors.saturating_add(self.size.sectors))
    }
}

/// A sector offset paired with an exact size in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorByteRange {
    pub offset: Sector32,
    pub size_bytes: u32,
}

impl SectorByteRange {
    pub const fn new(offset: u32, size_bytes: u32) -> Self {
        Self {
            offset: Sector32::new(offset),
            size_bytes,
        }
    }

    pub fn is_empty(self) -> bool {
        self.size_bytes == 0
    }
}

/// Round `value` up to the next multiple of `alignment`
pub fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}
