//! Bangles: a secondary set of submeshes for attachments
//!
//! The bangles block is 16 entries of 4 bytes naming a range of the submesh
//! table, followed by two vertex positions for every present bangle after
//! the first.

use binrw::{BinRead, BinWrite};
use rac_data::Buffer;

use crate::encoder::narrow;
use crate::error::{MobyError, Result};
use crate::submesh::MobySubMesh;

/// Number of entries in a bangles block
pub const BANGLE_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyBangle {
    /// Index of the first submesh table entry
    pub submesh_begin: u8,
    pub submesh_count: u8,
    pub unknown_2: u8,
    pub unknown_3: u8,
}

impl MobyBangle {
    pub fn is_present(&self) -> bool {
        self.submesh_begin != 0 || self.submesh_count != 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyVertexPosition {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub w: i16,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyBangles {
    /// At most [`BANGLE_COUNT`] entries, padded with empty ones when written
    pub bangles: Vec<MobyBangle>,
    pub vertices: Vec<MobyVertexPosition>,
    /// Submeshes of the range named by the first bangle
    pub submeshes: Vec<MobySubMesh>,
}

impl MobyBangles {
    /// Read the bangles block, without its submeshes
    pub(crate) fn read(src: &Buffer<'_>, offset: usize) -> Result<Self> {
        let bangles: Vec<MobyBangle> = src.read_multiple(offset, BANGLE_COUNT, "moby bangles")?;
        let present = bangles.iter().filter(|bangle| bangle.is_present()).count();
        let vertex_count = 2 * present.saturating_sub(1);
        let vertices = src.read_multiple(
            offset + BANGLE_COUNT * 4,
            vertex_count,
            "moby bangle vertices",
        )?;
        Ok(Self {
            bangles,
            vertices,
            submeshes: Vec::new(),
        })
    }

    /// The bangle whose range holds [`Self::submeshes`]
    pub fn first(&self) -> MobyBangle {
        self.bangles.first().copied().unwrap_or_default()
    }

    /// Write the block with the first bangle naming the submesh table range
    /// that starts at entry `submesh_begin`
    ///
    /// An empty first bangle stays empty while there are no bangles submeshes.
    pub(crate) fn write(&self, dest: &mut rac_data::OutBuffer, submesh_begin: u8) -> Result<usize> {
        if self.bangles.len() > BANGLE_COUNT {
            return Err(MobyError::constraint(format!(
                "Moby class has {} bangles (max is {BANGLE_COUNT})",
                self.bangles.len()
            )));
        }
        let submesh_count: u8 = narrow(self.submeshes.len(), "Bangles submesh count")?;

        let mut table = self.bangles.clone();
        table.resize(BANGLE_COUNT, MobyBangle::default());
        let first = &mut table[0];
        if submesh_count != 0 || first.is_present() {
            first.submesh_begin = submesh_begin;
            first.submesh_count = submesh_count;
        }

        let ofs = dest.write_multiple(&table)?;
        dest.write_multiple(&self.vertices)?;
        Ok(ofs)
    }
}
