use glam::Vec3;
use rac_data::Buffer;

use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};
use crate::header::MobyCollisionHeader;

/// Fixed point scale of the vectors in the second part
const COLLISION_VECTOR_SCALE: f32 = 1024.0;

/// Collision data
///
/// Only the second part is understood: a list of 3-vectors stored as four
/// 16-bit fixed point values each, the last of which is unused.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyCollision {
    pub unknown_0: i16,
    pub unknown_2: i16,
    pub first_part: Vec<u8>,
    pub second_part: Vec<Vec3>,
    pub third_part: Vec<u8>,
}

impl MobyCollision {
    pub(crate) fn read(src: &Buffer<'_>, offset: usize) -> Result<Self> {
        let header: MobyCollisionHeader = src.read(offset, "moby collision header")?;
        let first_size = part_size(header.first_part_size, "first")?;
        let second_size = part_size(header.second_part_size, "second")?;
        let third_size = part_size(header.third_part_size, "third")?;
        if second_size % 8 != 0 {
            return Err(MobyError::format(format!(
                "Bad moby collision: second part size 0x{second_size:x} is not a multiple of 8"
            )));
        }

        let mut ofs = offset + 0x10;
        let first_part = src.read_bytes(ofs, first_size, "moby collision first part")?.to_vec();
        ofs += first_size;
        let packed: Vec<i16> = src.read_multiple(ofs, second_size / 2, "moby collision second part")?;
        ofs += second_size;
        let second_part = packed
            .chunks_exact(4)
            .map(|v| {
                Vec3::new(
                    f32::from(v[0]) / COLLISION_VECTOR_SCALE,
                    f32::from(v[1]) / COLLISION_VECTOR_SCALE,
                    f32::from(v[2]) / COLLISION_VECTOR_SCALE,
                )
            })
            .collect();
        let third_part = src.read_bytes(ofs, third_size, "moby collision third part")?.to_vec();

        Ok(Self {
            unknown_0: header.unknown_0,
            unknown_2: header.unknown_2,
            first_part,
            second_part,
            third_part,
        })
    }

    /// Size in bytes including the header
    pub fn size(&self) -> usize {
        0x10 + self.first_part.len() + self.second_part.len() * 8 + self.third_part.len()
    }

    /// Write the collision block on a 0x10 boundary, returning its offset
    pub(crate) fn write(&self, ctx: &mut EncoderContext<'_>) -> Result<usize> {
        let header = MobyCollisionHeader {
            unknown_0: self.unknown_0,
            unknown_2: self.unknown_2,
            first_part_size: narrow(self.first_part.len(), "Collision first part size")?,
            third_part_size: narrow(self.third_part.len(), "Collision third part size")?,
            second_part_size: narrow(self.second_part.len() * 8, "Collision second part size")?,
        };
        ctx.dest.pad(0x10, 0);
        let ofs = ctx.dest.write(&header)?;
        ctx.dest.write_bytes(&self.first_part);
        for v in &self.second_part {
            ctx.dest.write_i16((v.x * COLLISION_VECTOR_SCALE) as i16);
            ctx.dest.write_i16((v.y * COLLISION_VECTOR_SCALE) as i16);
            ctx.dest.write_i16((v.z * COLLISION_VECTOR_SCALE) as i16);
            ctx.dest.write_i16(0);
        }
        ctx.dest.write_bytes(&self.third_part);
        Ok(ofs)
    }
}

fn part_size(size: i32, part: &str) -> Result<usize> {
    usize::try_from(size)
        .map_err(|_| MobyError::format(format!("Bad moby collision: {part} part has size {size}")))
}
