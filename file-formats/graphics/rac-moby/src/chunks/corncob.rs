//! Corncob kernels (R&C2 onwards)
//!
//! A 16 byte table of kernel positions in units of 0x10 bytes relative to the
//! table, 0xff marking an empty slot. A kernel is a Vec4 optionally followed
//! by vertex positions, whose count overlaps the `w` of the first vertex.

use glam::Vec4;
use rac_data::{Buffer, OutBuffer};

use super::bangles::MobyVertexPosition;
use crate::error::{MobyError, Result};
use crate::header::Vec4f;

pub const CORNCOB_KERNEL_COUNT: usize = 16;

const EMPTY_KERNEL: u8 = 0xff;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyCornKernel {
    pub vec: Vec4,
    /// Only present when `vec` is non-zero
    pub vertices: Vec<MobyVertexPosition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyCornCob {
    pub kernels: [Option<MobyCornKernel>; CORNCOB_KERNEL_COUNT],
}

impl MobyCornCob {
    pub(crate) fn read(src: &Buffer<'_>, offset: usize) -> Result<Self> {
        let table = src.read_bytes(offset, CORNCOB_KERNEL_COUNT, "moby corncob")?;
        let mut corncob = Self::default();
        for (slot, &position) in corncob.kernels.iter_mut().zip(table) {
            if position == EMPTY_KERNEL {
                continue;
            }
            let kernel_ofs = offset + usize::from(position) * 0x10;
            let raw = src.read_bytes(kernel_ofs, 0x10, "corn kernel")?;
            let vec: Vec4f = src.read(kernel_ofs, "corn kernel")?;
            let mut vertices = Vec::new();
            if raw.iter().any(|&b| b != 0) {
                let count = src.read_i16(kernel_ofs + 0x16, "corn vertex count")?;
                let count = usize::try_from(count).map_err(|_| {
                    MobyError::format(format!("Corn kernel has negative vertex count {count}"))
                })?;
                vertices = src.read_multiple(kernel_ofs + 0x10, count, "corn vertices")?;
            }
            *slot = Some(MobyCornKernel {
                vec: vec.into(),
                vertices,
            });
        }
        Ok(corncob)
    }

    pub(crate) fn write(&self, dest: &mut OutBuffer) -> Result<usize> {
        let header_ofs = dest.alloc(CORNCOB_KERNEL_COUNT);
        let mut table = [EMPTY_KERNEL; CORNCOB_KERNEL_COUNT];
        for (entry, kernel) in table.iter_mut().zip(&self.kernels) {
            let Some(kernel) = kernel else {
                continue;
            };
            dest.pad(0x10, 0);
            let kernel_ofs = dest.write(&Vec4f::from(kernel.vec))?;
            dest.write_multiple(&kernel.vertices)?;
            if !kernel.vertices.is_empty() {
                let count = i16::try_from(kernel.vertices.len()).map_err(|_| {
                    MobyError::constraint("Corn kernel has too many vertices")
                })?;
                dest.write_i16_at(kernel_ofs + 0x16, count);
            }
            *entry = u8::try_from((kernel_ofs - header_ofs) / 0x10)
                .ok()
                .filter(|position| *position != EMPTY_KERNEL)
                .ok_or_else(|| MobyError::constraint("Corncob kernels do not fit in 0xff0 bytes"))?;
        }
        dest.write_bytes_at(header_ofs, &table);
        Ok(header_ofs)
    }
}
