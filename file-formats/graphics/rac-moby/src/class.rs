//! Moby class reading and writing
//!
//! A moby class is a self contained record: every offset inside it is
//! relative to its header. Decoding turns it into a [`MobyClass`] which owns
//! every block; encoding lays the blocks out again in a fixed order and
//! recomputes all offsets.
//!
//! # Layout written
//!
//! ```text
//! header (0x48)
//! sequence offset table
//! zero padding up to the recorded header end
//! bangles, corncob
//! sequences with their frames
//! submesh tables (high, low, metal, bangles)
//! collision
//! mystery data
//! skeleton, common transforms, joint lists, sound definitions
//! submesh payloads (high, low, metal, bangles)
//! GIF usage table
//! ```

use std::fmt;

use glam::{Mat4, Vec4};
use rac_data::{Buffer, Game, OutBuffer};

use crate::chunks::joints::{read_joints, write_joints};
use crate::chunks::sequence::{read_sequences, write_sequences};
use crate::chunks::{MobyBangles, MobyCollision, MobyCornCob, MobySequence, MobySoundDef};
use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};
use crate::format::MobyFormat;
use crate::header::{
    MOBY_CLASS_HEADER_SIZE, MOBY_SUBMESH_ENTRY_SIZE, Mat4f, MobyClassHeader, MobyGifUsageEntry,
};
use crate::mesh::{Mesh, lift_submeshes};
use crate::submesh::metal::{read_metal_submeshes, write_metal_submeshes};
use crate::submesh::{
    MobyMetalSubMesh, MobySubMesh, StructuralWarning, read_submeshes, write_submeshes,
};

/// Required alignment of a class header inside its containing buffer
pub const MOBY_CLASS_ALIGNMENT: usize = 0x40;

/// A decoded moby class
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyClass {
    /// Set for Going Commando classes stored in the R&C1 layout
    pub force_rac1_format: bool,
    /// Value of the metal submesh begin field for classes without metal
    /// submeshes that do not point it past the low detail table
    pub metal_submesh_begin_hint: Option<u8>,
    pub unknown_9: u8,
    pub rac1_byte_a: u8,
    pub rac1_byte_b: u8,
    pub lod_trans: u8,
    pub shadow: u8,
    pub scale: f32,
    pub mip_dist: u8,
    pub bounding_sphere: Vec4,
    pub glow_rgba: i32,
    pub mode_bits: i16,
    pub moby_type: u8,
    pub mode_bits2: u8,
    /// Where the sequences begin, relative to the header. The writer pads up
    /// to it so that the original layout is kept.
    pub header_end_offset: usize,
    /// Where the submesh tables begin, padded up to the same way
    pub submesh_table_offset: usize,
    pub has_submesh_table: bool,
    pub sequences: Vec<Option<MobySequence>>,
    pub bangles: Option<MobyBangles>,
    pub corncob: Option<MobyCornCob>,
    /// R&C1 keeps a plain value where later games point to the corncob
    pub rac1_short_2e: i16,
    pub collision: Option<MobyCollision>,
    pub skeleton: Vec<Mat4>,
    /// 0x10 bytes per joint
    pub common_trans: Vec<u8>,
    pub joints: Vec<Vec<u8>>,
    pub sound_defs: Vec<MobySoundDef>,
    pub submeshes: Vec<MobySubMesh>,
    pub low_detail_submeshes: Vec<MobySubMesh>,
    pub metal_submeshes: Vec<MobyMetalSubMesh>,
    /// Bytes between the last known block and the skeleton, kept as is
    pub mystery_data: Vec<u8>,
}

/// Which submesh table a dropped submesh was in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMeshTable {
    HighDetail,
    LowDetail,
    Bangles,
}

impl fmt::Display for SubMeshTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HighDetail => "high detail",
            Self::LowDetail => "low detail",
            Self::Bangles => "bangles",
        })
    }
}

/// A submesh that was dropped while reading a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMeshWarning {
    pub table: SubMeshTable,
    pub index: usize,
    pub warning: StructuralWarning,
}

impl fmt::Display for SubMeshWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dropped {} submesh {}: {}", self.table, self.index, self.warning)
    }
}

impl MobyClass {
    /// Decode a class, logging and dropping any inconsistent submeshes
    pub fn read(src: &[u8], game: Game) -> Result<Self> {
        Self::read_with_warnings(src, game).map(|(class, _)| class)
    }

    /// Decode a class, also returning the submeshes that were dropped
    pub fn read_with_warnings(src: &[u8], game: Game) -> Result<(Self, Vec<SubMeshWarning>)> {
        let src = Buffer::new(src);
        let header: MobyClassHeader = src.read(0, "moby class header")?;
        let force_rac1_format = game == Game::Rac2 && header.rac12_byte_b != 0;
        let format = MobyFormat::for_game(game, force_rac1_format);
        log::debug!("Reading moby class in {format} format ({} bytes)", src.len());

        if header.sequence_count < 1 {
            return Err(MobyError::format("Moby class has no sequences"));
        }
        let sequence_offsets: Vec<i32> = src.read_multiple(
            MOBY_CLASS_HEADER_SIZE,
            usize::from(header.sequence_count),
            "moby sequence offsets",
        )?;
        let mut header_end_offset = match sequence_offsets.iter().find(|&&ofs| ofs != 0) {
            Some(&ofs) => offset(ofs, "First sequence")?,
            None => MOBY_CLASS_HEADER_SIZE,
        };
        let mut mystery_ofs = sequence_offsets
            .first()
            .and_then(|&ofs| usize::try_from(ofs).ok())
            .unwrap_or(0);

        let mut bangles = None;
        if header.bangles != 0 {
            let bangles_ofs = usize::from(header.bangles) * 0x10;
            bangles = Some(MobyBangles::read(&src, bangles_ofs)?);
            header_end_offset = header_end_offset.min(bangles_ofs);
        }

        let mut corncob = None;
        let mut rac1_short_2e = 0;
        if game == Game::Rac1 {
            rac1_short_2e = header.corncob;
        } else if header.corncob != 0 {
            let corncob_ofs = offset(i32::from(header.corncob), "Corncob")? * 0x10;
            corncob = Some(MobyCornCob::read(&src, corncob_ofs)?);
            header_end_offset = header_end_offset.min(corncob_ofs);
        }

        let sequences = read_sequences(&src, &sequence_offsets, &mut mystery_ofs)?;

        let collision = match src.read_offset(0x10, "moby collision")? {
            Some(collision_ofs) => {
                let collision = MobyCollision::read(&src, collision_ofs)?;
                mystery_ofs = mystery_ofs.max(collision_ofs + collision.size());
                Some(collision)
            }
            None => None,
        };

        let joint_count = usize::from(header.joint_count);
        let skeleton_ofs = offset(header.skeleton, "Skeleton")?;
        let skeleton = src
            .read_multiple::<Mat4f>(skeleton_ofs, joint_count, "moby skeleton")?
            .into_iter()
            .map(Mat4::from)
            .collect();
        let common_trans = if joint_count > 0 {
            src.read_bytes(
                offset(header.common_trans, "Common transforms")?,
                joint_count * 0x10,
                "moby common trans",
            )?
            .to_vec()
        } else {
            Vec::new()
        };
        let joints = read_joints(&src, src.read_offset(0x1c, "moby joints")?)?;
        let sound_defs = if header.sound_count > 0 {
            src.read_multiple(
                offset(header.sound_defs, "Sound definitions")?,
                usize::from(header.sound_count),
                "moby sound defs",
            )?
        } else {
            Vec::new()
        };

        let mut warnings = Vec::new();
        let mut submeshes = Vec::new();
        let mut low_detail_submeshes = Vec::new();
        let mut metal_submeshes = Vec::new();
        let has_submesh_table = header.submesh_table_offset != 0;
        if has_submesh_table {
            let table = offset(header.submesh_table_offset, "Submesh table")?;
            let high_count = usize::from(header.submesh_count);
            let low_count = usize::from(header.low_detail_submesh_count);
            submeshes = keep_valid(
                read_submeshes(&src, table, high_count, format)?,
                SubMeshTable::HighDetail,
                &mut warnings,
            );
            low_detail_submeshes = keep_valid(
                read_submeshes(&src, table + high_count * MOBY_SUBMESH_ENTRY_SIZE, low_count, format)?,
                SubMeshTable::LowDetail,
                &mut warnings,
            );
            let metal_table = table + usize::from(header.metal_submesh_begin) * MOBY_SUBMESH_ENTRY_SIZE;
            let metal_count = usize::from(header.metal_submesh_count);
            metal_submeshes = read_metal_submeshes(&src, metal_table, metal_count)?;

            if let Some(bangles) = &mut bangles {
                let first = bangles.first();
                let bangles_table = table + usize::from(first.submesh_begin) * MOBY_SUBMESH_ENTRY_SIZE;
                let bangles_count = usize::from(first.submesh_count);
                bangles.submeshes = keep_valid(
                    read_submeshes(&src, bangles_table, bangles_count, format)?,
                    SubMeshTable::Bangles,
                    &mut warnings,
                );
                mystery_ofs = mystery_ofs.max(bangles_table + bangles_count * MOBY_SUBMESH_ENTRY_SIZE);
            } else {
                mystery_ofs = mystery_ofs.max(metal_table + metal_count * MOBY_SUBMESH_ENTRY_SIZE);
            }
        }

        let mystery_size = skeleton_ofs.checked_sub(mystery_ofs).ok_or_else(|| {
            MobyError::format(format!(
                "Moby skeleton at 0x{skeleton_ofs:x} comes before the end of the data at 0x{mystery_ofs:x}"
            ))
        })?;
        let mystery_data = src
            .read_bytes(mystery_ofs, mystery_size, "moby mystery data")?
            .to_vec();
        log::debug!(
            "Moby class: {} sequences, {} + {} + {} submeshes, {} joints, 0x{mystery_size:x} bytes of mystery data",
            sequences.len(),
            submeshes.len(),
            low_detail_submeshes.len(),
            metal_submeshes.len(),
            joint_count
        );

        let high_low = u16::from(header.submesh_count) + u16::from(header.low_detail_submesh_count);
        let metal_submesh_begin_hint = (header.metal_submesh_count == 0
            && u16::from(header.metal_submesh_begin) != high_low)
            .then_some(header.metal_submesh_begin);

        let class = Self {
            force_rac1_format,
            metal_submesh_begin_hint,
            unknown_9: header.unknown_9,
            rac1_byte_a: header.rac1_byte_a,
            rac1_byte_b: header.rac12_byte_b,
            lod_trans: header.lod_trans,
            shadow: header.shadow,
            scale: header.scale,
            mip_dist: header.mip_dist,
            bounding_sphere: header.bounding_sphere.into(),
            glow_rgba: header.glow_rgba,
            mode_bits: header.mode_bits,
            moby_type: header.moby_type,
            mode_bits2: header.mode_bits2,
            header_end_offset,
            submesh_table_offset: usize::try_from(header.submesh_table_offset).unwrap_or(0),
            has_submesh_table,
            sequences,
            bangles,
            corncob,
            rac1_short_2e,
            collision,
            skeleton,
            common_trans,
            joints,
            sound_defs,
            submeshes,
            low_detail_submeshes,
            metal_submeshes,
            mystery_data,
        };
        Ok((class, warnings))
    }

    /// Encode the class into a new buffer
    pub fn write(&self, game: Game) -> Result<Vec<u8>> {
        let mut dest = OutBuffer::new();
        self.write_at(&mut dest, game)?;
        Ok(dest.into_inner())
    }

    /// Append the class to `dest`, returning the offset of its header
    ///
    /// The end of `dest` must be aligned to [`MOBY_CLASS_ALIGNMENT`].
    pub fn write_at(&self, dest: &mut OutBuffer, game: Game) -> Result<usize> {
        if dest.tell() % MOBY_CLASS_ALIGNMENT != 0 {
            return Err(MobyError::constraint(format!(
                "Moby class must start on a 0x{MOBY_CLASS_ALIGNMENT:x} byte boundary, not at 0x{:x}",
                dest.tell()
            )));
        }
        self.check_counts()?;
        let format = self.format(game)?;
        log::debug!("Writing moby class in {format} format");

        let high_count: u8 = narrow(self.submeshes.len(), "Submesh count")?;
        let low_count: u8 = narrow(self.low_detail_submeshes.len(), "Low detail submesh count")?;
        let metal_count: u8 = narrow(self.metal_submeshes.len(), "Metal submesh count")?;
        let metal_begin: u8 = narrow(
            usize::from(high_count) + usize::from(low_count),
            "Metal submesh begin",
        )?;

        let mut ctx = EncoderContext::new(dest);
        let header_ofs = ctx.dest.alloc(MOBY_CLASS_HEADER_SIZE);
        let mut header = MobyClassHeader {
            submesh_count: high_count,
            low_detail_submesh_count: low_count,
            metal_submesh_count: metal_count,
            metal_submesh_begin: match self.metal_submesh_begin_hint {
                Some(hint) if metal_count == 0 => hint,
                _ => metal_begin,
            },
            joint_count: narrow(self.skeleton.len(), "Joint count")?,
            unknown_9: self.unknown_9,
            sequence_count: narrow(self.sequences.len(), "Sequence count")?,
            sound_count: narrow(self.sound_defs.len(), "Sound count")?,
            lod_trans: self.lod_trans,
            shadow: self.shadow,
            scale: self.scale,
            mip_dist: self.mip_dist,
            bounding_sphere: self.bounding_sphere.into(),
            glow_rgba: self.glow_rgba,
            mode_bits: self.mode_bits,
            moby_type: self.moby_type,
            mode_bits2: self.mode_bits2,
            ..Default::default()
        };
        if format == MobyFormat::Rac1 {
            header.rac1_byte_a = self.rac1_byte_a;
            header.rac12_byte_b = self.rac1_byte_b;
        }

        let sequence_list = ctx.dest.alloc(self.sequences.len() * 4);
        ctx.pad_to_rel(self.header_end_offset);
        if let Some(bangles) = &self.bangles {
            ctx.dest.pad(0x10, 0);
            // The bangles submesh table is allocated right after the metal one.
            let submesh_begin = narrow(
                usize::from(metal_begin) + usize::from(metal_count),
                "Bangles submesh begin",
            )?;
            let bangles_ofs = bangles.write(ctx.dest, submesh_begin)?;
            header.bangles = narrow(ctx.rel(bangles_ofs) / 0x10, "Bangles offset")?;
        }
        if game == Game::Rac1 {
            header.corncob = self.rac1_short_2e;
        } else if let Some(corncob) = &self.corncob {
            ctx.dest.pad(0x10, 0);
            let corncob_ofs = corncob.write(ctx.dest)?;
            header.corncob = narrow(ctx.rel(corncob_ofs) / 0x10, "Corncob offset")?;
        }
        ctx.dest.pad(0x10, 0);
        write_sequences(&mut ctx, &self.sequences, sequence_list, format)?;

        ctx.dest.pad(0x10, 0);
        ctx.pad_to_rel(self.submesh_table_offset);
        let high_table = ctx.dest.alloc(self.submeshes.len() * MOBY_SUBMESH_ENTRY_SIZE);
        let low_table = ctx.dest.alloc(self.low_detail_submeshes.len() * MOBY_SUBMESH_ENTRY_SIZE);
        let metal_table = ctx.dest.alloc(self.metal_submeshes.len() * MOBY_SUBMESH_ENTRY_SIZE);
        let bangles_table = self
            .bangles
            .as_ref()
            .map(|bangles| ctx.dest.alloc(bangles.submeshes.len() * MOBY_SUBMESH_ENTRY_SIZE));
        if self.has_submesh_table || self.has_submeshes() {
            header.submesh_table_offset = ctx.pointer(high_table, "Submesh table")?;
        }

        if let Some(collision) = &self.collision {
            let collision_ofs = collision.write(&mut ctx)?;
            header.collision = ctx.pointer(collision_ofs, "Collision")?;
        }
        ctx.dest.write_bytes(&self.mystery_data);

        header.skeleton = ctx.pointer(ctx.tell(), "Skeleton")?;
        for matrix in &self.skeleton {
            ctx.dest.write(&Mat4f::from(*matrix))?;
        }
        ctx.dest.pad(0x10, 0);
        let common_trans = ctx.dest.write_bytes(&self.common_trans);
        header.common_trans = ctx.pointer(common_trans, "Common transforms")?;
        let joints = write_joints(&mut ctx, &self.joints)?;
        header.joints = ctx.pointer(joints, "Joint lists")?;
        ctx.dest.pad(0x10, 0);
        if !self.sound_defs.is_empty() {
            let sound_defs = ctx.dest.write_multiple(&self.sound_defs)?;
            header.sound_defs = ctx.pointer(sound_defs, "Sound definitions")?;
        }

        write_submeshes(&mut ctx, high_table, &self.submeshes, format)?;
        write_submeshes(&mut ctx, low_table, &self.low_detail_submeshes, format)?;
        write_metal_submeshes(&mut ctx, metal_table, &self.metal_submeshes)?;
        if let (Some(bangles), Some(table)) = (&self.bangles, bangles_table) {
            write_submeshes(&mut ctx, table, &bangles.submeshes, format)?;
        }

        let mut gif_usage = std::mem::take(&mut ctx.gif_usage);
        if let Some(last) = gif_usage.last_mut() {
            last.offset_and_terminator |= MobyGifUsageEntry::TERMINATOR;
            let gif_usage_ofs = ctx.dest.write_multiple(&gif_usage)?;
            header.gif_usage = ctx.pointer(gif_usage_ofs, "GIF usage table")?;
        }

        ctx.dest.write_at(header_ofs, &header)?;
        Ok(header_ofs)
    }

    /// Convert the regular submeshes into flat meshes: high detail, low
    /// detail and, if present, bangles
    pub fn lift_meshes(&self, texture_count: usize) -> Result<Vec<Mesh>> {
        let mut meshes = vec![
            lift_submeshes("high_lod", &self.submeshes, texture_count)?,
            lift_submeshes("low_lod", &self.low_detail_submeshes, texture_count)?,
        ];
        if let Some(bangles) = &self.bangles {
            meshes.push(lift_submeshes("bangles", &bangles.submeshes, texture_count)?);
        }
        Ok(meshes)
    }

    fn has_submeshes(&self) -> bool {
        !self.submeshes.is_empty()
            || !self.low_detail_submeshes.is_empty()
            || !self.metal_submeshes.is_empty()
            || self.bangles.as_ref().is_some_and(|b| !b.submeshes.is_empty())
    }

    fn format(&self, game: Game) -> Result<MobyFormat> {
        if game == Game::Rac2 && self.force_rac1_format && self.rac1_byte_b == 0 {
            return Err(MobyError::constraint(
                "Going Commando class in the R&C1 layout needs a non-zero byte 0xb",
            ));
        }
        Ok(MobyFormat::for_game(game, self.force_rac1_format))
    }

    fn check_counts(&self) -> Result<()> {
        let limits = [
            ("submeshes", self.submeshes.len(), 256),
            ("low detail submeshes", self.low_detail_submeshes.len(), 256),
            ("metal submeshes", self.metal_submeshes.len(), 256),
            ("sounds", self.sound_defs.len(), 256),
            ("sequences", self.sequences.len(), 256),
            ("joints", self.skeleton.len(), 255),
        ];
        for (what, count, limit) in limits {
            if count >= limit {
                return Err(MobyError::constraint(format!(
                    "Moby class has too many {what} ({count}, max is {})",
                    limit - 1
                )));
            }
        }
        if self.common_trans.len() != self.skeleton.len() * 0x10 {
            return Err(MobyError::constraint(format!(
                "Moby class has 0x{:x} bytes of common transforms for {} joints",
                self.common_trans.len(),
                self.skeleton.len()
            )));
        }
        Ok(())
    }
}

fn offset(value: i32, subject: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| MobyError::format(format!("{subject} has negative offset {value}")))
}

fn keep_valid(
    results: Vec<std::result::Result<MobySubMesh, StructuralWarning>>,
    table: SubMeshTable,
    warnings: &mut Vec<SubMeshWarning>,
) -> Vec<MobySubMesh> {
    results
        .into_iter()
        .enumerate()
        .filter_map(|(index, result)| match result {
            Ok(submesh) => Some(submesh),
            Err(warning) => {
                let warning = SubMeshWarning {
                    table,
                    index,
                    warning,
                };
                log::warn!("{warning}");
                warnings.push(warning);
                None
            }
        })
        .collect()
}
