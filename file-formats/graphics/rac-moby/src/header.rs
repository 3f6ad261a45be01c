//! Fixed layout structures of a moby class
//!
//! These mirror the on-disk records one to one. Offsets stored in them are
//! relative to the start of the class and are recomputed on every write, so
//! the decoded [`MobyClass`](crate::MobyClass) never keeps them.

use binrw::{BinRead, BinWrite};
use glam::{Mat4, Vec4};

/// Size of [`MobyClassHeader`] on disk, which is also where the sequence
/// offset table starts
pub const MOBY_CLASS_HEADER_SIZE: usize = 0x48;

/// Size of a [`MobySubMeshEntry`] on disk
pub const MOBY_SUBMESH_ENTRY_SIZE: usize = 0x10;

/// Four packed floats
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct Vec4f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<Vec4f> for Vec4 {
    fn from(v: Vec4f) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<Vec4> for Vec4f {
    fn from(v: Vec4) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
            w: v.w,
        }
    }
}

/// A column major 4x4 matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct Mat4f {
    pub cols: [f32; 16],
}

impl From<Mat4f> for Mat4 {
    fn from(m: Mat4f) -> Self {
        Self::from_cols_array(&m.cols)
    }
}

impl From<Mat4> for Mat4f {
    fn from(m: Mat4) -> Self {
        Self {
            cols: m.to_cols_array(),
        }
    }
}

/// Moby class header - 0x48 bytes
///
/// # Binary Layout
///
/// ```text
/// Offset | Size | Field
/// -------|------|-------------------------------------------------
/// 0x00   |  4   | submesh_table_offset
/// 0x04   |  1   | submesh_count
/// 0x05   |  1   | low_detail_submesh_count
/// 0x06   |  1   | metal_submesh_count
/// 0x07   |  1   | metal_submesh_begin (index into the submesh table)
/// 0x08   |  1   | joint_count
/// 0x09   |  1   | unknown_9
/// 0x0a   |  1   | rac1_byte_a
/// 0x0b   |  1   | rac12_byte_b (non-zero marks an R&C1 layout in R&C2)
/// 0x0c   |  1   | sequence_count
/// 0x0d   |  1   | sound_count
/// 0x0e   |  1   | lod_trans
/// 0x0f   |  1   | shadow
/// 0x10   |  4   | collision
/// 0x14   |  4   | skeleton
/// 0x18   |  4   | common_trans
/// 0x1c   |  4   | joints
/// 0x20   |  4   | gif_usage
/// 0x24   |  4   | scale
/// 0x28   |  4   | sound_defs
/// 0x2c   |  1   | bangles (in units of 0x10 bytes)
/// 0x2d   |  1   | mip_dist
/// 0x2e   |  2   | corncob (in units of 0x10 bytes, a plain value in R&C1)
/// 0x30   | 16   | bounding_sphere
/// 0x40   |  4   | glow_rgba
/// 0x44   |  2   | mode_bits
/// 0x46   |  1   | type
/// 0x47   |  1   | mode_bits2
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyClassHeader {
    pub submesh_table_offset: i32,
    pub submesh_count: u8,
    pub low_detail_submesh_count: u8,
    pub metal_submesh_count: u8,
    pub metal_submesh_begin: u8,
    pub joint_count: u8,
    pub unknown_9: u8,
    pub rac1_byte_a: u8,
    pub rac12_byte_b: u8,
    pub sequence_count: u8,
    pub sound_count: u8,
    pub lod_trans: u8,
    pub shadow: u8,
    pub collision: i32,
    pub skeleton: i32,
    pub common_trans: i32,
    pub joints: i32,
    pub gif_usage: i32,
    pub scale: f32,
    pub sound_defs: i32,
    pub bangles: u8,
    pub mip_dist: u8,
    pub corncob: i16,
    pub bounding_sphere: Vec4f,
    pub glow_rgba: i32,
    pub mode_bits: i16,
    pub moby_type: u8,
    pub mode_bits2: u8,
}

/// Sequence header - 0x1c bytes, followed by the frame pointer table and the
/// trigger list
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobySequenceHeader {
    pub bounding_sphere: Vec4f,
    pub frame_count: u8,
    pub sound_count: u8,
    pub trigger_count: u8,
    pub pad: i8,
    /// Offset of the trigger data relative to this header, zero if absent
    pub triggers: u32,
    pub animation_info: u32,
}

/// Frame header - 0x10 bytes, followed by `count` quadwords of frame data
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyFrameHeader {
    pub unknown_0: f32,
    pub unknown_4: u16,
    pub count: u16,
    pub unknown_8: u32,
    pub unknown_c: u8,
    pub unknown_d: u8,
    pub unknown_e: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyCollisionHeader {
    pub unknown_0: i16,
    pub unknown_2: i16,
    pub first_part_size: i32,
    pub third_part_size: i32,
    pub second_part_size: i32,
}

/// Entry of a submesh table - 0x10 bytes
///
/// # Binary Layout
///
/// ```text
/// Offset | Size | Field
/// -------|------|-------------------------------------------------
/// 0x00   |  4   | vif_list_offset
/// 0x04   |  2   | vif_list_size (quadwords)
/// 0x06   |  2   | vif_list_texture_unpack_offset (quadwords)
/// 0x08   |  4   | vertex_offset
/// 0x0c   |  1   | vertex_data_size (quadwords)
/// 0x0d   |  1   | unknown_d, always (0xf + transfer_vertex_count * 6) / 0x10
/// 0x0e   |  1   | unknown_e, always (3 + transfer_vertex_count) / 4
/// 0x0f   |  1   | transfer_vertex_count
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobySubMeshEntry {
    pub vif_list_offset: u32,
    pub vif_list_size: u16,
    pub vif_list_texture_unpack_offset: u16,
    pub vertex_offset: u32,
    pub vertex_data_size: u8,
    pub unknown_d: u8,
    pub unknown_e: u8,
    pub transfer_vertex_count: u8,
}

impl MobySubMeshEntry {
    pub fn expected_unknown_d(transfer_vertex_count: u8) -> u8 {
        ((0xf + u32::from(transfer_vertex_count) * 6) / 0x10) as u8
    }

    pub fn expected_unknown_e(transfer_vertex_count: u8) -> u8 {
        ((3 + u32::from(transfer_vertex_count)) / 4) as u8
    }
}

/// R&C1 vertex table header - 0x20 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyVertexTableHeaderRac1 {
    pub unknown_count_0: u32,
    pub vertex_count_2: u32,
    pub vertex_count_4: u32,
    pub main_vertex_count: u32,
    pub duplicate_vertex_count: u32,
    pub transfer_vertex_count: u32,
    pub vertex_table_offset: u32,
    pub unknown_e: u32,
}

/// R&C2, R&C3 and Deadlocked vertex table header - 0x10 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyVertexTableHeaderRac23Dl {
    pub unknown_count_0: u16,
    pub vertex_count_2: u16,
    pub vertex_count_4: u16,
    pub main_vertex_count: u16,
    pub duplicate_vertex_count: u16,
    pub transfer_vertex_count: u16,
    pub vertex_table_offset: u16,
    pub unknown_e: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyMetalVertexTableHeader {
    pub vertex_count: i32,
    pub unknown_4: i32,
    pub unknown_8: i32,
    pub unknown_c: i32,
}

/// First word of an index unpack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyIndexHeader {
    pub unknown_0: u8,
    pub texture_unpack_offset_quadwords: u8,
    pub secret_index: i8,
    pub pad: u8,
}

/// Entry of the GIF usage table
///
/// Lists the textures a submesh's texture unpack refers to. The top bit of
/// the offset marks the last entry in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MobyGifUsageEntry {
    pub texture_indices: [u8; 12],
    pub offset_and_terminator: u32,
}

impl MobyGifUsageEntry {
    pub const TERMINATOR: u32 = 0x8000_0000;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rac_data::{Buffer, OutBuffer};

    fn size_of<T: for<'b> BinWrite<Args<'b> = ()> + Default>() -> usize {
        let mut dest = OutBuffer::new();
        dest.write(&T::default()).unwrap();
        dest.tell()
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<MobyClassHeader>(), MOBY_CLASS_HEADER_SIZE);
        assert_eq!(size_of::<MobySequenceHeader>(), 0x1c);
        assert_eq!(size_of::<MobyFrameHeader>(), 0x10);
        assert_eq!(size_of::<MobyCollisionHeader>(), 0x10);
        assert_eq!(size_of::<MobySubMeshEntry>(), MOBY_SUBMESH_ENTRY_SIZE);
        assert_eq!(size_of::<MobyVertexTableHeaderRac1>(), 0x20);
        assert_eq!(size_of::<MobyVertexTableHeaderRac23Dl>(), 0x10);
        assert_eq!(size_of::<MobyGifUsageEntry>(), 0x10);
        assert_eq!(size_of::<Mat4f>(), 0x40);
    }

    #[test]
    fn test_class_header_field_offsets() {
        let mut data = vec![0u8; MOBY_CLASS_HEADER_SIZE];
        data[0x07] = 9;
        data[0x0c] = 3;
        data[0x2c] = 0x12;
        data[0x2e..0x30].copy_from_slice(&0x34i16.to_le_bytes());
        data[0x46] = 0x77;
        let header: MobyClassHeader = Buffer::new(&data).read(0, "moby class header").unwrap();
        assert_eq!(header.metal_submesh_begin, 9);
        assert_eq!(header.sequence_count, 3);
        assert_eq!(header.bangles, 0x12);
        assert_eq!(header.corncob, 0x34);
        assert_eq!(header.moby_type, 0x77);
    }

    #[test]
    fn test_matrix_conversion() {
        let matrix = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);
        let packed = Mat4f::from(matrix);
        assert_eq!(packed.cols[4], 5.0);
        assert_eq!(Mat4::from(packed), matrix);
    }
}
