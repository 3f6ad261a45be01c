//! Submeshes: VIF packed strips and their vertex tables
//!
//! A submesh table entry points at a VIF command list (ST unpack, index
//! unpack, optional texture unpack) and at a vertex table. Metal submeshes
//! use the same table entries but have no ST unpack and a simpler vertex
//! table, see [`metal`].

pub mod index;
pub mod metal;
pub mod vertex;
pub mod vif;

use rac_data::Buffer;
use thiserror::Error;

pub use index::{
    GsAdData, MOBY_TEX_CHROME, MOBY_TEX_GLASS, MOBY_TEX_NONE, MobyIndexBuffer, MobyTexturePrimitive,
};
pub use metal::{MobyMetalSubMesh, MobyMetalVertex};
pub use vertex::{MobyTexCoord, MobyVertex};

use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};
use crate::format::MobyFormat;
use crate::header::{MOBY_SUBMESH_ENTRY_SIZE, MobySubMeshEntry};
use index::TextureKind;
use vertex::{
    LOOKBACK, TRAILING_INDEX_SLOTS, VertexTableHeader, decode_lookback, encode_lookback,
};
use vif::{VifUnpack, VifVnVl, read_vif_unpacks};

/// VU memory address of the ST unpack, in quadwords
pub const ST_UNPACK_ADDR: u16 = 0xc2;

/// A submesh table entry whose vertex table does not agree with it
///
/// The submesh is dropped when one of these is found; the rest of the class
/// is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralWarning {
    #[error("bad vertex table offset or size (offset 0x{vertex_table_offset:x}, size 0x{vertex_data_size:x} quadwords)")]
    BadVertexTableOffset {
        vertex_table_offset: u32,
        vertex_data_size: u8,
    },

    #[error("weird value 0x{found:x} in submesh table entry at field 0xd (expected 0x{expected:x})")]
    UnknownD { found: u8, expected: u8 },

    #[error("weird value 0x{found:x} in submesh table entry at field 0xe (expected 0x{expected:x})")]
    UnknownE { found: u8, expected: u8 },
}

/// A regular (high or low detail, or bangle) submesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobySubMesh {
    /// Texture coordinates, one per vertex and duplicate vertex
    pub sts: Vec<MobyTexCoord>,
    pub index_buffer: MobyIndexBuffer,
    /// Vertices, each with its own intermediate buffer index
    pub vertices: Vec<MobyVertex>,
    /// Leading vertices of the first kind, counted in the vertex table header
    pub vertex_count_2: u32,
    /// Vertices of the second kind, following those of the first
    pub vertex_count_4: u32,
    pub unknowns: Vec<u16>,
    /// Intermediate buffer index of each duplicate, shifted left by 7
    pub duplicate_vertices: Vec<u16>,
    /// Vertex table header field 0xe, recomputed for R&C1
    pub unknown_e: u32,
    /// R&C1 only: bytes after the vertex table up to the end of the data
    pub unknown_e_data: Vec<u8>,
}

impl MobySubMesh {
    /// Number of vertices the VU receives for this submesh
    pub fn transfer_vertex_count(&self) -> usize {
        self.vertices.len() + self.duplicate_vertices.len()
    }
}

/// Read `count` submeshes from the table at `table_ofs`
pub(crate) fn read_submeshes(
    src: &Buffer<'_>,
    table_ofs: usize,
    count: usize,
    format: MobyFormat,
) -> Result<Vec<std::result::Result<MobySubMesh, StructuralWarning>>> {
    let entries: Vec<MobySubMeshEntry> = src.read_multiple(table_ofs, count, "moby submesh table")?;
    entries
        .iter()
        .map(|entry| read_submesh(src, entry, format))
        .collect()
}

/// Sum of offsets and sizes taken from the file, failing instead of wrapping
fn checked_offset(parts: &[usize], subject: &str) -> Result<usize> {
    parts
        .iter()
        .try_fold(0usize, |sum, &part| sum.checked_add(part))
        .ok_or_else(|| MobyError::format(format!("{subject} overflows")))
}

fn checked_stride(count: usize, stride: usize, subject: &str) -> Result<usize> {
    count
        .checked_mul(stride)
        .ok_or_else(|| MobyError::format(format!("{subject} overflows")))
}

/// Decode one submesh table entry
pub fn read_submesh(
    src: &Buffer<'_>,
    entry: &MobySubMeshEntry,
    format: MobyFormat,
) -> Result<std::result::Result<MobySubMesh, StructuralWarning>> {
    let command_list = src.subbuf_sized(
        entry.vif_list_offset as usize,
        usize::from(entry.vif_list_size) * 0x10,
        "moby submesh VIF list",
    )?;
    let unpacks = read_vif_unpacks(&command_list)?;
    let Some((st_unpack, rest)) = unpacks.split_first() else {
        return Err(MobyError::format("Moby submesh has no ST unpack"));
    };
    let st_data = Buffer::new(&st_unpack.data);
    let sts = st_data.read_multiple(0, st_data.len() / 4, "moby ST unpack")?;
    let index_buffer = MobyIndexBuffer::read(rest, TextureKind::Regular)?;

    let vertex_offset = entry.vertex_offset as usize;
    let header = VertexTableHeader::read(src, vertex_offset, format)?;
    let vertex_data_size = usize::from(entry.vertex_data_size) * 0x10;
    if header.vertex_table_offset / 0x10 > u32::from(entry.vertex_data_size) {
        return Ok(Err(StructuralWarning::BadVertexTableOffset {
            vertex_table_offset: header.vertex_table_offset,
            vertex_data_size: entry.vertex_data_size,
        }));
    }
    if u32::from(entry.transfer_vertex_count) != header.transfer_vertex_count {
        log::warn!(
            "Conflicting vertex counts: submesh table says {}, vertex table says {}",
            entry.transfer_vertex_count,
            header.transfer_vertex_count
        );
    }
    let expected_d = MobySubMeshEntry::expected_unknown_d(entry.transfer_vertex_count);
    if entry.unknown_d != expected_d {
        return Ok(Err(StructuralWarning::UnknownD {
            found: entry.unknown_d,
            expected: expected_d,
        }));
    }
    let expected_e = MobySubMeshEntry::expected_unknown_e(entry.transfer_vertex_count);
    if entry.unknown_e != expected_e {
        return Ok(Err(StructuralWarning::UnknownE {
            found: entry.unknown_e,
            expected: expected_e,
        }));
    }

    let unknown_count = header.unknown_count_0 as usize;
    let mut array_ofs = checked_offset(
        &[vertex_offset, format.vertex_header_size()],
        "Vertex table unknowns offset",
    )?;
    let unknowns = src.read_multiple(array_ofs, unknown_count, "vertex table")?;
    array_ofs = checked_offset(
        &[array_ofs, checked_stride(unknown_count, 2, "Vertex table unknowns size")?],
        "Vertex table duplicates offset",
    )?;
    if array_ofs % 4 != 0 {
        array_ofs += 2;
    }
    if array_ofs % 8 != 0 {
        array_ofs += 4;
    }
    let duplicate_vertices = src.read_multiple(
        array_ofs,
        header.duplicate_vertex_count as usize,
        "vertex table",
    )?;

    let vertex_ofs = checked_offset(
        &[vertex_offset, header.vertex_table_offset as usize],
        "Vertex table offset",
    )?;
    let n = checked_offset(
        &[
            header.vertex_count_2 as usize,
            header.vertex_count_4 as usize,
            header.main_vertex_count as usize,
        ],
        "Vertex table vertex count",
    )?;
    let vertices: Vec<MobyVertex> = src.read_multiple(vertex_ofs, n, "vertex table")?;

    let table_end = match format {
        MobyFormat::Rac1 => header.unknown_e as usize,
        MobyFormat::Rac2 | MobyFormat::Rac3Dl => vertex_data_size,
    };
    let table_len = table_end.saturating_sub(header.vertex_table_offset as usize) / 0x10;
    if table_len <= n {
        return Err(MobyError::format(format!(
            "Bad moby vertex table: room for {table_len} vertices but {n} are listed"
        )));
    }
    let last_ofs = checked_offset(
        &[vertex_ofs, checked_stride(table_len - 1, 0x10, "Vertex table size")?],
        "Vertex table end",
    )?;
    let table: Vec<u16> = (0..table_len)
        .map(|i| src.read_u16(vertex_ofs + i * 0x10, "vertex table"))
        .collect::<rac_data::Result<_>>()?;
    let mut trailing = [0u16; TRAILING_INDEX_SLOTS];
    for (i, slot) in trailing.iter_mut().enumerate() {
        *slot = src.read_u16(last_ofs + 2 + i * 2, "vertex table")?;
    }
    let indices = decode_lookback(&table, &trailing, n)?;
    let vertices = vertices
        .into_iter()
        .zip(indices)
        .map(|(vertex, index)| vertex.with_index(index))
        .collect();

    let unknown_e_data = match format {
        MobyFormat::Rac1 => {
            let start = header.unknown_e as usize;
            let size = vertex_data_size.checked_sub(start).ok_or_else(|| {
                MobyError::format(format!(
                    "Vertex table unknown_e offset 0x{start:x} lies past the vertex data"
                ))
            })?;
            let ofs = checked_offset(&[vertex_offset, start], "Vertex table unknown_e offset")?;
            src.read_bytes(ofs, size, "vertex table unknown_e data")?
                .to_vec()
        }
        MobyFormat::Rac2 | MobyFormat::Rac3Dl => Vec::new(),
    };

    Ok(Ok(MobySubMesh {
        sts,
        index_buffer,
        vertices,
        vertex_count_2: header.vertex_count_2,
        vertex_count_4: header.vertex_count_4,
        unknowns,
        duplicate_vertices,
        unknown_e: header.unknown_e,
        unknown_e_data,
    }))
}

/// Write the payloads of `submeshes`, filling in the table at `table_ofs`
pub(crate) fn write_submeshes(
    ctx: &mut EncoderContext<'_>,
    table_ofs: usize,
    submeshes: &[MobySubMesh],
    format: MobyFormat,
) -> Result<()> {
    for (i, submesh) in submeshes.iter().enumerate() {
        let entry = write_submesh(ctx, submesh, format)?;
        ctx.dest.write_at(table_ofs + i * MOBY_SUBMESH_ENTRY_SIZE, &entry)?;
    }
    Ok(())
}

fn write_submesh(
    ctx: &mut EncoderContext<'_>,
    submesh: &MobySubMesh,
    format: MobyFormat,
) -> Result<MobySubMeshEntry> {
    let mut entry = MobySubMeshEntry::default();

    ctx.dest.pad(0x10, 0);
    let vif_list_ofs = ctx.tell();
    entry.vif_list_offset = narrow(ctx.rel(vif_list_ofs), "VIF list offset")?;

    let mut st_data = rac_data::OutBuffer::new();
    st_data.write_multiple(&submesh.sts)?;
    let st_unpack = VifUnpack {
        masked: true,
        ..VifUnpack::new(VifVnVl::V2_16, ST_UNPACK_ADDR, st_data.into_inner())?
    };
    st_unpack.write(ctx.dest);
    entry.vif_list_texture_unpack_offset = submesh.index_buffer.write(ctx, true)?;
    ctx.dest.pad(0x10, 0);
    entry.vif_list_size = narrow((ctx.tell() - vif_list_ofs) / 0x10, "VIF list size")?;

    let n = submesh.vertices.len();
    let leading = submesh.vertex_count_2 as usize + submesh.vertex_count_4 as usize;
    if leading > n {
        return Err(MobyError::constraint(format!(
            "Submesh vertex counts ({} + {}) exceed its {n} vertices",
            submesh.vertex_count_2, submesh.vertex_count_4
        )));
    }
    let indices: Vec<u16> = submesh.vertices.iter().map(MobyVertex::index).collect();
    let lookback = encode_lookback(&indices);

    let header_ofs = ctx.dest.alloc(format.vertex_header_size());
    let mut header = VertexTableHeader {
        unknown_count_0: narrow(submesh.unknowns.len(), "Vertex table unknown count")?,
        vertex_count_2: submesh.vertex_count_2,
        vertex_count_4: submesh.vertex_count_4,
        main_vertex_count: narrow(n - leading, "Main vertex count")?,
        duplicate_vertex_count: narrow(submesh.duplicate_vertices.len(), "Duplicate vertex count")?,
        transfer_vertex_count: narrow(submesh.transfer_vertex_count(), "Transfer vertex count")?,
        vertex_table_offset: 0,
        unknown_e: submesh.unknown_e,
    };
    for value in &submesh.unknowns {
        ctx.dest.write_u16(*value);
    }
    ctx.dest.pad(0x8, 0);
    for value in &submesh.duplicate_vertices {
        ctx.dest.write_u16(*value);
    }
    ctx.dest.pad(0x10, 0);
    header.vertex_table_offset = narrow(ctx.tell() - header_ofs, "Vertex table offset")?;

    for (vertex, stored) in submesh.vertices.iter().zip(&lookback.stored) {
        ctx.dest.write(&vertex.with_index(*stored))?;
    }
    let mut pads = 0;
    while (n + pads) % 4 != 2 && pads < LOOKBACK - 1 {
        ctx.dest.write(&MobyVertex {
            low_word: lookback.spilled[pads],
            ..MobyVertex::default()
        })?;
        pads += 1;
    }
    ctx.dest.write_u16(lookback.spilled[pads]);
    for slot in 0..TRAILING_INDEX_SLOTS {
        ctx.dest.write_u16(lookback.spilled.get(pads + 1 + slot).copied().unwrap_or(0));
    }
    ctx.dest.write_u16(0);

    if format == MobyFormat::Rac1 {
        header.unknown_e = narrow(ctx.tell() - header_ofs, "Vertex table unknown_e offset")?;
        ctx.dest.write_bytes(&submesh.unknown_e_data);
    }
    header.write_at(ctx.dest, header_ofs, format)?;
    entry.vertex_offset = narrow(ctx.rel(header_ofs), "Vertex table offset")?;
    ctx.dest.pad(0x10, 0);
    entry.vertex_data_size = narrow((ctx.tell() - header_ofs) / 0x10, "Vertex data size")?;
    entry.transfer_vertex_count = narrow(submesh.transfer_vertex_count(), "Transfer vertex count")?;
    entry.unknown_d = MobySubMeshEntry::expected_unknown_d(entry.transfer_vertex_count);
    entry.unknown_e = MobySubMeshEntry::expected_unknown_e(entry.transfer_vertex_count);
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rac_data::OutBuffer;
    use test_case::test_case;

    fn sample_submesh(vertex_count: usize, format: MobyFormat) -> MobySubMesh {
        let vertices: Vec<MobyVertex> = (0..vertex_count)
            .map(|i| MobyVertex {
                low_word: 0x200 | (i as u16 * 3 + 1),
                unknown_2: [i as u8; 8],
                x: i as i16 * 100,
                y: -(i as i16),
                z: 0x40,
            })
            .collect();
        MobySubMesh {
            sts: (0..vertex_count + 1)
                .map(|i| MobyTexCoord { s: i as i16 * 0x100, t: -(i as i16) })
                .collect(),
            index_buffer: MobyIndexBuffer {
                unknown_0: 0x80,
                indices: vec![0x81, 0x82, 0x03, 0x04, 0x05, 0x00, 0x06, 0x00],
                secret_indices: vec![0x01, 0x02],
                textures: vec![MobyTexturePrimitive {
                    d3_tex0: GsAdData { data_lo: 1, address: 0x06, ..Default::default() },
                    ..Default::default()
                }],
            },
            vertices,
            vertex_count_2: 1,
            vertex_count_4: 1,
            unknowns: vec![0xaaaa, 0xbbbb, 0xcccc],
            duplicate_vertices: vec![1 << 7],
            unknown_e: if format == MobyFormat::Rac1 { 0 } else { 0x1234 },
            unknown_e_data: if format == MobyFormat::Rac1 { vec![0x5a; 0x10] } else { Vec::new() },
        }
    }

    fn encode(submeshes: &[MobySubMesh], format: MobyFormat) -> Vec<u8> {
        let mut dest = OutBuffer::new();
        let mut ctx = EncoderContext::new(&mut dest);
        let table = ctx.dest.alloc(submeshes.len() * MOBY_SUBMESH_ENTRY_SIZE);
        write_submeshes(&mut ctx, table, submeshes, format).unwrap();
        dest.into_inner()
    }

    #[test_case(1, MobyFormat::Rac1)]
    #[test_case(3, MobyFormat::Rac2)]
    #[test_case(7, MobyFormat::Rac3Dl)]
    #[test_case(8, MobyFormat::Rac1)]
    #[test_case(20, MobyFormat::Rac2)]
    fn test_submesh_round_trip(vertex_count: usize, format: MobyFormat) {
        let mut submesh = sample_submesh(vertex_count, format);
        if vertex_count < 2 {
            submesh.vertex_count_4 = 0;
        }
        let data = encode(std::slice::from_ref(&submesh), format);
        let read = read_submeshes(&Buffer::new(&data), 0, 1, format).unwrap();
        let mut read = read.into_iter().next().unwrap().unwrap();
        if format == MobyFormat::Rac1 {
            // Recomputed from the layout on every write.
            read.unknown_e = submesh.unknown_e;
        }
        assert_eq!(read, submesh);
        assert_eq!(encode(&[read], format), data);
    }

    #[test]
    fn test_vertex_table_entry_fields() {
        let submesh = sample_submesh(10, MobyFormat::Rac2);
        let data = encode(&[submesh.clone()], MobyFormat::Rac2);
        let entry: MobySubMeshEntry = Buffer::new(&data).read(0, "entry").unwrap();
        assert_eq!(entry.transfer_vertex_count, 11);
        assert_eq!(entry.unknown_d, (0xf + 11 * 6) / 0x10);
        assert_eq!(entry.unknown_e, (3 + 11) / 4);
        assert_eq!(entry.vif_list_offset, 0x10);
        assert_eq!(entry.vertex_offset % 0x10, 0);
    }

    #[test]
    fn test_unknown_d_mismatch_is_a_warning() {
        let mut data = encode(&[sample_submesh(4, MobyFormat::Rac2)], MobyFormat::Rac2);
        data[0xd] ^= 0x1;
        let read = read_submeshes(&Buffer::new(&data), 0, 1, MobyFormat::Rac2).unwrap();
        assert!(matches!(read[0], Err(StructuralWarning::UnknownD { .. })));
    }

    #[test]
    fn test_vertex_table_offset_past_data_is_a_warning() {
        let mut data = encode(&[sample_submesh(4, MobyFormat::Rac2)], MobyFormat::Rac2);
        let entry: MobySubMeshEntry = Buffer::new(&data).read(0, "entry").unwrap();
        let header = entry.vertex_offset as usize;
        data[header + 0xc..header + 0xe].copy_from_slice(&0x7ff0u16.to_le_bytes());
        let read = read_submeshes(&Buffer::new(&data), 0, 1, MobyFormat::Rac2).unwrap();
        assert!(matches!(read[0], Err(StructuralWarning::BadVertexTableOffset { .. })));
    }

    #[test_case(MobyFormat::Rac1, 0x4, &u32::MAX.to_le_bytes(); "rac1 vertex_count_2")]
    #[test_case(MobyFormat::Rac1, 0xc, &u32::MAX.to_le_bytes(); "rac1 main_vertex_count")]
    #[test_case(MobyFormat::Rac1, 0x0, &u32::MAX.to_le_bytes(); "rac1 unknown_count_0")]
    #[test_case(MobyFormat::Rac2, 0x2, &u16::MAX.to_le_bytes(); "rac2 vertex_count_2")]
    #[test_case(MobyFormat::Rac3Dl, 0x6, &u16::MAX.to_le_bytes(); "rac3 main_vertex_count")]
    fn test_corrupt_vertex_count_is_an_error(format: MobyFormat, field: usize, value: &[u8]) {
        let mut data = encode(&[sample_submesh(4, format)], format);
        let entry: MobySubMeshEntry = Buffer::new(&data).read(0, "entry").unwrap();
        let ofs = entry.vertex_offset as usize + field;
        data[ofs..ofs + value.len()].copy_from_slice(value);
        let err = read_submeshes(&Buffer::new(&data), 0, 1, format).unwrap_err();
        assert!(err.is_corruption(), "{err}");
    }

    #[test]
    fn test_offset_overflow_is_a_format_error() {
        let err = checked_offset(&[usize::MAX, 1], "Vertex table offset").unwrap_err();
        assert!(matches!(err, MobyError::Format(_)));
        let err = checked_stride(usize::MAX / 2, 4, "Vertex table size").unwrap_err();
        assert!(matches!(err, MobyError::Format(_)));
        assert_eq!(checked_offset(&[0x10, 0x20, 3], "sum").unwrap(), 0x33);
    }

    proptest! {
        #[test]
        fn prop_garbage_vertex_table_header_is_not_fatal(
            header in prop::collection::vec(any::<u8>(), 0x20),
        ) {
            let mut data = encode(&[sample_submesh(4, MobyFormat::Rac1)], MobyFormat::Rac1);
            let entry: MobySubMeshEntry = Buffer::new(&data).read(0, "entry").unwrap();
            let ofs = entry.vertex_offset as usize;
            data[ofs..ofs + 0x20].copy_from_slice(&header);
            let _ = read_submeshes(&Buffer::new(&data), 0, 1, MobyFormat::Rac1);
        }
    }

    #[test]
    fn test_submesh_without_sts_writes_an_empty_unpack() {
        let mut submesh = sample_submesh(2, MobyFormat::Rac2);
        submesh.sts.clear();
        let data = encode(&[submesh], MobyFormat::Rac2);
        let entry: MobySubMeshEntry = Buffer::new(&data).read(0, "entry").unwrap();
        let list = entry.vif_list_offset as usize;
        let st_code = u32::from_le_bytes(data[list..list + 4].try_into().unwrap());
        assert_eq!(st_code >> 16, 0x7500);
        // The index unpack follows with no ST data in between.
        assert_eq!(data[list + 7], 0x6e);
    }

    #[test]
    fn test_vertex_counts_must_fit() {
        let mut submesh = sample_submesh(2, MobyFormat::Rac2);
        submesh.vertex_count_2 = 3;
        let mut dest = OutBuffer::new();
        let mut ctx = EncoderContext::new(&mut dest);
        let err = write_submeshes(&mut ctx, 0, &[submesh], MobyFormat::Rac2).unwrap_err();
        assert!(matches!(err, MobyError::EncodingConstraint(_)));
    }
}
