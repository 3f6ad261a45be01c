//! Metal (reflective) submeshes
//!
//! These share the index and texture unpacks of regular submeshes but have
//! no ST unpack, no lookback encoding and a fixed 0x10 byte vertex table
//! header. Their textures are always [`MOBY_TEX_CHROME`] or [`MOBY_TEX_GLASS`]
//! and they never get a GIF usage entry.

use binrw::{BinRead, BinWrite};
use rac_data::Buffer;

use super::index::{MOBY_TEX_CHROME, MOBY_TEX_GLASS, MobyIndexBuffer, TextureKind};
use super::vif::read_vif_unpacks;
use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};
use crate::header::{MOBY_SUBMESH_ENTRY_SIZE, MobyMetalVertexTableHeader, MobySubMeshEntry};

/// Metal vertex - 0x10 bytes, kept as stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyMetalVertex {
    pub data: [u8; 16],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyMetalSubMesh {
    pub index_buffer: MobyIndexBuffer,
    pub vertices: Vec<MobyMetalVertex>,
    pub unknown_4: i32,
    pub unknown_8: i32,
    pub unknown_c: i32,
}

pub(crate) fn read_metal_submeshes(
    src: &Buffer<'_>,
    table_ofs: usize,
    count: usize,
) -> Result<Vec<MobyMetalSubMesh>> {
    let entries: Vec<MobySubMeshEntry> =
        src.read_multiple(table_ofs, count, "moby metal submesh table")?;
    entries
        .iter()
        .map(|entry| {
            let command_list = src.subbuf_sized(
                entry.vif_list_offset as usize,
                usize::from(entry.vif_list_size) * 0x10,
                "moby metal submesh VIF list",
            )?;
            let unpacks = read_vif_unpacks(&command_list)?;
            let index_buffer = MobyIndexBuffer::read(&unpacks, TextureKind::Metal)?;

            let vertex_offset = entry.vertex_offset as usize;
            let header: MobyMetalVertexTableHeader =
                src.read(vertex_offset, "metal vertex table header")?;
            let vertex_count = usize::try_from(header.vertex_count).map_err(|_| {
                MobyError::format(format!(
                    "Metal vertex table has negative vertex count {}",
                    header.vertex_count
                ))
            })?;
            let vertices = src.read_multiple(vertex_offset + 0x10, vertex_count, "metal vertex table")?;
            Ok(MobyMetalSubMesh {
                index_buffer,
                vertices,
                unknown_4: header.unknown_4,
                unknown_8: header.unknown_8,
                unknown_c: header.unknown_c,
            })
        })
        .collect()
}

pub(crate) fn write_metal_submeshes(
    ctx: &mut EncoderContext<'_>,
    table_ofs: usize,
    submeshes: &[MobyMetalSubMesh],
) -> Result<()> {
    for (i, submesh) in submeshes.iter().enumerate() {
        if let Some(bad) = submesh
            .index_buffer
            .textures
            .iter()
            .map(|primitive| primitive.texture())
            .find(|texture| *texture != MOBY_TEX_CHROME && *texture != MOBY_TEX_GLASS)
        {
            return Err(MobyError::constraint(format!(
                "Metal submesh {i} uses texture {bad} (must be chrome or glass)"
            )));
        }

        let mut entry = MobySubMeshEntry::default();
        ctx.dest.pad(0x10, 0);
        let vif_list_ofs = ctx.tell();
        entry.vif_list_offset = narrow(ctx.rel(vif_list_ofs), "Metal VIF list offset")?;
        entry.vif_list_texture_unpack_offset = submesh.index_buffer.write(ctx, false)?;
        ctx.dest.pad(0x10, 0);
        entry.vif_list_size = narrow((ctx.tell() - vif_list_ofs) / 0x10, "Metal VIF list size")?;

        let vertex_count: u8 = narrow(submesh.vertices.len(), "Metal vertex count")?;
        let header_ofs = ctx.dest.write(&MobyMetalVertexTableHeader {
            vertex_count: i32::from(vertex_count),
            unknown_4: submesh.unknown_4,
            unknown_8: submesh.unknown_8,
            unknown_c: submesh.unknown_c,
        })?;
        ctx.dest.write_multiple(&submesh.vertices)?;
        entry.vertex_offset = narrow(ctx.rel(header_ofs), "Metal vertex table offset")?;
        ctx.dest.pad(0x10, 0);
        entry.vertex_data_size = narrow((ctx.tell() - header_ofs) / 0x10, "Metal vertex data size")?;
        entry.unknown_d = MobySubMeshEntry::expected_unknown_d(vertex_count);
        entry.unknown_e = MobySubMeshEntry::expected_unknown_e(vertex_count);
        entry.transfer_vertex_count = vertex_count;

        ctx.dest.write_at(table_ofs + i * MOBY_SUBMESH_ENTRY_SIZE, &entry)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submesh::index::{GsAdData, MobyTexturePrimitive};
    use pretty_assertions::assert_eq;
    use rac_data::OutBuffer;

    fn chrome_submesh() -> MobyMetalSubMesh {
        MobyMetalSubMesh {
            index_buffer: MobyIndexBuffer {
                unknown_0: 0,
                indices: vec![0x81, 0x82, 0x03, 0x00],
                secret_indices: vec![0, 4],
                textures: vec![MobyTexturePrimitive {
                    d3_tex0: GsAdData {
                        data_lo: MOBY_TEX_CHROME,
                        address: 0x06,
                        ..Default::default()
                    },
                    ..Default::default()
                }],
            },
            vertices: (0..3u8)
                .map(|i| MobyMetalVertex { data: [i; 16] })
                .collect(),
            unknown_4: 1,
            unknown_8: -2,
            unknown_c: 3,
        }
    }

    #[test]
    fn test_metal_round_trip() {
        let submeshes = vec![chrome_submesh(), chrome_submesh()];
        let mut dest = OutBuffer::new();
        let mut ctx = EncoderContext::new(&mut dest);
        let table = ctx.dest.alloc(2 * MOBY_SUBMESH_ENTRY_SIZE);
        write_metal_submeshes(&mut ctx, table, &submeshes).unwrap();
        assert!(ctx.gif_usage.is_empty());

        let data = dest.into_inner();
        let entry: MobySubMeshEntry = Buffer::new(&data).read(0, "entry").unwrap();
        assert_eq!(entry.transfer_vertex_count, 3);
        assert_eq!(entry.vertex_data_size, 4);
        let read = read_metal_submeshes(&Buffer::new(&data), 0, 2).unwrap();
        assert_eq!(read, submeshes);
    }

    #[test]
    fn test_regular_texture_rejected() {
        let mut submesh = chrome_submesh();
        submesh.index_buffer.textures[0].d3_tex0.data_lo = 5;
        let mut dest = OutBuffer::new();
        let mut ctx = EncoderContext::new(&mut dest);
        let err = write_metal_submeshes(&mut ctx, 0, &[submesh]).unwrap_err();
        assert!(matches!(err, MobyError::EncodingConstraint(_)));
    }
}
