//! Index and texture unpacks, shared by regular and metal submeshes
//!
//! The index unpack starts with a [`MobyIndexHeader`] followed by the strip
//! indices. The optional texture unpack holds one 0x40 byte GS primitive per
//! texture. One extra "secret" index is stored in the index header and one
//! more in each of the first quadwords of the texture unpack.

use binrw::{BinRead, BinWrite};
use rac_data::Buffer;

use super::vif::{VifUnpack, VifVnVl};
use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};
use crate::header::{MobyGifUsageEntry, MobyIndexHeader};

/// Texture index used by untextured primitives
pub const MOBY_TEX_NONE: i32 = -1;
/// Texture index of chrome metal primitives
pub const MOBY_TEX_CHROME: i32 = -2;
/// Texture index of glass metal primitives
pub const MOBY_TEX_GLASS: i32 = -3;

/// VU memory address of the index unpack, in quadwords
pub const INDEX_UNPACK_ADDR: u16 = 0x12d;

/// Maximum number of textures a GIF usage entry can list
pub const GIF_USAGE_MAX_TEXTURES: usize = 12;

const TEXTURE_PRIMITIVE_SIZE: usize = 0x40;

/// A GS register write in A+D format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GsAdData {
    pub data_lo: i32,
    pub data_hi: i32,
    pub address: u8,
    pub pad_9: u8,
    pub pad_a: u16,
    pub pad_c: u32,
}

/// GS register writes that select a texture - 0x40 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyTexturePrimitive {
    pub d1_xyzf2: GsAdData,
    pub d2_clamp: GsAdData,
    pub d3_tex0: GsAdData,
    pub d4_xyzf2: GsAdData,
}

impl MobyTexturePrimitive {
    /// Index into the class texture list, or one of the `MOBY_TEX_*` values
    pub fn texture(&self) -> i32 {
        self.d3_tex0.data_lo
    }
}

/// Which texture indices a submesh table may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextureKind {
    Regular,
    Metal,
}

impl TextureKind {
    fn accepts(self, texture: i32) -> bool {
        match self {
            Self::Regular => texture >= MOBY_TEX_NONE,
            Self::Metal => texture == MOBY_TEX_CHROME || texture == MOBY_TEX_GLASS,
        }
    }
}

/// Strip indices and textures of a submesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyIndexBuffer {
    /// First byte of the index header
    pub unknown_0: u8,
    pub indices: Vec<u8>,
    /// One more than there are textures
    pub secret_indices: Vec<i32>,
    pub textures: Vec<MobyTexturePrimitive>,
}

impl MobyIndexBuffer {
    /// Decode the index unpack and the optional texture unpack after it
    pub(crate) fn read(unpacks: &[VifUnpack], kind: TextureKind) -> Result<Self> {
        let index = unpacks
            .first()
            .ok_or_else(|| MobyError::format("Moby submesh has no index unpack"))?;
        let index_data = Buffer::new(&index.data);
        let header: MobyIndexHeader = index_data.read(0, "moby index unpack header")?;
        if header.pad != 0 {
            return Err(MobyError::format(format!(
                "Moby has bad index buffer: header pad byte is 0x{:x}",
                header.pad
            )));
        }

        let mut buffer = Self {
            unknown_0: header.unknown_0,
            indices: index_data.read_bytes(4, index_data.len() - 4, "moby index unpack data")?.to_vec(),
            secret_indices: vec![i32::from(header.secret_index)],
            textures: Vec::new(),
        };

        if let Some(texture) = unpacks.get(1) {
            if texture.data.len() % TEXTURE_PRIMITIVE_SIZE != 0 {
                return Err(MobyError::format(format!(
                    "Moby has bad texture unpack: 0x{:x} bytes is not a whole number of primitives",
                    texture.data.len()
                )));
            }
            let count = texture.data.len() / TEXTURE_PRIMITIVE_SIZE;
            // The secret indices are taken out of the primitives so that they
            // only live in `secret_indices`.
            let mut primitives = texture.data.clone();
            for i in 0..count {
                let ofs = i * 0x10 + 0xc;
                buffer
                    .secret_indices
                    .push(Buffer::new(&primitives).read_i32(ofs, "extra index")?);
                primitives[ofs..ofs + 4].fill(0);
            }
            let texture_data = Buffer::new(&primitives);
            for i in 0..count {
                let primitive: MobyTexturePrimitive =
                    texture_data.read(i * TEXTURE_PRIMITIVE_SIZE, "moby texture primitive")?;
                if !kind.accepts(primitive.texture()) {
                    return Err(MobyError::format(format!(
                        "{} moby submesh has bad texture index {}",
                        if kind == TextureKind::Metal { "Metal" } else { "Regular" },
                        primitive.texture()
                    )));
                }
                buffer.textures.push(primitive);
            }
        }
        Ok(buffer)
    }

    /// Write the index unpack and, if there are textures, the texture unpack
    ///
    /// Returns the offset of the texture unpack from the end of the list in
    /// quadwords, or zero without textures. A GIF usage entry is recorded
    /// when `record_gif_usage` is set.
    pub(crate) fn write(&self, ctx: &mut EncoderContext<'_>, record_gif_usage: bool) -> Result<u16> {
        if self.secret_indices.len() != self.textures.len() + 1 {
            return Err(MobyError::constraint(format!(
                "Submesh has {} secret indices but {} textures (needs one more index than textures)",
                self.secret_indices.len(),
                self.textures.len()
            )));
        }

        let mut index_data = vec![0u8; 4];
        index_data.extend_from_slice(&self.indices);
        if index_data.len() % 4 != 0 {
            return Err(MobyError::constraint(format!(
                "Index buffer of {} bytes plus its header is not a whole number of words",
                self.indices.len()
            )));
        }
        let header = MobyIndexHeader {
            unknown_0: self.unknown_0,
            texture_unpack_offset_quadwords: if self.textures.is_empty() {
                0
            } else {
                (index_data.len() / 4) as u8
            },
            secret_index: narrow(self.secret_indices[0], "First secret index")?,
            pad: 0,
        };
        let mut header_dest = rac_data::OutBuffer::from_vec(index_data);
        header_dest.write_at(0, &header)?;
        let index_unpack = VifUnpack::new(VifVnVl::V4_8, INDEX_UNPACK_ADDR, header_dest.into_inner())?;
        index_unpack.write(ctx.dest);

        if self.textures.is_empty() {
            return Ok(0);
        }

        while ctx.tell() % 0x10 != 0xc {
            ctx.dest.write_u8(0);
        }
        let mut texture_data = rac_data::OutBuffer::new();
        texture_data.write_multiple(&self.textures)?;
        for (i, secret) in self.secret_indices.iter().enumerate().skip(1) {
            texture_data.write_i32_at((i - 1) * 0x10 + 0xc, *secret);
        }
        let texture_unpack = VifUnpack::new(
            VifVnVl::V4_32,
            INDEX_UNPACK_ADDR + u16::from(index_unpack.num_field()),
            texture_data.into_inner(),
        )?;
        let code_ofs = texture_unpack.write(ctx.dest);

        if record_gif_usage {
            if self.textures.len() > GIF_USAGE_MAX_TEXTURES {
                return Err(MobyError::constraint(format!(
                    "Submesh has {} textures (max is {GIF_USAGE_MAX_TEXTURES})",
                    self.textures.len()
                )));
            }
            let mut entry = MobyGifUsageEntry {
                texture_indices: [0xff; GIF_USAGE_MAX_TEXTURES],
                offset_and_terminator: (ctx.rel(code_ofs) - 0xc) as u32,
            };
            for (slot, primitive) in entry.texture_indices.iter_mut().zip(&self.textures) {
                *slot = primitive.texture() as u8;
            }
            ctx.gif_usage.push(entry);
        }

        ctx.dest.pad(0x10, 0);
        narrow((ctx.tell() - code_ofs + 4) / 0x10, "Texture unpack offset")
    }
}
