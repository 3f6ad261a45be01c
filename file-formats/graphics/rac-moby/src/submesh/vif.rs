//! VIF command lists
//!
//! Submesh geometry is stored as the DMA payload sent to VIF1. A command list
//! is a stream of 32-bit codes, some followed by data:
//!
//! ```text
//! 31   30..24  23..16  15..0
//! [I]  [CMD]   [NUM]   [IMMEDIATE]
//! ```
//!
//! Only UNPACK packets carry data the codec needs. Every other known command
//! is skipped over, unknown commands are errors.

use rac_data::{Buffer, OutBuffer};

use crate::error::{MobyError, Result};

/// CMD bits shared by every UNPACK
pub const VIF_CMD_UNPACK: u8 = 0x60;

/// CMD bit that makes an UNPACK apply the write mask
pub const VIF_UNPACK_MASK: u8 = 0x10;

/// IMMEDIATE bit selecting signed (clear) or unsigned (set) expansion
const VIF_UNPACK_USN: u16 = 0x4000;

/// IMMEDIATE bit that makes the address relative to TOPS
const VIF_UNPACK_FLG: u16 = 0x8000;

/// Vector shape of an UNPACK: element count (vn) and element width (vl)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VifVnVl {
    S32 = 0x0,
    S16 = 0x1,
    S8 = 0x2,
    V2_32 = 0x4,
    V2_16 = 0x5,
    V2_8 = 0x6,
    V3_32 = 0x8,
    V3_16 = 0x9,
    V3_8 = 0xa,
    V4_32 = 0xc,
    V4_16 = 0xd,
    V4_8 = 0xe,
    V4_5 = 0xf,
}

impl VifVnVl {
    pub fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits & 0xf {
            0x0 => Self::S32,
            0x1 => Self::S16,
            0x2 => Self::S8,
            0x4 => Self::V2_32,
            0x5 => Self::V2_16,
            0x6 => Self::V2_8,
            0x8 => Self::V3_32,
            0x9 => Self::V3_16,
            0xa => Self::V3_8,
            0xc => Self::V4_32,
            0xd => Self::V4_16,
            0xe => Self::V4_8,
            0xf => Self::V4_5,
            _ => return None,
        })
    }

    /// Bytes of data carried by an UNPACK of `num` vectors, padded to a word
    pub fn data_size(self, num: usize) -> usize {
        let bits = self as usize;
        if self == Self::V4_5 {
            return (num * 2).div_ceil(4) * 4;
        }
        let vn = (bits >> 2) & 3;
        let vl = bits & 3;
        let size_bits = num * (vn + 1) * (32 >> vl);
        size_bits.div_ceil(32) * 4
    }
}

/// An UNPACK packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VifUnpack {
    pub vnvl: VifVnVl,
    /// Number of vectors, 1 to 256
    pub num: usize,
    /// Destination address in VU memory, in quadwords
    pub addr: u16,
    pub unsigned: bool,
    pub use_tops: bool,
    pub masked: bool,
    pub data: Vec<u8>,
}

impl VifUnpack {
    /// A signed, TOPS relative unpack of `data`, which must hold whole vectors
    ///
    /// Empty data gives a NUM field of zero, the same code as 256 vectors.
    pub fn new(vnvl: VifVnVl, addr: u16, data: Vec<u8>) -> Result<Self> {
        let vector_size = vnvl.data_size(1);
        if vnvl == VifVnVl::V4_5 || data.len() % vector_size != 0 {
            return Err(MobyError::constraint(format!(
                "0x{:x} bytes cannot be unpacked as {vnvl:?} vectors",
                data.len()
            )));
        }
        let num = data.len() / vector_size;
        if num > 256 {
            return Err(MobyError::constraint(format!(
                "Unpack of {num} vectors is more than 256"
            )));
        }
        Ok(Self {
            vnvl,
            num,
            addr,
            unsigned: false,
            use_tops: true,
            masked: false,
            data,
        })
    }

    /// The NUM field as encoded, where both 0 and 256 wrap to zero
    pub fn num_field(&self) -> u8 {
        (self.num & 0xff) as u8
    }

    pub fn code(&self) -> u32 {
        let mut cmd = VIF_CMD_UNPACK | self.vnvl as u8;
        if self.masked {
            cmd |= VIF_UNPACK_MASK;
        }
        let mut imm = self.addr & 0x3ff;
        if self.unsigned {
            imm |= VIF_UNPACK_USN;
        }
        if self.use_tops {
            imm |= VIF_UNPACK_FLG;
        }
        (u32::from(cmd) << 24) | (u32::from(self.num_field()) << 16) | u32::from(imm)
    }

    /// Append the code and data, returning the offset of the code
    pub fn write(&self, dest: &mut OutBuffer) -> usize {
        let ofs = dest.write_u32(self.code());
        dest.write_bytes(&self.data);
        ofs
    }
}

/// Parse a command list and return its UNPACK packets in order
pub fn read_vif_unpacks(src: &Buffer<'_>) -> Result<Vec<VifUnpack>> {
    let mut unpacks = Vec::new();
    let mut ofs = 0;
    while ofs + 4 <= src.len() {
        let code = src.read_u32(ofs, "VIF code")?;
        let code_ofs = ofs;
        ofs += 4;
        let cmd = ((code >> 24) & 0x7f) as u8;
        let num = ((code >> 16) & 0xff) as usize;
        let imm = (code & 0xffff) as u16;

        if cmd & VIF_CMD_UNPACK == VIF_CMD_UNPACK {
            let vnvl = VifVnVl::from_bits(cmd).ok_or_else(|| {
                MobyError::format(format!("Invalid VIF unpack format 0x{cmd:x} at 0x{code_ofs:x}"))
            })?;
            let num = if num == 0 { 256 } else { num };
            let size = vnvl.data_size(num);
            let data = src.read_bytes(ofs, size, "VIF unpack data")?.to_vec();
            ofs += size;
            log::trace!("VIF UNPACK {vnvl:?} num={num} addr=0x{:x} at 0x{code_ofs:x}", imm & 0x3ff);
            unpacks.push(VifUnpack {
                vnvl,
                num,
                addr: imm & 0x3ff,
                unsigned: imm & VIF_UNPACK_USN != 0,
                use_tops: imm & VIF_UNPACK_FLG != 0,
                masked: cmd & VIF_UNPACK_MASK != 0,
                data,
            });
            continue;
        }

        let skip = match cmd {
            // NOP, STCYCL, OFFSET, BASE, ITOP, STMOD, MSKPATH3, MARK
            0x00..=0x07 => 0,
            // FLUSHE, FLUSH, FLUSHA, MSCAL, MSCALF, MSCNT
            0x10 | 0x11 | 0x13 | 0x14 | 0x15 | 0x17 => 0,
            // STMASK
            0x20 => 4,
            // STROW, STCOL
            0x30 | 0x31 => 16,
            // MPG
            0x4a => (if num == 0 { 256 } else { num }) * 8,
            // DIRECT, DIRECTHL
            0x50 | 0x51 => (if imm == 0 { 0x10000 } else { usize::from(imm) }) * 16,
            _ => {
                return Err(MobyError::format(format!(
                    "Unknown VIF command 0x{cmd:x} at 0x{code_ofs:x}"
                )));
            }
        };
        if ofs + skip > src.len() {
            return Err(MobyError::format(format!(
                "VIF command 0x{cmd:x} at 0x{code_ofs:x} runs past the end of the command list"
            )));
        }
        ofs += skip;
    }
    Ok(unpacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(VifVnVl::V2_16, 3, 12)]
    #[test_case(VifVnVl::V4_8, 5, 20)]
    #[test_case(VifVnVl::V4_32, 4, 64)]
    #[test_case(VifVnVl::S8, 3, 4)]
    #[test_case(VifVnVl::V3_8, 3, 12)]
    #[test_case(VifVnVl::V4_5, 3, 8)]
    fn test_unpack_data_size(vnvl: VifVnVl, num: usize, size: usize) {
        assert_eq!(vnvl.data_size(num), size);
    }

    #[test]
    fn test_unpack_codes() {
        let st = VifUnpack {
            masked: true,
            ..VifUnpack::new(VifVnVl::V2_16, 0xc2, vec![0; 8]).unwrap()
        };
        assert_eq!(st.code(), 0x7502_80c2);
        let index = VifUnpack::new(VifVnVl::V4_8, 0x12d, vec![0; 0x400]).unwrap();
        assert_eq!(index.num, 256);
        assert_eq!(index.code(), 0x6e00_812d);
    }

    #[test]
    fn test_empty_unpack() {
        let empty = VifUnpack::new(VifVnVl::V2_16, 0xc2, Vec::new()).unwrap();
        assert_eq!(empty.num, 0);
        assert_eq!(empty.code(), 0x6500_80c2);
        let mut dest = OutBuffer::new();
        empty.write(&mut dest);
        assert_eq!(dest.tell(), 4);
    }

    #[test]
    fn test_unpack_too_long() {
        let err = VifUnpack::new(VifVnVl::V4_8, 0, vec![0; 0x404]).unwrap_err();
        assert!(matches!(err, MobyError::EncodingConstraint(_)));
    }

    #[test]
    fn test_read_skips_other_commands() {
        let mut dest = OutBuffer::new();
        dest.write_u32(0); // NOP
        dest.write_u32(0x2000_0000); // STMASK
        dest.write_u32(0xffff_ffff);
        dest.write_u32(0x0100_0404); // STCYCL
        let index = VifUnpack::new(VifVnVl::V4_8, 0x12d, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        index.write(&mut dest);
        dest.write_u32(0x5000_0001); // DIRECT
        dest.write_bytes(&[0; 16]);
        dest.pad(0x10, 0);

        let data = dest.into_inner();
        let unpacks = read_vif_unpacks(&Buffer::new(&data)).unwrap();
        assert_eq!(unpacks, vec![index]);
    }

    #[test]
    fn test_unknown_command_rejected() {
        let data = 0x0800_0000u32.to_le_bytes();
        assert!(read_vif_unpacks(&Buffer::new(&data)).is_err());
        let data = 0x4000_0000u32.to_le_bytes();
        assert!(read_vif_unpacks(&Buffer::new(&data)).is_err());
    }

    #[test]
    fn test_truncated_unpack_rejected() {
        let mut dest = OutBuffer::new();
        dest.write_u32(0x6c04_8000);
        dest.write_bytes(&[0; 0x20]);
        assert!(read_vif_unpacks(&Buffer::new(dest.as_slice())).is_err());
    }

    #[test]
    fn test_partial_vectors_rejected() {
        assert!(VifUnpack::new(VifVnVl::V2_16, 0, vec![0; 6]).is_err());
        assert!(VifUnpack::new(VifVnVl::V4_8, 0, vec![]).is_err());
    }
}
