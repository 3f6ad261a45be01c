//! LZ block header

use std::io::Cursor;

use binrw::{BinRead, BinWrite};

use crate::{Error, Result};

/// Magic bytes at the start of every compressed block
pub const WAD_MAGIC: [u8; 3] = *b"WAD";

/// Size of the block header in bytes: magic, total size and padding
pub const WAD_HEADER_SIZE: usize = 0x10;

/// Header of a self-delimited compressed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct WadHeader {
    /// Always "WAD"
    pub magic: [u8; 3],
    /// Size of the whole block including this header
    pub total_size: i32,
    /// Zero padding up to 0x10 bytes
    pub pad: [u8; 9],
}

impl WadHeader {
    pub fn new(total_size: i32) -> Self {
        Self {
            magic: WAD_MAGIC,
            total_size,
            pad: [0; 9],
        }
    }

    /// Parse and validate the header at the start of `src`
    ///
    /// The advertised size must cover at least the header itself and must not
    /// run past the end of the buffer.
    pub fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < WAD_HEADER_SIZE {
            return Err(Error::compression(format!(
                "Buffer of 0x{:x} bytes is too small for a WAD header",
                src.len()
            )));
        }
        if !validate_wad(src) {
            return Err(Error::compression("Invalid WAD magic"));
        }
        let header = Self::read(&mut Cursor::new(&src[..WAD_HEADER_SIZE]))?;
        let total_size = usize::try_from(header.total_size).map_err(|_| {
            Error::compression(format!("Negative WAD block size {}", header.total_size))
        })?;
        if total_size < WAD_HEADER_SIZE || total_size > src.len() {
            return Err(Error::compression(format!(
                "WAD block size 0x{total_size:x} is outside the buffer (0x{:x} bytes)",
                src.len()
            )));
        }
        Ok(header)
    }

    pub fn total_size(&self) -> usize {
        self.total_size.max(0) as usize
    }
}

/// Check the three magic bytes that start a compressed block
pub fn validate_wad(magic: &[u8]) -> bool {
    magic.len() >= WAD_MAGIC.len() && magic[..WAD_MAGIC.len()] == WAD_MAGIC
}
