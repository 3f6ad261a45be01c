//! LZ compression used for WAD blocks
//!
//! Compressed data is stored as a self-delimited block: a 0x10 byte header
//! holding the "WAD" magic and the total block size, followed by packets.

mod compress;
mod decompress;
mod header;

pub use compress::{CHUNK_SIZE, compress_wad};
pub use decompress::decompress_wad;
pub use header::{WAD_HEADER_SIZE, WAD_MAGIC, WadHeader, validate_wad};
