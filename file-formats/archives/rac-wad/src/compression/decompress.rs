//! LZ block decompression
//!
//! A block is a sequence of packets. The first byte of each packet selects its
//! type:
//!
//! | Flag        | Packet                                                    |
//! |-------------|-----------------------------------------------------------|
//! | `0x00-0x0f` | Literal run of 4 to 273 bytes                             |
//! | `0x10-0x1f` | Far match (distance `0x4001-0xbfff`), sync or padding     |
//! | `0x20-0x3f` | Medium match (distance `1-0x4000`, up to 288 bytes)       |
//! | `0x40-0xff` | Short match (distance `1-0x800`, 3 to 8 bytes)            |
//!
//! Every match packet carries up to three trailing literal bytes in its low
//! two bits.

use super::header::{WAD_HEADER_SIZE, WadHeader};
use crate::{Error, Result};

/// Packets are padded so that the next packet starts at this offset modulo 0x1000
const PADDING_BOUNDARY: usize = 0x1000;

/// Decompress a self-delimited LZ block
///
/// The block size comes from the header, so trailing bytes after the block
/// (for example sector padding of the containing lump) are ignored. Any
/// malformed packet fails the whole call.
pub fn decompress_wad(src: &[u8]) -> Result<Vec<u8>> {
    let header = WadHeader::parse(src)?;
    let end = header.total_size();

    let mut reader = PacketReader {
        src: &src[..end],
        pos: WAD_HEADER_SIZE,
    };
    let mut dest = Vec::with_capacity(end * 2);

    while reader.pos < end {
        let flag = reader.byte("packet flag")?;

        if flag < 0x10 {
            let length = if flag == 0 {
                usize::from(reader.byte("literal length")?) + 18
            } else {
                usize::from(flag) + 3
            };
            dest.extend_from_slice(reader.bytes(length, "literal run")?);
            continue;
        }

        let (distance, length, literals) = if flag < 0x20 {
            let mut n = usize::from(flag & 7);
            if n == 0 {
                n = usize::from(reader.byte("far match length")?) + 7;
            }
            let b0 = reader.byte("far match distance")?;
            let b1 = reader.byte("far match distance")?;
            let field = usize::from(b0 >> 2) + (usize::from(b1) << 6);
            let far = usize::from(flag & 8) << 11;
            if far == 0 && field == 0 {
                if n == 1 {
                    // Sync packet: no match, only the trailing literals.
                    let count = usize::from(b0 & 3);
                    dest.extend_from_slice(reader.bytes(count, "sync literals")?);
                } else {
                    reader.skip_padding();
                }
                continue;
            }
            (far + field + 0x4000, n + 2, usize::from(b0 & 3))
        } else if flag < 0x40 {
            let mut n = usize::from(flag & 0x1f);
            if n == 0 {
                n = usize::from(reader.byte("medium match length")?) + 0x1f;
            }
            let b1 = reader.byte("medium match distance")?;
            let b2 = reader.byte("medium match distance")?;
            let distance = usize::from(b1 >> 2) + (usize::from(b2) << 6) + 1;
            (distance, n + 2, usize::from(b1 & 3))
        } else {
            let b1 = reader.byte("short match distance")?;
            let distance = (usize::from(b1) << 3) + usize::from((flag >> 2) & 7) + 1;
            (distance, usize::from(flag >> 5) + 1, usize::from(flag & 3))
        };

        copy_match(&mut dest, distance, length)?;
        dest.extend_from_slice(reader.bytes(literals, "trailing literals")?);
    }

    log::trace!(
        "Decompressed WAD block: 0x{:x} -> 0x{:x} bytes",
        end,
        dest.len()
    );
    Ok(dest)
}

/// Copy `length` bytes starting `distance` bytes back, byte by byte so that
/// a match may overlap its own output
fn copy_match(dest: &mut Vec<u8>, distance: usize, length: usize) -> Result<()> {
    if distance == 0 || distance > dest.len() {
        return Err(Error::compression(format!(
            "Match distance 0x{distance:x} reaches before the start of the output (0x{:x} bytes written)",
            dest.len()
        )));
    }
    let start = dest.len() - distance;
    dest.reserve(length);
    for i in 0..length {
        let byte = dest[start + i];
        dest.push(byte);
    }
    Ok(())
}

struct PacketReader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    fn byte(&mut self, what: &str) -> Result<u8> {
        let byte = *self.src.get(self.pos).ok_or_else(|| truncated(what, self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn bytes(&mut self, count: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.pos + count;
        let bytes = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| truncated(what, self.pos))?;
        self.pos = end;
        Ok(bytes)
    }

    fn skip_padding(&mut self) {
        let rem = self.pos % PADDING_BOUNDARY;
        let target = if rem <= WAD_HEADER_SIZE {
            self.pos - rem + WAD_HEADER_SIZE
        } else {
            self.pos - rem + PADDING_BOUNDARY + WAD_HEADER_SIZE
        };
        self.pos = target.min(self.src.len());
    }
}

fn truncated(what: &str, pos: usize) -> Error {
    Error::compression(format!("Truncated {what} at offset 0x{pos:x}"))
}
