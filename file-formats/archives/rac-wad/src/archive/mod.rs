//! WAD archive container
//!
//! An archive is a header followed by sector aligned lumps:
//!
//! ```text
//! [i32 header size][rest of header: lump entries][lump][lump]...
//! ```
//!
//! The header size is the only thing that identifies the archive kind. Each
//! kind has a static [`ArchiveDescriptor`] listing the header entries, and
//! the decoded lumps live in the typed fields of a [`WadContents`] variant.

mod descriptor;
mod kinds;
mod lump;

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt};
use rac_data::{Buffer, OutBuffer, SECTOR_SIZE};

pub use descriptor::{
    ARCHIVE_DESCRIPTORS, ArchiveDescriptor, EntryFormat, LumpDescriptor, LumpEntry, LumpHandler,
};
pub use kinds::{
    ArchiveKind, LevelWad, MISSION_COUNT, MpegWad, Rac1AudioWad, Rac1LevelWad, RacMpegWad,
    WadContents,
};
pub use lump::{LUMP_COMPRESSION_THREADS, LumpCodec, LumpRef, LumpTable, LumpValue};

use crate::{Error, Result};

/// Header sizes at or above this are rejected before allocating the header
pub const MAX_HEADER_SIZE: usize = 0x10000;

/// A lump as located in an archive file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumpInfo {
    pub name: &'static str,
    pub index: usize,
    /// Byte offset of the lump in the file
    pub offset: u64,
    /// Number of bytes belonging to the lump
    pub size: u64,
}

/// A decoded archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Header bytes as read, kept so fields other than lump entries survive a rewrite
    header: Vec<u8>,
    contents: WadContents,
}

impl Archive {
    /// Create an empty archive of the given kind
    pub fn new(kind: ArchiveKind) -> Self {
        let descriptor = ArchiveDescriptor::for_kind(kind);
        let mut header = OutBuffer::from_vec(vec![0; descriptor.header_size]);
        header.write_i32_at(0, descriptor.header_size as i32);
        Self {
            header: header.into_inner(),
            contents: (descriptor.create)(),
        }
    }

    pub fn kind(&self) -> ArchiveKind {
        self.contents.kind()
    }

    pub fn descriptor(&self) -> &'static ArchiveDescriptor {
        ArchiveDescriptor::for_kind(self.kind())
    }

    pub fn contents(&self) -> &WadContents {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut WadContents {
        &mut self.contents
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Read the header of an archive
    ///
    /// The header size field is part of the header, so the whole header is
    /// read again from offset zero once its size is known.
    pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>> {
        reader.seek(SeekFrom::Start(0))?;
        let header_size = reader.read_i32::<LittleEndian>()?;
        let header_size = usize::try_from(header_size)
            .ok()
            .filter(|size| (4..MAX_HEADER_SIZE).contains(size))
            .ok_or_else(|| Error::invalid_format(format!("Invalid header size 0x{header_size:x}")))?;

        let mut header = vec![0; header_size];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut header)?;
        Ok(header)
    }

    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = Self::read_header(reader)?;
        let descriptor = ArchiveDescriptor::for_header_size(header.len())?;
        let file_size = reader.seek(SeekFrom::End(0))?;
        let lumps = locate_lumps(descriptor, &header, file_size)?;

        let mut contents = (descriptor.create)();
        for info in &lumps {
            let lump = descriptor.lump(info.name).ok_or_else(|| {
                Error::invalid_format(format!("No lump named '{}'", info.name))
            })?;
            let mut src = vec![0; usize::try_from(info.size).unwrap_or(usize::MAX)];
            reader.seek(SeekFrom::Start(info.offset))?;
            reader.read_exact(&mut src).map_err(|e| {
                Error::invalid_format(format!(
                    "Failed to read lump {}[{}] at 0x{:x}: {e}",
                    info.name, info.index, info.offset
                ))
            })?;
            log::debug!(
                "Read lump {}[{}]: 0x{:x} bytes at 0x{:x}",
                info.name,
                info.index,
                info.size,
                info.offset
            );
            let value = lump.handler.codec.decode(src)?;
            (lump.handler.insert)(&mut contents, info.index, value)?;
        }

        Ok(Self { header, contents })
    }

    /// Lumps as recorded in the header this archive was read with
    pub fn entries(&self, file_size: u64) -> Result<Vec<LumpInfo>> {
        locate_lumps(self.descriptor(), &self.header, file_size)
    }

    /// Write the archive, returning where each lump was placed
    ///
    /// Every lump starts on a sector boundary. The header is written as a
    /// placeholder first and rewritten once all lump entries are known.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<Vec<LumpInfo>> {
        let descriptor = self.descriptor();
        let mut header = OutBuffer::from_vec(self.header.clone());
        for lump in descriptor.lumps {
            for index in 0..lump.count {
                let offset = lump.entry_offset(index);
                header.write_bytes_at(offset, &vec![0; lump.entry.entry_size()]);
            }
        }

        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(header.as_slice())?;
        let mut position = header.tell() as u64;

        let mut placed = Vec::new();
        for lump in descriptor.lumps {
            for index in 0..lump.count {
                let Some(value) = (lump.handler.get)(&self.contents, index)? else {
                    continue;
                };
                let bytes = lump.handler.codec.encode(value)?;
                if bytes.is_empty() {
                    continue;
                }

                position = pad_to_sector(writer, position)?;
                writer.write_all(&bytes)?;
                lump.entry
                    .write(&mut header, lump.entry_offset(index), position, bytes.len() as u64)?;
                log::debug!(
                    "Wrote lump {}[{index}]: 0x{:x} bytes at 0x{position:x}",
                    lump.name,
                    bytes.len()
                );
                placed.push(LumpInfo {
                    name: lump.name,
                    index,
                    offset: position,
                    size: bytes.len() as u64,
                });
                position += bytes.len() as u64;
            }
        }
        pad_to_sector(writer, position)?;

        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(header.as_slice())?;
        writer.seek(SeekFrom::End(0))?;
        Ok(placed)
    }
}

/// Resolve every non-empty header entry to a byte range of the file
///
/// Entries that only record a start sector extend to the next lump start in
/// the file, or to the end of the file.
fn locate_lumps(
    descriptor: &ArchiveDescriptor,
    header: &[u8],
    file_size: u64,
) -> Result<Vec<LumpInfo>> {
    let buffer = Buffer::new(header);
    let mut entries = Vec::new();
    for lump in descriptor.lumps {
        for index in 0..lump.count {
            let entry = lump.entry.read(&buffer, lump.entry_offset(index))?;
            if !entry.is_empty() {
                entries.push((lump, index, entry));
            }
        }
    }

    let mut starts: Vec<u64> = entries.iter().map(|(_, _, entry)| entry.offset).collect();
    starts.sort_unstable();

    entries
        .into_iter()
        .map(|(lump, index, entry)| {
            let size = match entry.size {
                Some(size) => size,
                None => {
                    let end = starts
                        .iter()
                        .copied()
                        .find(|start| *start > entry.offset)
                        .unwrap_or(file_size);
                    end.saturating_sub(entry.offset)
                }
            };
            if entry.offset.saturating_add(size) > file_size {
                return Err(Error::invalid_format(format!(
                    "Lump {}[{index}] at 0x{:x} (0x{size:x} bytes) runs past the end of the file (0x{file_size:x} bytes)",
                    lump.name, entry.offset
                )));
            }
            Ok(LumpInfo {
                name: lump.name,
                index,
                offset: entry.offset,
                size,
            })
        })
        .collect()
}

fn pad_to_sector<W: Write>(writer: &mut W, position: u64) -> Result<u64> {
    let aligned = position.div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
    let padding = usize::try_from(aligned - position).unwrap_or(0);
    writer.write_all(&vec![0; padding])?;
    Ok(aligned)
}
