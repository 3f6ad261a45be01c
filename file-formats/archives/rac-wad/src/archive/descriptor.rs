//! Static descriptions of every archive kind
//!
//! Each descriptor lists where the lump entries sit in the header and binds
//! every lump to a field of the matching [`WadContents`] variant. Adding an
//! archive kind only needs a new table entry.

use rac_data::{Buffer, OutBuffer, Sector32, SectorByteRange, SectorRange};

use super::kinds::{
    ArchiveKind, LevelWad, MpegWad, Rac1AudioWad, Rac1LevelWad, RacMpegWad, WadContents,
};
use super::lump::{LumpCodec, LumpRef, LumpValue};
use crate::{Error, Result};

/// On-disk layout of a single header entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    /// Offset and size, both in sectors
    SectorRange,
    /// Offset in sectors, size in bytes
    SectorByteRange,
    /// Start sector only; the lump runs up to the next lump or the end of file
    SectorOnly,
}

/// Location of a lump in bytes, as recorded by its header entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumpEntry {
    pub offset: u64,
    /// `None` when the entry format does not record a size
    pub size: Option<u64>,
}

impl LumpEntry {
    pub fn is_empty(&self) -> bool {
        match self.size {
            Some(size) => size == 0,
            None => self.offset == 0,
        }
    }
}

impl EntryFormat {
    /// Size of one entry in the header
    pub fn entry_size(self) -> usize {
        match self {
            Self::SectorRange | Self::SectorByteRange => 8,
            Self::SectorOnly => 4,
        }
    }

    pub fn read(self, header: &Buffer<'_>, offset: usize) -> Result<LumpEntry> {
        let entry = match self {
            Self::SectorRange => {
                let range: SectorRange = header.read(offset, "lump entry")?;
                LumpEntry {
                    offset: range.offset.bytes(),
                    size: Some(range.size.bytes()),
                }
            }
            Self::SectorByteRange => {
                let range: SectorByteRange = header.read(offset, "lump entry")?;
                LumpEntry {
                    offset: range.offset.bytes(),
                    size: Some(u64::from(range.size_bytes)),
                }
            }
            Self::SectorOnly => {
                let sector: Sector32 = header.read(offset, "lump entry")?;
                LumpEntry {
                    offset: sector.bytes(),
                    size: None,
                }
            }
        };
        Ok(entry)
    }

    /// Record a lump of `size` bytes placed at the sector aligned `position`
    pub fn write(self, header: &mut OutBuffer, offset: usize, position: u64, size: u64) -> Result<()> {
        let sector = Sector32::from_aligned_offset(position)?;
        match self {
            Self::SectorRange => {
                let range = SectorRange {
                    offset: sector,
                    size: Sector32::size_from_bytes(size)?,
                };
                header.write_at(offset, &range)?;
            }
            Self::SectorByteRange => {
                let size_bytes = u32::try_from(size).map_err(|_| {
                    Error::invalid_format(format!("Lump of 0x{size:x} bytes is too large"))
                })?;
                header.write_at(offset, &SectorByteRange { offset: sector, size_bytes })?;
            }
            Self::SectorOnly => header.write_at(offset, &sector)?,
        }
        Ok(())
    }
}

/// Read and write halves of a lump, bound to one field of one archive kind
#[derive(Clone, Copy)]
pub struct LumpHandler {
    pub codec: LumpCodec,
    /// Store a decoded value into slot `index` of the bound field
    pub insert: fn(&mut WadContents, usize, LumpValue) -> Result<()>,
    /// Borrow slot `index` of the bound field, if present
    pub get: for<'a> fn(&'a WadContents, usize) -> Result<Option<LumpRef<'a>>>,
}

impl std::fmt::Debug for LumpHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LumpHandler").field("codec", &self.codec).finish_non_exhaustive()
    }
}

/// One named, possibly repeated lump of an archive kind
#[derive(Debug, Clone, Copy)]
pub struct LumpDescriptor {
    /// Header offset of the first entry
    pub offset: usize,
    /// Number of repeated entries
    pub count: usize,
    /// Distance between consecutive entries in the header
    pub stride: usize,
    pub entry: EntryFormat,
    pub handler: LumpHandler,
    pub name: &'static str,
}

impl LumpDescriptor {
    /// Header offset of entry `index`
    pub fn entry_offset(&self, index: usize) -> usize {
        self.offset + index * self.stride
    }
}

/// Static description of one archive kind
#[derive(Debug)]
pub struct ArchiveDescriptor {
    pub kind: ArchiveKind,
    /// Size of the header, which is the only thing that identifies the kind
    pub header_size: usize,
    pub create: fn() -> WadContents,
    pub lumps: &'static [LumpDescriptor],
}

impl ArchiveDescriptor {
    /// Find the unique descriptor whose header has `header_size` bytes
    pub fn for_header_size(header_size: usize) -> Result<&'static Self> {
        let mut matches = ARCHIVE_DESCRIPTORS
            .iter()
            .filter(|descriptor| descriptor.header_size == header_size);
        let Some(first) = matches.next() else {
            return Err(Error::UnknownArchive { header_size });
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(Error::AmbiguousArchive {
                header_size,
                count: extra + 1,
            });
        }
        log::debug!("Identified {} archive (header size 0x{header_size:x})", first.kind);
        Ok(first)
    }

    pub fn for_kind(kind: ArchiveKind) -> &'static Self {
        match kind {
            ArchiveKind::Level => &ARCHIVE_DESCRIPTORS[0],
            ArchiveKind::Rac1Level => &ARCHIVE_DESCRIPTORS[1],
            ArchiveKind::Rac1Audio => &ARCHIVE_DESCRIPTORS[2],
            ArchiveKind::RacMpeg => &ARCHIVE_DESCRIPTORS[3],
            ArchiveKind::GcMpeg => &ARCHIVE_DESCRIPTORS[4],
            ArchiveKind::UyaDlMpeg => &ARCHIVE_DESCRIPTORS[5],
        }
    }

    pub fn lump(&self, name: &str) -> Option<&'static LumpDescriptor> {
        self.lumps.iter().find(|lump| lump.name == name)
    }
}

fn mismatch(lump: &'static str, contents: &WadContents) -> Error {
    Error::LumpMismatch {
        lump,
        kind: contents.kind().name(),
    }
}

/// Bind a lump to `WadContents::$variant(..).$field`
macro_rules! lump {
    ($offset:expr, $count:expr, $stride:expr, $entry:ident, $codec:ident, $variant:ident . $field:ident, $name:literal) => {
        LumpDescriptor {
            offset: $offset,
            count: $count,
            stride: $stride,
            entry: EntryFormat::$entry,
            handler: LumpHandler {
                codec: LumpCodec::$codec,
                insert: |contents, index, value| match contents {
                    WadContents::$variant(wad) => wad.$field.set(index, value.try_into()?),
                    other => Err(mismatch($name, other)),
                },
                get: |contents, index| match contents {
                    WadContents::$variant(wad) => Ok(wad.$field.get(index).map(LumpRef::from)),
                    other => Err(mismatch($name, other)),
                },
            },
            name: $name,
        }
    };
}

static LEVEL_LUMPS: [LumpDescriptor; 9] = [
    lump!(0x018, 1, 8, SectorRange, Binary, Level.data, "data"),
    lump!(0x020, 1, 8, SectorRange, Binary, Level.core_bank, "core_bank"),
    lump!(0x028, 3, 8, SectorRange, Binary, Level.chunks, "chunk"),
    lump!(0x040, 3, 8, SectorRange, Binary, Level.chunk_banks, "chunkbank"),
    lump!(0x058, 1, 8, SectorRange, CompressedGameplay, Level.gameplay_core, "gameplay_core"),
    lump!(0x060, 128, 8, SectorRange, Gameplay, Level.gameplay_mission_instances, "gameplay_mission_instances"),
    lump!(0x460, 128, 8, SectorRange, Binary, Level.gameplay_mission_data, "gameplay_mission_data"),
    lump!(0x860, 128, 8, SectorRange, Binary, Level.mission_banks, "mission_banks"),
    lump!(0xc60, 1, 8, SectorRange, CompressedGameplay, Level.art_instances, "art_instances"),
];

static RAC1_LEVEL_LUMPS: [LumpDescriptor; 4] = [
    lump!(0x10, 1, 8, SectorRange, Binary, Rac1Level.primary, "primary"),
    lump!(0x18, 1, 8, SectorRange, Binary, Rac1Level.gameplay_ntsc, "gameplay_ntsc"),
    lump!(0x20, 1, 8, SectorRange, Binary, Rac1Level.gameplay_pal, "gameplay_pal"),
    lump!(0x28, 1, 8, SectorRange, Binary, Rac1Level.occlusion, "occlusion"),
];

static RAC1_AUDIO_LUMPS: [LumpDescriptor; 2] = [
    lump!(0x008, 36, 8, SectorByteRange, Binary, Rac1Audio.bindata, "bindata"),
    lump!(0x128, 15, 4, SectorOnly, Binary, Rac1Audio.music, "music"),
];

static RAC_MPEG_LUMPS: [LumpDescriptor; 1] =
    [lump!(0x8, 88, 8, SectorByteRange, Binary, RacMpeg.mpegs, "mpegs")];

static GC_MPEG_LUMPS: [LumpDescriptor; 2] = [
    lump!(0x08, 50, 0x10, SectorByteRange, Binary, GcMpeg.subtitles, "subtitles"),
    lump!(0x10, 50, 0x10, SectorByteRange, Binary, GcMpeg.videos, "videos"),
];

static UYA_DL_MPEG_LUMPS: [LumpDescriptor; 2] = [
    lump!(0x08, 100, 0x10, SectorByteRange, Binary, UyaDlMpeg.subtitles, "subtitles"),
    lump!(0x10, 100, 0x10, SectorByteRange, Binary, UyaDlMpeg.videos, "videos"),
];

/// Every known archive kind, in [`ArchiveKind`] order
pub static ARCHIVE_DESCRIPTORS: [ArchiveDescriptor; 6] = [
    ArchiveDescriptor {
        kind: ArchiveKind::Level,
        header_size: 0xc68,
        create: || WadContents::Level(LevelWad::default()),
        lumps: &LEVEL_LUMPS,
    },
    ArchiveDescriptor {
        kind: ArchiveKind::Rac1Level,
        header_size: 0x30,
        create: || WadContents::Rac1Level(Rac1LevelWad::default()),
        lumps: &RAC1_LEVEL_LUMPS,
    },
    ArchiveDescriptor {
        kind: ArchiveKind::Rac1Audio,
        header_size: 0x164,
        create: || WadContents::Rac1Audio(Rac1AudioWad::default()),
        lumps: &RAC1_AUDIO_LUMPS,
    },
    ArchiveDescriptor {
        kind: ArchiveKind::RacMpeg,
        header_size: 0x2c8,
        create: || WadContents::RacMpeg(RacMpegWad::default()),
        lumps: &RAC_MPEG_LUMPS,
    },
    ArchiveDescriptor {
        kind: ArchiveKind::GcMpeg,
        header_size: 0x328,
        create: || WadContents::GcMpeg(MpegWad::new(50)),
        lumps: &GC_MPEG_LUMPS,
    },
    ArchiveDescriptor {
        kind: ArchiveKind::UyaDlMpeg,
        header_size: 0x648,
        create: || WadContents::UyaDlMpeg(MpegWad::new(100)),
        lumps: &UYA_DL_MPEG_LUMPS,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0xc68, ArchiveKind::Level)]
    #[test_case(0x30, ArchiveKind::Rac1Level)]
    #[test_case(0x164, ArchiveKind::Rac1Audio)]
    #[test_case(0x2c8, ArchiveKind::RacMpeg)]
    #[test_case(0x328, ArchiveKind::GcMpeg)]
    #[test_case(0x648, ArchiveKind::UyaDlMpeg)]
    fn test_dispatch_by_header_size(header_size: usize, kind: ArchiveKind) {
        let descriptor = ArchiveDescriptor::for_header_size(header_size).unwrap();
        assert_eq!(descriptor.kind, kind);
        assert!(std::ptr::eq(descriptor, ArchiveDescriptor::for_kind(kind)));
        assert_eq!((descriptor.create)().kind(), kind);
    }

    #[test]
    fn test_unknown_header_size() {
        let err = ArchiveDescriptor::for_header_size(0x1234).unwrap_err();
        assert!(matches!(err, Error::UnknownArchive { header_size: 0x1234 }));
    }

    #[test]
    fn test_header_sizes_are_unique() {
        for descriptor in &ARCHIVE_DESCRIPTORS {
            let same = ARCHIVE_DESCRIPTORS
                .iter()
                .filter(|other| other.header_size == descriptor.header_size)
                .count();
            assert_eq!(same, 1, "{} shares its header size", descriptor.kind);
        }
    }

    #[test]
    fn test_lump_entries_fit_in_header() {
        for descriptor in &ARCHIVE_DESCRIPTORS {
            let contents = (descriptor.create)();
            for lump in descriptor.lumps {
                let last = lump.entry_offset(lump.count - 1) + lump.entry.entry_size();
                assert!(last <= descriptor.header_size, "{} overruns the header", lump.name);
                // Every lump must be bound to a field of its own archive kind.
                assert!((lump.handler.get)(&contents, 0).unwrap().is_none());
            }
        }
    }

    #[test]
    fn test_handler_rejects_other_kind() {
        let level = ArchiveDescriptor::for_kind(ArchiveKind::Level);
        let mut contents = WadContents::RacMpeg(RacMpegWad::default());
        let data = level.lump("data").unwrap();
        let err = (data.handler.insert)(&mut contents, 0, LumpValue::Binary(vec![1])).unwrap_err();
        assert!(matches!(err, Error::LumpMismatch { lump: "data", .. }));
    }

    #[test]
    fn test_entry_formats() {
        let mut header = OutBuffer::from_vec(vec![0; 0x10]);
        EntryFormat::SectorRange.write(&mut header, 0, 0x1000, 0x801).unwrap();
        EntryFormat::SectorOnly.write(&mut header, 8, 0x3000, 0x10).unwrap();
        let buffer = Buffer::new(header.as_slice());
        assert_eq!(
            EntryFormat::SectorRange.read(&buffer, 0).unwrap(),
            LumpEntry { offset: 0x1000, size: Some(0x1000) }
        );
        assert_eq!(
            EntryFormat::SectorOnly.read(&buffer, 8).unwrap(),
            LumpEntry { offset: 0x3000, size: None }
        );
        assert!(EntryFormat::SectorByteRange.write(&mut header, 0, 0x1001, 4).is_err());
    }
}
