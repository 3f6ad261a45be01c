//! The archive kinds and the typed lump fields each one carries

use std::fmt;

use super::lump::LumpTable;
use crate::gameplay::Gameplay;

/// Number of mission slots in a level archive
pub const MISSION_COUNT: usize = 128;

/// Known archive kinds, each identified by its header size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Level archive of the later games
    Level,
    /// Level archive of the first game
    Rac1Level,
    /// Audio archive of the first game
    Rac1Audio,
    /// Video archive of the first game
    RacMpeg,
    /// Video archive of the second game
    GcMpeg,
    /// Video archive of the third and fourth games
    UyaDlMpeg,
}

impl ArchiveKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::Rac1Level => "rac1 level",
            Self::Rac1Audio => "rac1 audio",
            Self::RacMpeg => "rac mpeg",
            Self::GcMpeg => "gc mpeg",
            Self::UyaDlMpeg => "uya/dl mpeg",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelWad {
    pub data: LumpTable<Vec<u8>>,
    pub core_bank: LumpTable<Vec<u8>>,
    pub chunks: LumpTable<Vec<u8>>,
    pub chunk_banks: LumpTable<Vec<u8>>,
    pub gameplay_core: LumpTable<Gameplay>,
    pub gameplay_mission_instances: LumpTable<Gameplay>,
    pub gameplay_mission_data: LumpTable<Vec<u8>>,
    pub mission_banks: LumpTable<Vec<u8>>,
    pub art_instances: LumpTable<Gameplay>,
}

impl Default for LevelWad {
    fn default() -> Self {
        Self {
            data: LumpTable::new(1),
            core_bank: LumpTable::new(1),
            chunks: LumpTable::new(3),
            chunk_banks: LumpTable::new(3),
            gameplay_core: LumpTable::new(1),
            gameplay_mission_instances: LumpTable::new(MISSION_COUNT),
            gameplay_mission_data: LumpTable::new(MISSION_COUNT),
            mission_banks: LumpTable::new(MISSION_COUNT),
            art_instances: LumpTable::new(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rac1LevelWad {
    pub primary: LumpTable<Vec<u8>>,
    pub gameplay_ntsc: LumpTable<Vec<u8>>,
    pub gameplay_pal: LumpTable<Vec<u8>>,
    pub occlusion: LumpTable<Vec<u8>>,
}

impl Default for Rac1LevelWad {
    fn default() -> Self {
        Self {
            primary: LumpTable::new(1),
            gameplay_ntsc: LumpTable::new(1),
            gameplay_pal: LumpTable::new(1),
            occlusion: LumpTable::new(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rac1AudioWad {
    pub bindata: LumpTable<Vec<u8>>,
    /// Music tracks, whose header entries only record a start sector
    pub music: LumpTable<Vec<u8>>,
}

impl Default for Rac1AudioWad {
    fn default() -> Self {
        Self {
            bindata: LumpTable::new(36),
            music: LumpTable::new(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacMpegWad {
    pub mpegs: LumpTable<Vec<u8>>,
}

impl Default for RacMpegWad {
    fn default() -> Self {
        Self {
            mpegs: LumpTable::new(88),
        }
    }
}

/// Video archive with a subtitle lump beside each video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpegWad {
    pub subtitles: LumpTable<Vec<u8>>,
    pub videos: LumpTable<Vec<u8>>,
}

impl MpegWad {
    pub fn new(count: usize) -> Self {
        Self {
            subtitles: LumpTable::new(count),
            videos: LumpTable::new(count),
        }
    }
}

/// Typed lumps of an archive, one variant per archive kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WadContents {
    Level(LevelWad),
    Rac1Level(Rac1LevelWad),
    Rac1Audio(Rac1AudioWad),
    RacMpeg(RacMpegWad),
    GcMpeg(MpegWad),
    UyaDlMpeg(MpegWad),
}

impl WadContents {
    pub fn kind(&self) -> ArchiveKind {
        match self {
            Self::Level(_) => ArchiveKind::Level,
            Self::Rac1Level(_) => ArchiveKind::Rac1Level,
            Self::Rac1Audio(_) => ArchiveKind::Rac1Audio,
            Self::RacMpeg(_) => ArchiveKind::RacMpeg,
            Self::GcMpeg(_) => ArchiveKind::GcMpeg,
            Self::UyaDlMpeg(_) => ArchiveKind::UyaDlMpeg,
        }
    }
}
