//! Archive read/write tests

use std::io::Cursor;

use pretty_assertions::assert_eq;
use rac_data::SECTOR_SIZE;
use rac_wad::archive::{MISSION_COUNT, MpegWad};
use rac_wad::{Archive, ArchiveKind, Error, Gameplay, GameplayBlock, WadContents};

fn gameplay(seed: u8) -> Gameplay {
    Gameplay {
        preamble: vec![seed; 4],
        blocks: vec![
            GameplayBlock {
                slot: 0,
                data: vec![seed.wrapping_add(1); 0x40],
            },
            GameplayBlock {
                slot: 7,
                data: (0..0x300).map(|i| (i % 7) as u8 ^ seed).collect(),
            },
        ],
    }
}

/// Uncompressed gameplay lumps are read back with their sector padding, so
/// this one fills exactly one sector.
fn mission_gameplay() -> Gameplay {
    Gameplay {
        preamble: Vec::new(),
        blocks: vec![
            GameplayBlock {
                slot: 2,
                data: vec![0x55; 0x100],
            },
            GameplayBlock {
                slot: 1,
                data: vec![0x66; 0x800 - 0x80 - 0x100],
            },
        ],
    }
}

fn sample_level() -> Archive {
    let mut archive = Archive::new(ArchiveKind::Level);
    let WadContents::Level(level) = archive.contents_mut() else {
        panic!("new level archive has the wrong contents");
    };
    level.data.set(0, vec![0x11; 0x1000]).unwrap();
    level.core_bank.set(0, vec![0x22; 0x800]).unwrap();
    level.chunks.set(1, vec![0x33; 0x1800]).unwrap();
    level.gameplay_core.set(0, gameplay(1)).unwrap();
    level.gameplay_mission_instances.set(5, mission_gameplay()).unwrap();
    level.gameplay_mission_data.set(MISSION_COUNT - 1, vec![0x44; 0x800]).unwrap();
    level.art_instances.set(0, gameplay(3)).unwrap();
    archive
}

#[test]
fn test_level_round_trip() {
    let archive = sample_level();
    let mut file = Cursor::new(Vec::new());
    archive.write(&mut file).unwrap();

    let reread = Archive::read(&mut file).unwrap();
    assert_eq!(reread.kind(), ArchiveKind::Level);
    assert_eq!(reread.contents(), archive.contents());

    // Rewriting a freshly read archive reproduces the file.
    let mut again = Cursor::new(Vec::new());
    reread.write(&mut again).unwrap();
    assert_eq!(again.into_inner(), file.into_inner());
}

#[test]
fn test_lumps_are_sector_aligned() {
    let archive = sample_level();
    let mut file = Cursor::new(Vec::new());
    let placed = archive.write(&mut file).unwrap();
    assert_eq!(placed.len(), 7);
    for lump in &placed {
        assert_eq!(lump.offset % SECTOR_SIZE, 0, "{}[{}] is misaligned", lump.name, lump.index);
    }
    let file_size = file.get_ref().len() as u64;
    assert_eq!(file_size % SECTOR_SIZE, 0);

    let reread = Archive::read(&mut file).unwrap();
    for lump in reread.entries(file_size).unwrap() {
        assert_eq!(lump.offset % SECTOR_SIZE, 0);
    }
}

#[test]
fn test_header_fields_are_preserved() {
    let archive = Archive::new(ArchiveKind::Rac1Level);
    let mut file = Cursor::new(Vec::new());
    archive.write(&mut file).unwrap();

    // Set the level number, which is not a lump entry.
    let mut bytes = file.into_inner();
    bytes[8..12].copy_from_slice(&4i32.to_le_bytes());
    let reread = Archive::read(&mut Cursor::new(bytes.clone())).unwrap();

    let mut rewritten = Cursor::new(Vec::new());
    reread.write(&mut rewritten).unwrap();
    assert_eq!(&rewritten.get_ref()[8..12], &4i32.to_le_bytes());
    assert_eq!(rewritten.into_inner(), bytes);
}

#[test]
fn test_mpeg_archive_round_trip() {
    let mut archive = Archive::new(ArchiveKind::GcMpeg);
    let WadContents::GcMpeg(MpegWad { subtitles, videos }) = archive.contents_mut() else {
        panic!("new mpeg archive has the wrong contents");
    };
    subtitles.set(0, b"subtitle track".to_vec()).unwrap();
    videos.set(0, vec![0xab; 0x1234]).unwrap();
    videos.set(49, vec![0xcd; 0x10]).unwrap();

    let mut file = Cursor::new(Vec::new());
    archive.write(&mut file).unwrap();
    let reread = Archive::read(&mut file).unwrap();
    assert_eq!(reread.contents(), archive.contents());
}

#[test]
fn test_unknown_header_size_is_rejected() {
    let mut data = 0x40i32.to_le_bytes().to_vec();
    data.resize(0x1000, 0);
    let err = Archive::read(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err, Error::UnknownArchive { header_size: 0x40 }));
    assert!(err.is_corruption());
}

#[test]
fn test_truncated_header_is_rejected() {
    let mut data = 0xc68i32.to_le_bytes().to_vec();
    data.resize(0x100, 0);
    assert!(Archive::read(&mut Cursor::new(data)).is_err());
}
