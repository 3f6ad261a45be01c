use binrw::{BinRead, BinWrite};

/// Sound definition - 0x20 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobySoundDef {
    pub min_range: f32,
    pub max_range: f32,
    pub min_volume: i32,
    pub max_volume: i32,
    pub min_pitch: i32,
    pub max_pitch: i32,
    pub is_loop: u8,
    pub flags: u8,
    pub index: i16,
    pub bank_index: i32,
}
