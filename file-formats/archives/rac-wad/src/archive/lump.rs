//! Typed lump storage and the codecs that convert lumps to and from bytes

use crate::compression::{compress_wad, decompress_wad};
use crate::gameplay::Gameplay;
use crate::{Error, Result};

/// Number of workers used when a lump is compressed for writing
pub const LUMP_COMPRESSION_THREADS: usize = 8;

/// One slot per repeat index of a lump, `None` where the header entry is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumpTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> LumpTable<T> {
    pub fn new(count: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(count).collect(),
        }
    }

    /// Number of slots, present or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        let count = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            Error::invalid_format(format!("Lump index {index} out of range (table has {count} slots)"))
        })?;
        *slot = Some(value);
        Ok(())
    }

    pub fn take(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Present values with their slot indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// How a lump's bytes map to its typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumpCodec {
    /// Raw bytes kept as they are on disk
    Binary,
    /// Uncompressed gameplay block table
    Gameplay,
    /// Gameplay block table stored inside a compressed block
    CompressedGameplay,
}

impl LumpCodec {
    pub fn decode(self, src: Vec<u8>) -> Result<LumpValue> {
        match self {
            Self::Binary => Ok(LumpValue::Binary(src)),
            Self::Gameplay => Gameplay::read(&src).map(LumpValue::Gameplay),
            Self::CompressedGameplay => {
                let decompressed = decompress_wad(&src)?;
                Gameplay::read(&decompressed).map(LumpValue::Gameplay)
            }
        }
    }

    pub fn encode(self, value: LumpRef<'_>) -> Result<Vec<u8>> {
        match (self, value) {
            (Self::Binary, LumpRef::Binary(data)) => Ok(data.to_vec()),
            (Self::Gameplay, LumpRef::Gameplay(gameplay)) => gameplay.write(),
            (Self::CompressedGameplay, LumpRef::Gameplay(gameplay)) => {
                compress_wad(&gameplay.write()?, LUMP_COMPRESSION_THREADS)
            }
            (codec, value) => Err(Error::invalid_format(format!(
                "{codec:?} lump cannot hold a {} value",
                value.type_name()
            ))),
        }
    }
}

/// An owned, decoded lump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LumpValue {
    Binary(Vec<u8>),
    Gameplay(Gameplay),
}

/// A borrowed, decoded lump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumpRef<'a> {
    Binary(&'a [u8]),
    Gameplay(&'a Gameplay),
}

impl LumpRef<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Binary(_) => "binary",
            Self::Gameplay(_) => "gameplay",
        }
    }
}

impl<'a> From<&'a Vec<u8>> for LumpRef<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

impl<'a> From<&'a Gameplay> for LumpRef<'a> {
    fn from(gameplay: &'a Gameplay) -> Self {
        Self::Gameplay(gameplay)
    }
}

impl TryFrom<LumpValue> for Vec<u8> {
    type Error = Error;

    fn try_from(value: LumpValue) -> Result<Self> {
        match value {
            LumpValue::Binary(data) => Ok(data),
            LumpValue::Gameplay(_) => Err(Error::invalid_format("Expected a binary lump")),
        }
    }
}

impl TryFrom<LumpValue> for Gameplay {
    type Error = Error;

    fn try_from(value: LumpValue) -> Result<Self> {
        match value {
            LumpValue::Gameplay(gameplay) => Ok(gameplay),
            LumpValue::Binary(_) => Err(Error::invalid_format("Expected a gameplay lump")),
        }
    }
}
