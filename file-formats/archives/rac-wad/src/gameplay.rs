//! Gameplay block tables
//!
//! Gameplay lumps (core gameplay, per-mission instances and art instances)
//! start with a header of 32 block pointers. Each present block runs from its
//! pointer up to the next pointer in file order, or to the end of the data.
//! Blocks are kept as opaque byte strings.

use rac_data::{Buffer, OutBuffer};

use crate::{Error, Result};

/// Size of the pointer table at the start of a gameplay lump
pub const GAMEPLAY_HEADER_SIZE: usize = 0x80;

/// Number of block pointers in the header
pub const GAMEPLAY_BLOCK_COUNT: usize = GAMEPLAY_HEADER_SIZE / 4;

/// One block of a gameplay lump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameplayBlock {
    /// Index of the header pointer that refers to this block
    pub slot: usize,
    pub data: Vec<u8>,
}

/// A gameplay lump split into its blocks, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gameplay {
    /// Bytes between the header and the first block
    pub preamble: Vec<u8>,
    pub blocks: Vec<GameplayBlock>,
}

impl Gameplay {
    pub fn read(src: &[u8]) -> Result<Self> {
        let buffer = Buffer::new(src);
        let pointers: Vec<i32> = buffer.read_multiple(0, GAMEPLAY_BLOCK_COUNT, "gameplay header")?;

        let mut starts = Vec::new();
        for (slot, pointer) in pointers.into_iter().enumerate() {
            if pointer == 0 {
                continue;
            }
            let offset = usize::try_from(pointer).unwrap_or(0);
            if offset < GAMEPLAY_HEADER_SIZE || offset > src.len() {
                return Err(Error::invalid_format(format!(
                    "Gameplay block {slot} has pointer 0x{pointer:x} outside the data (size 0x{:x})",
                    src.len()
                )));
            }
            starts.push((offset, slot));
        }
        starts.sort_unstable();

        let first = starts.first().map_or(src.len(), |(offset, _)| *offset);
        let preamble = src[GAMEPLAY_HEADER_SIZE..first].to_vec();

        let blocks = starts
            .iter()
            .enumerate()
            .map(|(i, &(offset, slot))| {
                let end = starts.get(i + 1).map_or(src.len(), |(next, _)| *next);
                GameplayBlock {
                    slot,
                    data: src[offset..end].to_vec(),
                }
            })
            .collect::<Vec<_>>();

        log::trace!(
            "Read gameplay table: {} block(s), 0x{:x} preamble byte(s)",
            blocks.len(),
            preamble.len()
        );
        Ok(Self { preamble, blocks })
    }

    pub fn write(&self) -> Result<Vec<u8>> {
        let mut dest = OutBuffer::new();
        let header = dest.alloc(GAMEPLAY_HEADER_SIZE);
        dest.write_bytes(&self.preamble);

        let mut used = [false; GAMEPLAY_BLOCK_COUNT];
        for block in &self.blocks {
            let seen = used.get_mut(block.slot).ok_or_else(|| {
                Error::invalid_format(format!("Gameplay block slot {} out of range", block.slot))
            })?;
            if std::mem::replace(seen, true) {
                return Err(Error::invalid_format(format!(
                    "Gameplay block slot {} is used twice",
                    block.slot
                )));
            }

            let offset = dest.write_bytes(&block.data);
            let pointer = i32::try_from(offset).map_err(|_| {
                Error::invalid_format(format!("Gameplay block {} is too far into the lump", block.slot))
            })?;
            dest.write_i32_at(header + block.slot * 4, pointer);
        }
        Ok(dest.into_inner())
    }

    /// Contents of the block referenced by header slot `slot`
    pub fn block(&self, slot: usize) -> Option<&[u8]> {
        self.blocks
            .iter()
            .find(|block| block.slot == slot)
            .map(|block| block.data.as_slice())
    }
}
