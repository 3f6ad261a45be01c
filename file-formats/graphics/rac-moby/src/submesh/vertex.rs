//! Vertex tables and the lookback index encoding
//!
//! Each vertex carries a 9-bit index into the VU's intermediate vertex
//! buffer, but the index stored in vertex `i` belongs to vertex `i - 7`. The
//! indices of the last seven vertices spill into padding vertices appended to
//! the table and then into the spare words of the final padding vertex:
//!
//! ```text
//! stored:  [0 x min(7, n)] [idx 0 .. n-7]   (one per real vertex)
//! spilled: [0 x max(7 - n, 0)] [idx n-min(7, n) .. n]
//! ```
//!
//! The spilled sequence is laid out over the padding vertices (in their
//! index field) and the last vertex (index field, then words 0x2 to 0xe).

use binrw::{BinRead, BinWrite};

use crate::error::{MobyError, Result};
use crate::format::MobyFormat;
use crate::header::{MobyVertexTableHeaderRac1, MobyVertexTableHeaderRac23Dl};

/// Distance between a vertex and the vertex whose index it stores
pub const LOOKBACK: usize = 7;

/// Mask of the intermediate buffer index in a vertex's low word
pub const VERTEX_INDEX_MASK: u16 = 0x1ff;

/// Number of spilled indices the last padding vertex can hold
pub const TRAILING_INDEX_SLOTS: usize = 6;

/// Packed vertex - 0x10 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyVertex {
    /// Intermediate buffer index in the low 9 bits, unknown flags above
    pub low_word: u16,
    pub unknown_2: [u8; 8],
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl MobyVertex {
    pub fn index(&self) -> u16 {
        self.low_word & VERTEX_INDEX_MASK
    }

    pub fn with_index(self, index: u16) -> Self {
        Self {
            low_word: (self.low_word & !VERTEX_INDEX_MASK) | (index & VERTEX_INDEX_MASK),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyTexCoord {
    pub s: i16,
    pub t: i16,
}

/// Index fields as they are stored, and the indices that spill past the end
pub(crate) struct LookbackIndices {
    /// Index field of each real vertex
    pub stored: Vec<u16>,
    /// The last seven indices, front padded with zeros
    pub spilled: [u16; LOOKBACK],
}

/// Shift every index seven vertices later
pub(crate) fn encode_lookback(indices: &[u16]) -> LookbackIndices {
    let n = indices.len();
    let stored = (0..n)
        .map(|i| if i >= LOOKBACK { indices[i - LOOKBACK] & VERTEX_INDEX_MASK } else { 0 })
        .collect();
    let mut spilled = [0; LOOKBACK];
    let tail = n.min(LOOKBACK);
    for (slot, index) in spilled[LOOKBACK - tail..].iter_mut().zip(&indices[n - tail..]) {
        *slot = index & VERTEX_INDEX_MASK;
    }
    LookbackIndices { stored, spilled }
}

/// Recover the indices of `n` vertices
///
/// `table` holds the low words of every vertex in the table, real and
/// padding, and `trailing` the spare words of the last one.
pub(crate) fn decode_lookback(
    table: &[u16],
    trailing: &[u16; TRAILING_INDEX_SLOTS],
    n: usize,
) -> Result<Vec<u16>> {
    let padding = table.len().saturating_sub(n);
    if table.len() < n || !(1..LOOKBACK).contains(&padding) {
        return Err(MobyError::format(format!(
            "Bad moby vertex table: {padding} trailing vertices after {n} vertices"
        )));
    }
    let sequence: Vec<u16> = table.iter().chain(trailing).copied().collect();
    Ok((0..n)
        .map(|j| sequence[j + LOOKBACK] & VERTEX_INDEX_MASK)
        .collect())
}

/// Vertex table header with the widest field types of every format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct VertexTableHeader {
    pub unknown_count_0: u32,
    pub vertex_count_2: u32,
    pub vertex_count_4: u32,
    pub main_vertex_count: u32,
    pub duplicate_vertex_count: u32,
    pub transfer_vertex_count: u32,
    pub vertex_table_offset: u32,
    pub unknown_e: u32,
}

impl VertexTableHeader {
    pub fn read(src: &rac_data::Buffer<'_>, offset: usize, format: MobyFormat) -> Result<Self> {
        Ok(match format {
            MobyFormat::Rac1 => {
                let h: MobyVertexTableHeaderRac1 = src.read(offset, "moby vertex header")?;
                Self {
                    unknown_count_0: h.unknown_count_0,
                    vertex_count_2: h.vertex_count_2,
                    vertex_count_4: h.vertex_count_4,
                    main_vertex_count: h.main_vertex_count,
                    duplicate_vertex_count: h.duplicate_vertex_count,
                    transfer_vertex_count: h.transfer_vertex_count,
                    vertex_table_offset: h.vertex_table_offset,
                    unknown_e: h.unknown_e,
                }
            }
            MobyFormat::Rac2 | MobyFormat::Rac3Dl => {
                let h: MobyVertexTableHeaderRac23Dl = src.read(offset, "moby vertex header")?;
                Self {
                    unknown_count_0: u32::from(h.unknown_count_0),
                    vertex_count_2: u32::from(h.vertex_count_2),
                    vertex_count_4: u32::from(h.vertex_count_4),
                    main_vertex_count: u32::from(h.main_vertex_count),
                    duplicate_vertex_count: u32::from(h.duplicate_vertex_count),
                    transfer_vertex_count: u32::from(h.transfer_vertex_count),
                    vertex_table_offset: u32::from(h.vertex_table_offset),
                    unknown_e: u32::from(h.unknown_e),
                }
            }
        })
    }

    pub fn write_at(&self, dest: &mut rac_data::OutBuffer, offset: usize, format: MobyFormat) -> Result<()> {
        match format {
            MobyFormat::Rac1 => dest.write_at(
                offset,
                &MobyVertexTableHeaderRac1 {
                    unknown_count_0: self.unknown_count_0,
                    vertex_count_2: self.vertex_count_2,
                    vertex_count_4: self.vertex_count_4,
                    main_vertex_count: self.main_vertex_count,
                    duplicate_vertex_count: self.duplicate_vertex_count,
                    transfer_vertex_count: self.transfer_vertex_count,
                    vertex_table_offset: self.vertex_table_offset,
                    unknown_e: self.unknown_e,
                },
            )?,
            MobyFormat::Rac2 | MobyFormat::Rac3Dl => {
                let field = |value: u32, name: &str| {
                    u16::try_from(value).map_err(|_| {
                        MobyError::constraint(format!("Vertex table {name} ({value}) does not fit in 16 bits"))
                    })
                };
                dest.write_at(
                    offset,
                    &MobyVertexTableHeaderRac23Dl {
                        unknown_count_0: field(self.unknown_count_0, "unknown count")?,
                        vertex_count_2: field(self.vertex_count_2, "vertex count 2")?,
                        vertex_count_4: field(self.vertex_count_4, "vertex count 4")?,
                        main_vertex_count: field(self.main_vertex_count, "main vertex count")?,
                        duplicate_vertex_count: field(self.duplicate_vertex_count, "duplicate vertex count")?,
                        transfer_vertex_count: field(self.transfer_vertex_count, "transfer vertex count")?,
                        vertex_table_offset: field(self.vertex_table_offset, "offset")?,
                        unknown_e: field(self.unknown_e, "unknown_e")?,
                    },
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Lay out the spilled indices the way the submesh writer does
    fn table_words(indices: &[u16]) -> (Vec<u16>, [u16; TRAILING_INDEX_SLOTS]) {
        let encoded = encode_lookback(indices);
        let mut table = encoded.stored.clone();
        let mut pads = 0;
        while (indices.len() + pads) % 4 != 2 && pads < LOOKBACK {
            table.push(encoded.spilled[pads]);
            pads += 1;
        }
        table.push(encoded.spilled[pads]);
        let mut trailing = [0; TRAILING_INDEX_SLOTS];
        for (slot, index) in trailing.iter_mut().zip(&encoded.spilled[pads + 1..]) {
            *slot = *index;
        }
        (table, trailing)
    }

    #[test]
    fn test_stored_index_belongs_seven_back() {
        let indices: Vec<u16> = (10..20).collect();
        let encoded = encode_lookback(&indices);
        assert_eq!(encoded.stored, vec![0, 0, 0, 0, 0, 0, 0, 10, 11, 12]);
        assert_eq!(encoded.spilled, [13, 14, 15, 16, 17, 18, 19]);
    }

    #[test]
    fn test_short_tables_are_front_padded() {
        let encoded = encode_lookback(&[5, 6]);
        assert_eq!(encoded.stored, vec![0, 0]);
        assert_eq!(encoded.spilled, [0, 0, 0, 0, 0, 5, 6]);
        let (table, trailing) = table_words(&[5, 6]);
        assert_eq!(table, vec![0, 0, 0]);
        assert_eq!(trailing, [0, 0, 0, 0, 5, 6]);
    }

    #[test]
    fn test_bad_trailing_count() {
        let trailing = [0; TRAILING_INDEX_SLOTS];
        assert!(decode_lookback(&[1, 2, 3], &trailing, 3).is_err());
        assert!(decode_lookback(&[0; 10], &trailing, 3).is_err());
        assert!(decode_lookback(&[0; 4], &trailing, 3).is_ok());
    }

    #[test]
    fn test_vertex_index_bits() {
        let vertex = MobyVertex { low_word: 0xfe00 | 0x1ab, ..Default::default() };
        assert_eq!(vertex.index(), 0x1ab);
        assert_eq!(vertex.with_index(0x3ff).low_word, 0xffff);
        assert_eq!(vertex.with_index(0).low_word, 0xfe00);
    }

    proptest! {
        #[test]
        fn prop_lookback_round_trip(indices in prop::collection::vec(0u16..0x200, 0..64)) {
            let (table, trailing) = table_words(&indices);
            let decoded = decode_lookback(&table, &trailing, indices.len()).unwrap();
            prop_assert_eq!(decoded, indices);
        }
    }
}
