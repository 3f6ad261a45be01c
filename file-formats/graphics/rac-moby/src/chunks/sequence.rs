//! Animation sequences
//!
//! Each sequence has a 0x1c byte header followed by a table of frame pointers
//! and a list of trigger words. Frames live elsewhere in the class, each a
//! 0x10 byte header followed by `count` quadwords of data.

use binrw::{BinRead, BinWrite};
use glam::Vec4;
use rac_data::Buffer;

use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};
use crate::format::MobyFormat;
use crate::header::{MobyFrameHeader, MobySequenceHeader};

/// Size of a sequence header; the frame pointer table follows it
pub const SEQUENCE_HEADER_SIZE: usize = 0x1c;

/// Bits of a frame pointer that hold the offset. Some R&C2 classes set flags
/// in the remaining top bits.
pub const FRAME_POINTER_MASK: u32 = 0x0fff_ffff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyTriggerData {
    pub words: [u32; 8],
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobyFrame {
    pub unknown_0: f32,
    pub unknown_4: u16,
    pub unknown_8: u32,
    pub unknown_c: u8,
    pub unknown_d: u8,
    pub unknown_e: u16,
    /// Top four bits of the frame pointer
    pub pointer_flags: u8,
    /// Frame data, a whole number of quadwords
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobySequence {
    pub bounding_sphere: Vec4,
    pub frames: Vec<MobyFrame>,
    pub sound_count: u8,
    pub triggers: Vec<u32>,
    pub trigger_data: Option<MobyTriggerData>,
    pub animation_info: u32,
}

/// Read the sequences listed in the offset table
///
/// `data_end` is raised to the end of every frame read, which the class uses
/// to find where the data after the sequences begins.
pub(crate) fn read_sequences(
    src: &Buffer<'_>,
    offsets: &[i32],
    data_end: &mut usize,
) -> Result<Vec<Option<MobySequence>>> {
    offsets
        .iter()
        .enumerate()
        .map(|(index, &offset)| {
            if offset == 0 {
                return Ok(None);
            }
            let offset = usize::try_from(offset).map_err(|_| {
                MobyError::format(format!("Sequence {index} has negative offset {offset}"))
            })?;
            read_sequence(src, offset, data_end).map(Some)
        })
        .collect()
}

fn read_sequence(src: &Buffer<'_>, offset: usize, data_end: &mut usize) -> Result<MobySequence> {
    let header: MobySequenceHeader = src.read(offset, "moby sequence header")?;
    let frame_count = usize::from(header.frame_count);
    let frame_table: Vec<u32> =
        src.read_multiple(offset + SEQUENCE_HEADER_SIZE, frame_count, "moby sequence frame table")?;

    let mut frames = Vec::with_capacity(frame_count);
    for pointer in frame_table {
        let frame_offset = (pointer & FRAME_POINTER_MASK) as usize;
        let frame_header: MobyFrameHeader = src.read(frame_offset, "moby frame header")?;
        let data_size = usize::from(frame_header.count) * 0x10;
        let data = src.read_bytes(frame_offset + 0x10, data_size, "moby frame data")?;
        *data_end = (*data_end).max(frame_offset + 0x10 + data_size);
        frames.push(MobyFrame {
            unknown_0: frame_header.unknown_0,
            unknown_4: frame_header.unknown_4,
            unknown_8: frame_header.unknown_8,
            unknown_c: frame_header.unknown_c,
            unknown_d: frame_header.unknown_d,
            unknown_e: frame_header.unknown_e,
            pointer_flags: (pointer >> 28) as u8,
            data: data.to_vec(),
        });
    }

    let trigger_list = offset + SEQUENCE_HEADER_SIZE + frame_count * 4;
    let triggers = src.read_multiple(
        trigger_list,
        usize::from(header.trigger_count),
        "moby sequence trigger list",
    )?;
    let trigger_data = match header.triggers {
        0 => None,
        relative => Some(src.read(offset + relative as usize, "moby sequence trigger data")?),
    };

    Ok(MobySequence {
        bounding_sphere: header.bounding_sphere.into(),
        frames,
        sound_count: header.sound_count,
        triggers,
        trigger_data,
        animation_info: header.animation_info,
    })
}

/// Write every sequence, patching its entry in the offset table at `list_ofs`
pub(crate) fn write_sequences(
    ctx: &mut EncoderContext<'_>,
    sequences: &[Option<MobySequence>],
    list_ofs: usize,
    format: MobyFormat,
) -> Result<()> {
    for (index, sequence) in sequences.iter().enumerate() {
        let entry_ofs = list_ofs + index * 4;
        let Some(sequence) = sequence else {
            ctx.dest.write_i32_at(entry_ofs, 0);
            continue;
        };

        ctx.dest.pad(0x10, 0);
        let header_ofs = ctx.dest.alloc(SEQUENCE_HEADER_SIZE);
        let pointer = ctx.pointer(header_ofs, "Sequence")?;
        ctx.dest.write_i32_at(entry_ofs, pointer);

        let mut header = MobySequenceHeader {
            bounding_sphere: sequence.bounding_sphere.into(),
            frame_count: narrow(sequence.frames.len(), "Sequence frame count")?,
            sound_count: sequence.sound_count,
            trigger_count: narrow(sequence.triggers.len(), "Sequence trigger count")?,
            pad: format.sequence_pad(),
            triggers: 0,
            animation_info: sequence.animation_info,
        };

        let frame_pointers = ctx.dest.alloc(sequence.frames.len() * 4);
        for trigger in &sequence.triggers {
            ctx.dest.write_u32(*trigger);
        }
        if let Some(trigger_data) = &sequence.trigger_data {
            let ofs = ctx.dest.write(trigger_data)?;
            header.triggers = (ofs - header_ofs) as u32;
        }

        for (i, frame) in sequence.frames.iter().enumerate() {
            if frame.data.len() % 0x10 != 0 {
                return Err(MobyError::constraint(format!(
                    "Frame {i} of sequence {index} has 0x{:x} bytes of data, which is not a whole number of quadwords",
                    frame.data.len()
                )));
            }
            if frame.pointer_flags > 0xf {
                return Err(MobyError::constraint(format!(
                    "Frame {i} of sequence {index} has pointer flags 0x{:x} wider than 4 bits",
                    frame.pointer_flags
                )));
            }
            let frame_header = MobyFrameHeader {
                unknown_0: frame.unknown_0,
                unknown_4: frame.unknown_4,
                count: narrow(frame.data.len() / 0x10, "Frame data size")?,
                unknown_8: frame.unknown_8,
                unknown_c: frame.unknown_c,
                unknown_d: frame.unknown_d,
                unknown_e: frame.unknown_e,
            };
            ctx.dest.pad(0x10, 0);
            let frame_ofs = ctx.dest.write(&frame_header)?;
            let relative = ctx.rel(frame_ofs) as u32;
            if relative > FRAME_POINTER_MASK {
                return Err(MobyError::constraint(format!(
                    "Frame {i} of sequence {index} is too far from the class header"
                )));
            }
            let pointer = relative | (u32::from(frame.pointer_flags) << 28);
            ctx.dest.write_u32_at(frame_pointers + i * 4, pointer);
            ctx.dest.write_bytes(&frame.data);
        }

        ctx.dest.write_at(header_ofs, &header)?;
    }
    log::trace!("Wrote {} sequence slot(s)", sequences.len());
    Ok(())
}
