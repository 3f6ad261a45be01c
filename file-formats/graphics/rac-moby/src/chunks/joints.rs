//! Joint lists: a count, a table of list offsets and 0xff terminated byte lists

use rac_data::Buffer;

use crate::encoder::{EncoderContext, narrow};
use crate::error::{MobyError, Result};

const LIST_TERMINATOR: u8 = 0xff;

/// Read the joint lists at `offset`, where no offset means no lists
pub(crate) fn read_joints(src: &Buffer<'_>, offset: Option<usize>) -> Result<Vec<Vec<u8>>> {
    let Some(offset) = offset else {
        return Ok(Vec::new());
    };
    let count = src.read_i32(offset, "joint list count")?;
    let count = usize::try_from(count)
        .map_err(|_| MobyError::format(format!("Negative joint list count {count}")))?;

    let table_size = count
        .checked_mul(4)
        .ok_or_else(|| MobyError::format(format!("Joint list count {count} overflows")))?;
    src.read_bytes(offset + 4, table_size, "joint list table")?;

    let mut lists = Vec::new();
    for i in 0..count {
        let mut list = Vec::new();
        if let Some(mut ofs) = src.read_offset(offset + (i + 1) * 4, "joint list")? {
            loop {
                let value = src.read_u8(ofs, "joint list data")?;
                ofs += 1;
                if value == LIST_TERMINATOR {
                    break;
                }
                list.push(value);
            }
        }
        lists.push(list);
    }
    Ok(lists)
}

/// Write the joint lists on a 0x10 boundary, returning their offset
pub(crate) fn write_joints(ctx: &mut EncoderContext<'_>, joints: &[Vec<u8>]) -> Result<usize> {
    ctx.dest.pad(0x10, 0);
    let base_ofs = ctx.dest.write_i32(narrow(joints.len(), "Joint list count")?);
    let table_ofs = ctx.dest.alloc(joints.len() * 4);
    for (i, list) in joints.iter().enumerate() {
        if list.contains(&LIST_TERMINATOR) {
            return Err(MobyError::constraint(format!(
                "Joint list {i} contains the terminator value 0xff"
            )));
        }
        ctx.dest.pad(0x4, 0);
        let pointer = ctx.pointer(ctx.tell(), "Joint list")?;
        ctx.dest.write_i32_at(table_ofs + i * 4, pointer);
        ctx.dest.write_bytes(list);
        ctx.dest.write_u8(LIST_TERMINATOR);
    }
    Ok(base_ofs)
}
