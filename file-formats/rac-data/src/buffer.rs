//! Bounds-checked input views and growable output buffers
//!
//! Every read names the structure being read so that a truncated or corrupt
//! file produces an error that points at the offending table instead of a
//! generic end-of-file failure.

use std::io::Cursor;

use binrw::{BinRead, BinWrite, Endian};
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{RacDataError, Result};

/// Read-only view over a byte slice with checked, little-endian accessors
#[derive(Debug, Clone, Copy)]
pub struct Buffer<'a> {
    data: &'a [u8],
}

impl<'a> Buffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    pub fn read_bytes(&self, offset: usize, size: usize, subject: &str) -> Result<&'a [u8]> {
        let end = offset.checked_add(size).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => Err(RacDataError::OutOfBounds {
                subject: subject.to_string(),
                offset,
                size,
                len: self.data.len(),
            }),
        }
    }

    /// View of everything from `offset` to the end of this buffer
    pub fn subbuf(&self, offset: usize, subject: &str) -> Result<Buffer<'a>> {
        let size = self.data.len().saturating_sub(offset);
        self.read_bytes(offset, size, subject).map(Buffer::new)
    }

    pub fn subbuf_sized(&self, offset: usize, size: usize, subject: &str) -> Result<Buffer<'a>> {
        self.read_bytes(offset, size, subject).map(Buffer::new)
    }

    pub fn read_u8(&self, offset: usize, subject: &str) -> Result<u8> {
        Ok(self.read_bytes(offset, 1, subject)?[0])
    }

    pub fn read_i8(&self, offset: usize, subject: &str) -> Result<i8> {
        Ok(self.read_u8(offset, subject)? as i8)
    }

    pub fn read_u16(&self, offset: usize, subject: &str) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(offset, 2, subject)?))
    }

    pub fn read_i16(&self, offset: usize, subject: &str) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(offset, 2, subject)?))
    }

    pub fn read_u32(&self, offset: usize, subject: &str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(offset, 4, subject)?))
    }

    pub fn read_i32(&self, offset: usize, subject: &str) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(offset, 4, subject)?))
    }

    pub fn read_u64(&self, offset: usize, subject: &str) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(offset, 8, subject)?))
    }

    /// Read a signed 32-bit pointer where zero means the target is absent
    ///
    /// Negative pointers are rejected since every pointer is relative to the
    /// start of the structure that contains it.
    pub fn read_offset(&self, offset: usize, subject: &str) -> Result<Option<usize>> {
        match self.read_i32(offset, subject)? {
            0 => Ok(None),
            value => usize::try_from(value).map(Some).map_err(|_| {
                RacDataError::format(format!("Negative {subject} pointer {value} at 0x{offset:x}"))
            }),
        }
    }

    /// Read a fixed layout structure at `offset`
    pub fn read<T>(&self, offset: usize, subject: &str) -> Result<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let mut cursor = self.cursor_at(offset, subject)?;
        read_one(&mut cursor, offset, subject)
    }

    /// Read `count` consecutive structures starting at `offset`
    pub fn read_multiple<T>(&self, offset: usize, count: usize, subject: &str) -> Result<Vec<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let mut cursor = self.cursor_at(offset, subject)?;
        let mut values = Vec::new();
        for _ in 0..count {
            values.push(read_one(&mut cursor, offset, subject)?);
        }
        Ok(values)
    }

    fn cursor_at(&self, offset: usize, subject: &str) -> Result<Cursor<&'a [u8]>> {
        let rest = self.subbuf(offset, subject)?;
        Ok(Cursor::new(rest.data))
    }
}

fn read_one<T>(cursor: &mut Cursor<&[u8]>, offset: usize, subject: &str) -> Result<T>
where
    T: for<'b> BinRead<Args<'b> = ()>,
{
    T::read_options(cursor, Endian::Little, ()).map_err(|e| {
        RacDataError::format(format!(
            "Failed to read {subject} at 0x{:x}: {e}",
            offset as u64 + cursor.position()
        ))
    })
}

/// Growable output buffer with alignment helpers and in-place patching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutBuffer {
    data: Vec<u8>,
}

impl OutBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Current write position, which is always the end of the buffer
    pub fn tell(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Append `padding` bytes until the position is a multiple of `alignment`
    pub fn pad(&mut self, alignment: usize, padding: u8) {
        let rem = self.data.len() % alignment;
        if rem != 0 {
            self.data.resize(self.data.len() + alignment - rem, padding);
        }
    }

    /// Append zeros until the position reaches `position`
    pub fn pad_to(&mut self, position: usize) {
        if self.data.len() < position {
            self.data.resize(position, 0);
        }
    }

    /// Reserve `size` zeroed bytes to be patched later, returning their offset
    pub fn alloc(&mut self, size: usize) -> usize {
        let offset = self.data.len();
        self.data.resize(offset + size, 0);
        offset
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        offset
    }

    pub fn write_bytes_at(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) -> usize {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> usize {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> usize {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> usize {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> usize {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16_at(&mut self, offset: usize, value: i16) {
        self.write_bytes_at(offset, &value.to_le_bytes());
    }

    pub fn write_u32_at(&mut self, offset: usize, value: u32) {
        self.write_bytes_at(offset, &value.to_le_bytes());
    }

    pub fn write_i32_at(&mut self, offset: usize, value: i32) {
        self.write_bytes_at(offset, &value.to_le_bytes());
    }

    /// Append a fixed layout structure, returning the offset it was written at
    pub fn write<T>(&mut self, value: &T) -> Result<usize>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        let bytes = encode(value)?;
        Ok(self.write_bytes(&bytes))
    }

    pub fn write_multiple<T>(&mut self, values: &[T]) -> Result<usize>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        let offset = self.data.len();
        for value in values {
            self.write(value)?;
        }
        Ok(offset)
    }

    /// Overwrite a previously allocated region with a structure
    pub fn write_at<T>(&mut self, offset: usize, value: &T) -> Result<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        let bytes = encode(value)?;
        self.write_bytes_at(offset, &bytes);
        Ok(())
    }
}

fn encode<T>(value: &T) -> Result<Vec<u8>>
where
    T: for<'b> BinWrite<Args<'b> = ()>,
{
    let mut cursor = Cursor::new(Vec::new());
    value.write_options(&mut cursor, Endian::Little, ())?;
    Ok(cursor.into_inner())
}
