//! Shared state threaded through a class encode

use rac_data::OutBuffer;

use crate::error::{MobyError, Result};
use crate::header::MobyGifUsageEntry;

/// Output buffer plus the absolute offset of the class being written
///
/// Every offset stored in a class is relative to its header, so the base
/// travels with the buffer instead of living in global state.
#[derive(Debug)]
pub(crate) struct EncoderContext<'a> {
    pub dest: &'a mut OutBuffer,
    pub base: usize,
    /// Entries collected while writing submeshes, emitted after the last one
    pub gif_usage: Vec<MobyGifUsageEntry>,
}

impl<'a> EncoderContext<'a> {
    pub fn new(dest: &'a mut OutBuffer) -> Self {
        let base = dest.tell();
        Self {
            dest,
            base,
            gif_usage: Vec::new(),
        }
    }

    /// Offset of `abs` relative to the class header
    pub fn rel(&self, abs: usize) -> usize {
        abs - self.base
    }

    /// Offset of `abs` relative to the class header, as stored in a pointer
    pub fn pointer(&self, abs: usize, subject: &str) -> Result<i32> {
        i32::try_from(self.rel(abs)).map_err(|_| {
            MobyError::constraint(format!(
                "{subject} at 0x{:x} is too far from the class header",
                self.rel(abs)
            ))
        })
    }

    pub fn tell(&self) -> usize {
        self.dest.tell()
    }

    /// Append zeros until the class relative position reaches `rel`
    pub fn pad_to_rel(&mut self, rel: usize) {
        self.dest.pad_to(self.base + rel);
    }
}

/// Convert a count or offset into a narrower header field
pub(crate) fn narrow<T, U>(value: U, subject: &str) -> Result<T>
where
    T: TryFrom<U>,
    U: Copy + std::fmt::Display,
{
    T::try_from(value).map_err(|_| {
        MobyError::constraint(format!("{subject} ({value}) does not fit in its field"))
    })
}
