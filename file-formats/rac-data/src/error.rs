use std::io;

use thiserror::Error;

/// Errors raised while addressing or slicing raw game data
#[derive(Error, Debug)]
pub enum RacDataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read or sub-buffer fell outside the available bytes
    #[error("Failed to read {subject}: range 0x{offset:x}+0x{size:x} is out of bounds (buffer size 0x{len:x})")]
    OutOfBounds {
        subject: String,
        offset: usize,
        size: usize,
        len: usize,
    },

    /// Structurally invalid data
    #[error("Format error: {0}")]
    Format(String),

    #[error("Binary layout error: {0}")]
    Binary(#[from] binrw::Error),

    #[error("Unknown game: {0}")]
    UnknownGame(String),
}

impl RacDataError {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Self::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RacDataError>;
