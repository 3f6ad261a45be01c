use std::io;

use rac_data::RacDataError;
use thiserror::Error;

/// Error types for moby class decoding and encoding
#[derive(Error, Debug)]
pub enum MobyError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The class data is structurally invalid
    #[error("Format error: {0}")]
    Format(String),

    /// The in-memory class cannot be represented in the on-disk layout
    #[error("Encoding constraint violated: {0}")]
    EncodingConstraint(String),

    /// Error from the shared data layer, usually an out of bounds read
    #[error(transparent)]
    Data(#[from] RacDataError),

    /// Error from a fixed layout structure
    #[error("Binary layout error: {0}")]
    Binary(#[from] binrw::Error),
}

impl MobyError {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Self::Format(msg.into())
    }

    pub fn constraint<S: Into<String>>(msg: S) -> Self {
        Self::EncodingConstraint(msg.into())
    }

    /// Check if this error was caused by bad input data rather than by the
    /// model being too large to encode
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Data(_) | Self::Binary(_))
    }
}

/// Result type using MobyError
pub type Result<T> = std::result::Result<T, MobyError>;
