//! Error types for the WAD library

use std::io;

use rac_data::RacDataError;
use thiserror::Error;

/// Result type alias for WAD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for WAD operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid WAD format or corrupted archive
    #[error("Invalid WAD format: {0}")]
    InvalidFormat(String),

    /// Compression/decompression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// No archive kind has this header size
    #[error("Unable to identify WAD file: no archive kind has a header of size 0x{header_size:x}")]
    UnknownArchive {
        /// The header size read from the file
        header_size: usize,
    },

    /// More than one archive kind has this header size
    #[error("Ambiguous WAD file: {count} archive kinds have a header of size 0x{header_size:x}")]
    AmbiguousArchive {
        /// The header size read from the file
        header_size: usize,
        /// Number of matching descriptors
        count: usize,
    },

    /// A lump handler was bound to an archive of another kind
    #[error("Lump '{lump}' does not belong to a {kind} archive")]
    LumpMismatch {
        /// Lump name
        lump: &'static str,
        /// Archive kind name
        kind: &'static str,
    },

    /// Error from the shared data layer
    #[error(transparent)]
    Data(#[from] RacDataError),

    /// Error from a fixed layout structure
    #[error("Binary layout error: {0}")]
    Binary(#[from] binrw::Error),
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Check if this error indicates the input is corrupted or unsupported
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::Compression(_)
                | Self::UnknownArchive { .. }
                | Self::AmbiguousArchive { .. }
                | Self::Data(_)
                | Self::Binary(_)
        )
    }
}
