//! # rac_wad - WAD archives of the Ratchet & Clank PS2 games
//!
//! Reads and writes the sector aligned archive files the games load levels,
//! audio and videos from, along with the LZ compression used for some of
//! their lumps.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use rac_wad::{Archive, WadContents};
//!
//! # fn main() -> Result<(), rac_wad::Error> {
//! let mut reader = BufReader::new(File::open("LEVEL4.WAD")?);
//! let archive = Archive::read(&mut reader)?;
//! println!("{} archive", archive.kind());
//!
//! if let WadContents::Level(level) = archive.contents() {
//!     if let Some(gameplay) = level.gameplay_core.get(0) {
//!         println!("{} gameplay blocks", gameplay.blocks.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Compression
//!
//! ```
//! use rac_wad::compression::{compress_wad, decompress_wad};
//!
//! # fn main() -> Result<(), rac_wad::Error> {
//! let data = b"abcabcabcabcabcabc".repeat(64);
//! let compressed = compress_wad(&data, 4)?;
//! assert_eq!(decompress_wad(&compressed)?, data);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod archive;
pub mod compression;
pub mod error;
pub mod gameplay;

pub use archive::{
    Archive, ArchiveDescriptor, ArchiveKind, LumpDescriptor, LumpInfo, LumpTable, WadContents,
};
pub use compression::{compress_wad, decompress_wad, validate_wad};
pub use error::{Error, Result};
pub use gameplay::{Gameplay, GameplayBlock};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
