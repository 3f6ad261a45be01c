//! Shared primitives for the Ratchet & Clank PS2 format crates
//!
//! - [`sector`]: sector sized addressing used by archive headers
//! - [`buffer`]: bounds-checked input views and patchable output buffers
//! - [`game`]: the game releases that select format variants

pub mod buffer;
pub mod error;
pub mod game;
pub mod sector;

pub use buffer::{Buffer, OutBuffer};
pub use error::{RacDataError, Result};
pub use game::Game;
pub use sector::{SECTOR_SIZE, Sector32, SectorByteRange, SectorRange, align_up};

pub mod prelude {
    pub use crate::buffer::{Buffer, OutBuffer};
    pub use crate::game::Game;
    pub use crate::sector::{SECTOR_SIZE, Sector32, SectorByteRange, SectorRange};
}
