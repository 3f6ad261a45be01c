//! Command implementations for rac-tools

pub mod lz;
pub mod moby;
pub mod wad;
