//! # rac_moby - moby classes of the Ratchet & Clank PS2 games
//!
//! Mobies are the animated objects of a level. A moby class holds everything
//! needed to draw one: animation sequences, a skeleton, collision, sound
//! definitions and the VIF packed submeshes the VU1 microprogram renders.
//!
//! The codec is lossless: reading a class and writing it back for the same
//! game produces the original bytes, apart from the offsets of blocks that
//! moved because the model was edited.
//!
//! ## Examples
//!
//! ```no_run
//! use rac_data::Game;
//! use rac_moby::MobyClass;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("moby_class.bin")?;
//! let (class, warnings) = MobyClass::read_with_warnings(&data, Game::Rac2)?;
//! for warning in &warnings {
//!     eprintln!("{warning}");
//! }
//! println!(
//!     "{} sequences, {} high detail submeshes",
//!     class.sequences.len(),
//!     class.submeshes.len()
//! );
//!
//! let rewritten = class.write(Game::Rac2)?;
//! std::fs::write("moby_class_out.bin", rewritten)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Meshes
//!
//! ```no_run
//! # use rac_data::Game;
//! # use rac_moby::MobyClass;
//! # fn main() -> Result<(), rac_moby::MobyError> {
//! # let class = MobyClass::default();
//! for mesh in class.lift_meshes(4)? {
//!     println!("{}: {} vertices", mesh.name, mesh.vertices.len());
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod chunks;
pub mod class;
pub(crate) mod encoder;
pub mod error;
pub mod format;
pub mod header;
pub mod mesh;
pub mod submesh;

pub use chunks::{
    MobyBangle, MobyBangles, MobyCollision, MobyCornCob, MobyCornKernel, MobyFrame, MobySequence,
    MobySoundDef, MobyTriggerData, MobyVertexPosition,
};
pub use class::{MOBY_CLASS_ALIGNMENT, MobyClass, SubMeshTable, SubMeshWarning};
pub use error::{MobyError, Result};
pub use format::MobyFormat;
pub use mesh::{Mesh, MeshSubMesh, MeshVertex, lift_submeshes};
pub use submesh::{
    MobyIndexBuffer, MobyMetalSubMesh, MobyMetalVertex, MobySubMesh, MobyTexCoord,
    MobyTexturePrimitive, MobyVertex, StructuralWarning,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
