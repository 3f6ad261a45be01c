//! The blocks a moby class points to from its header, apart from submeshes

pub mod bangles;
pub mod collision;
pub mod corncob;
pub(crate) mod joints;
pub mod sequence;
pub mod sound;

pub use bangles::{BANGLE_COUNT, MobyBangle, MobyBangles, MobyVertexPosition};
pub use collision::MobyCollision;
pub use corncob::{CORNCOB_KERNEL_COUNT, MobyCornCob, MobyCornKernel};
pub use sequence::{MobyFrame, MobySequence, MobyTriggerData};
pub use sound::MobySoundDef;
