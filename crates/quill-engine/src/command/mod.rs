//! Compiled command streams and the per-stage state shared by the 2D and 3D
//! compilers.

mod stage;
mod stream;

pub use stage::{ConstantBufferCommand, StageKind, StageStates};
pub use stream::{Command, CommandStream};
