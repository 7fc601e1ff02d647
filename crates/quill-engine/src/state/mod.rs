//! Pipeline state values and the versioned cells that record them.
//!
//! Every category the compilers track is a [`StateSlot`] guarded by one bit
//! of a [`ChangeMask`]: the bit is set exactly while the slot's current value
//! differs from its last committed value.

mod blend;
mod changes;
mod depth_stencil;
mod rasterizer;
mod sampler;
mod slot;

pub use blend::{BlendFactor, BlendOp, BlendState};
pub use changes::{ChangeMask, StateKind};
pub use depth_stencil::{CompareFunction, DepthStencilState};
pub use rasterizer::{CullMode, FillMode, RasterizerState};
pub use sampler::{AddressMode, Filter, SamplerState};
pub use slot::{Pushed, StateSlot};

/// Number of sampler/texture slots per shader stage.
pub const MAX_SAMPLER_SLOTS: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
        }
    }
}
