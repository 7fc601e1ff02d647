//! GPU replay of compiled 2D frames through wgpu.
//!
//! Convention:
//! - 2D geometry is in pixels (top-left origin, +Y down) relative to the
//!   active viewport; the vertex shader maps it to NDC.
//! - A backend owns its GPU buffers, pipelines and caches. Textures and
//!   render targets are registered by id before the frames that use them.

mod backend2d;
mod ctx;
mod headless;
mod pipeline;

pub use backend2d::{WgpuBackend2D, WgpuBackend2DConfig};
pub use ctx::{RenderCtx, TargetView};
pub use headless::{HeadlessGpu, HeadlessInit};
