//! 2D render-command compiler.
//!
//! Shape helpers write pixel-space geometry through
//! [`Compiler2D::request_buffer`] and accumulate indexed draws; state pushes
//! between draws are deduplicated and emitted only when a draw needs them.

mod compiler;
mod kind;
mod shapes;

#[cfg(test)]
mod tests;

pub use compiler::{max_scaling, Compiler2D, Compiler2DConfig, DrawCommand, FramePhase};
pub use kind::Command2DKind;
pub use shapes::StandardShaders2D;
