//! 3D render-command compiler.
//!
//! Mesh draws carry their own [`PhongMaterial`] and are emitted one per call;
//! 3D lines go through a dedicated line batch and merge like 2D geometry.

mod compiler;
mod kind;
mod material;

#[cfg(test)]
mod tests;

pub use compiler::{Compiler3D, Compiler3DConfig, Draw3DCommand, DrawLine3DCommand, StandardShaders3D};
pub use kind::Command3DKind;
pub use material::PhongMaterial;
