//! Quill engine crate.
//!
//! Deferred render-command compilation: draw and state calls are recorded
//! into per-category histories and an ordered command stream with redundant
//! state changes removed, then replayed into a GPU backend.

pub mod logging;
pub mod coords;
pub mod paint;
pub mod resource;
pub mod state;
pub mod command;
pub mod batch;
pub mod renderer2d;
pub mod renderer3d;
pub mod replay;
pub mod render;
