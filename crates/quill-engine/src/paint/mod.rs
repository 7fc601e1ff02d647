//! Color model shared by vertex data and color-transform state.

mod color;

pub use color::Color;
