//! Integer pixel geometry used by pipeline state.
//!
//! Canonical space:
//! - Physical pixels of the bound render target
//! - Origin top-left
//! - +X right, +Y down

mod rect;

pub use rect::Rect;
