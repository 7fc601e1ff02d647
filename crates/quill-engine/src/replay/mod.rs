//! Backend-agnostic replay of compiled frames.
//!
//! The walkers bind the frame-start state (history index 0 of every
//! category), then resolve each stream entry into a typed op and hand it to
//! a backend. Batch uploads are placed through an [`UploadPlanner`] that
//! outlives the frame, and batch-relative draws are translated into
//! buffer-absolute index ranges.
//!
//! [`UploadPlanner`]: crate::batch::UploadPlanner

mod ops;
mod trace;
mod walk2d;
mod walk3d;

pub use ops::{IndexedDraw, Op2D, Op3D};
pub use trace::{TraceBackend, TraceRecord};
pub use walk2d::replay_2d;
pub use walk3d::replay_3d;

use anyhow::{Context, ensure};

use crate::batch::BatchInfo;

/// Consumer of 2D replay ops.
pub trait Backend2D {
    fn apply(&mut self, op: Op2D<'_>) -> anyhow::Result<()>;
}

/// Consumer of 3D replay ops.
pub trait Backend3D {
    fn apply(&mut self, op: Op3D<'_>) -> anyhow::Result<()>;
}

/// Counters collected while walking one frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub draw_calls: u32,
    pub triangles: u32,
    /// Stream state entries; frame-start bindings are not counted.
    pub state_changes: u32,
    pub uploads: u32,
}

/// Placement of the batch whose draws are being replayed.
#[derive(Debug, Default)]
struct BatchCursor {
    info: Option<BatchInfo>,
    consumed: u32,
}

impl BatchCursor {
    fn begin(&mut self, info: BatchInfo) {
        self.info = Some(info);
        self.consumed = 0;
    }

    /// Next `index_count` indices of the current batch, in buffer coordinates.
    fn take(&mut self, index_count: u32) -> anyhow::Result<IndexedDraw> {
        let info = self.info.context("draw recorded without uploaded geometry")?;
        ensure!(
            self.consumed + index_count <= info.index_count,
            "draw of {index_count} indices overruns its batch ({} of {} already drawn)",
            self.consumed,
            info.index_count
        );

        let draw = IndexedDraw {
            index_count,
            start_index: info.start_index_location + self.consumed,
            base_vertex: info.base_vertex_location as i32,
        };
        self.consumed += index_count;
        Ok(draw)
    }
}
