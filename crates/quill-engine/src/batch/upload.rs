use super::batcher::BatchDescriptor;
use super::config::BatchConfig;

/// How the destination range of an upload may be mapped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadHint {
    /// Appended after data still in flight.
    NoOverwrite,
    /// The write position wrapped; previous contents may be discarded.
    Discard,
}

/// Placement of one uploaded batch, used to translate its draws.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BatchInfo {
    pub index_count: u32,
    pub start_index_location: u32,
    pub base_vertex_location: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Upload {
    pub batch: u32,
    pub vertex_hint: UploadHint,
    pub index_hint: UploadHint,
    /// Indices actually copied; rounded up to a 4-byte multiple.
    pub padded_index_count: u32,
    pub info: BatchInfo,
}

/// Ring-style write positions in the fixed GPU vertex and index buffers.
///
/// Persists across frames; each buffer wraps to 0 independently.
#[derive(Debug, Clone)]
pub struct UploadPlanner {
    vertex_capacity: u32,
    index_capacity: u32,
    vertex_pos: u32,
    index_pos: u32,
}

impl UploadPlanner {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            vertex_capacity: config.gpu_vertex_capacity,
            index_capacity: padded_index_count(config.gpu_index_capacity),
            vertex_pos: 0,
            index_pos: 0,
        }
    }

    /// Index buffer size in elements, including copy padding.
    #[inline]
    pub fn index_capacity(&self) -> u32 {
        self.index_capacity
    }

    #[inline]
    pub fn vertex_capacity(&self) -> u32 {
        self.vertex_capacity
    }

    pub fn plan(&mut self, batch: u32, desc: &BatchDescriptor) -> Upload {
        let mut vertex_hint = UploadHint::NoOverwrite;
        if self.vertex_pos + desc.vertex_count > self.vertex_capacity {
            self.vertex_pos = 0;
            vertex_hint = UploadHint::Discard;
        }

        let padded = padded_index_count(desc.index_count);
        let mut index_hint = UploadHint::NoOverwrite;
        if self.index_pos + padded > self.index_capacity {
            self.index_pos = 0;
            index_hint = UploadHint::Discard;
        }

        let info = BatchInfo {
            index_count: desc.index_count,
            start_index_location: self.index_pos,
            base_vertex_location: self.vertex_pos,
        };

        self.vertex_pos += desc.vertex_count;
        self.index_pos += padded;

        Upload {
            batch,
            vertex_hint,
            index_hint,
            padded_index_count: padded,
            info,
        }
    }

    /// Forces the next upload of each buffer to start at 0.
    pub fn reset(&mut self) {
        self.vertex_pos = 0;
        self.index_pos = 0;
    }
}

/// `u16` index copies must cover whole 4-byte words.
#[inline]
pub fn padded_index_count(count: u32) -> u32 {
    (count + 1) & !1
}
