use bytemuck::Pod;

use super::config::BatchConfig;
use super::vertex::Index;

/// Scratch region of one GPU upload.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BatchDescriptor {
    pub vertex_offset: u32,
    pub index_offset: u32,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl BatchDescriptor {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0 && self.index_count == 0
    }
}

/// Geometry request that cannot be served. The shape is dropped and
/// recording continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("geometry request without vertices or indices")]
    Empty,

    #[error(
        "chunk of {vertices} vertices / {indices} indices exceeds one GPU buffer \
         ({max_vertices} / {max_indices})"
    )]
    ChunkTooLarge {
        vertices: u32,
        indices: u32,
        max_vertices: u32,
        max_indices: u32,
    },

    #[error(
        "scratch ceiling reached: {vertices} vertices / {indices} indices requested, \
         limit {max_vertices} / {max_indices}"
    )]
    ScratchCeiling {
        vertices: u64,
        indices: u64,
        max_vertices: u32,
        max_indices: u32,
    },
}

/// Where an accepted request lands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Appended to the batch already announced this frame.
    Current,
    /// First geometry of the frame; the batch must be announced.
    Announce(u32),
    /// The current batch is full; a new batch with this index is opened.
    NewBatch(u32),
}

/// Mutable view of freshly allocated geometry.
///
/// Indices written here are relative to the batch; add `base_index` to
/// indices that refer to `vertices` (see [`GeometryWriter::set_indices`]).
pub struct GeometryWriter<'a, V> {
    pub vertices: &'a mut [V],
    pub indices: &'a mut [Index],
    pub base_index: Index,
}

impl<V> GeometryWriter<'_, V> {
    /// Writes indices local to this chunk, offset by `base_index`.
    pub fn set_indices(&mut self, local: &[Index]) {
        debug_assert_eq!(local.len(), self.indices.len());
        for (dst, &i) in self.indices.iter_mut().zip(local) {
            debug_assert!((i as usize) < self.vertices.len(), "index {i} outside this chunk");
            *dst = self.base_index + i;
        }
    }
}

/// Vertices one batch can address with `u16` indices.
pub const MAX_BATCH_VERTICES: u32 = Index::MAX as u32 + 1;

/// Growable CPU scratch arrays split into GPU-buffer-sized batches.
#[derive(Debug)]
pub struct GeometryBatcher<V> {
    config: BatchConfig,
    vertices: Vec<V>,
    indices: Vec<Index>,
    batches: Vec<BatchDescriptor>,
    announced: bool,
}

impl<V: Pod> GeometryBatcher<V> {
    /// Creates an empty batcher. A vertex capacity beyond what `u16`
    /// indices can address is clamped to [`MAX_BATCH_VERTICES`].
    pub fn new(mut config: BatchConfig) -> Self {
        if config.gpu_vertex_capacity > MAX_BATCH_VERTICES {
            log::warn!(
                "gpu_vertex_capacity {} exceeds u16 index range; clamped to {MAX_BATCH_VERTICES}",
                config.gpu_vertex_capacity
            );
            config.gpu_vertex_capacity = MAX_BATCH_VERTICES;
        }
        Self {
            vertices: Vec::with_capacity(config.initial_scratch_vertices as usize),
            indices: Vec::with_capacity(config.initial_scratch_indices as usize),
            batches: vec![BatchDescriptor::default()],
            announced: false,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    #[inline]
    fn current(&self) -> &BatchDescriptor {
        // `batches` always holds at least the frame's first batch.
        &self.batches[self.batches.len() - 1]
    }

    /// Decides where a request of `vertex_count`/`index_count` goes without
    /// changing anything.
    pub fn plan(&self, vertex_count: u32, index_count: u32) -> Result<Placement, BatchError> {
        let cfg = &self.config;

        if vertex_count == 0 || index_count == 0 {
            return Err(BatchError::Empty);
        }

        if vertex_count > cfg.gpu_vertex_capacity || index_count > cfg.gpu_index_capacity {
            return Err(BatchError::ChunkTooLarge {
                vertices: vertex_count,
                indices: index_count,
                max_vertices: cfg.gpu_vertex_capacity,
                max_indices: cfg.gpu_index_capacity,
            });
        }

        let need_vertices = self.vertices.len() as u64 + vertex_count as u64;
        let need_indices = self.indices.len() as u64 + index_count as u64;
        if need_vertices > cfg.max_scratch_vertices as u64 || need_indices > cfg.max_scratch_indices as u64 {
            return Err(BatchError::ScratchCeiling {
                vertices: need_vertices,
                indices: need_indices,
                max_vertices: cfg.max_scratch_vertices,
                max_indices: cfg.max_scratch_indices,
            });
        }

        let current = self.current();
        if current.vertex_count + vertex_count > cfg.gpu_vertex_capacity
            || current.index_count + index_count > cfg.gpu_index_capacity
        {
            return Ok(Placement::NewBatch(self.batches.len() as u32));
        }

        if self.announced {
            Ok(Placement::Current)
        } else {
            Ok(Placement::Announce((self.batches.len() - 1) as u32))
        }
    }

    /// Allocates geometry for a placement returned by [`plan`](Self::plan)
    /// with the same counts.
    pub fn allocate(&mut self, placement: Placement, vertex_count: u32, index_count: u32) -> GeometryWriter<'_, V> {
        match placement {
            Placement::Current => {}
            Placement::Announce(_) => self.announced = true,
            Placement::NewBatch(index) => {
                debug_assert_eq!(index as usize, self.batches.len());
                self.batches.push(BatchDescriptor {
                    vertex_offset: self.vertices.len() as u32,
                    index_offset: self.indices.len() as u32,
                    vertex_count: 0,
                    index_count: 0,
                });
                self.announced = true;
            }
        }

        self.grow_scratch(vertex_count as usize, index_count as usize);

        let last = self.batches.len() - 1;
        let batch = &mut self.batches[last];
        let base_index = batch.vertex_count as Index;
        batch.vertex_count += vertex_count;
        batch.index_count += index_count;

        let v0 = self.vertices.len();
        let i0 = self.indices.len();
        self.vertices.resize(v0 + vertex_count as usize, V::zeroed());
        self.indices.resize(i0 + index_count as usize, 0);

        GeometryWriter {
            vertices: &mut self.vertices[v0..],
            indices: &mut self.indices[i0..],
            base_index,
        }
    }

    fn grow_scratch(&mut self, vertex_count: usize, index_count: usize) {
        let need = self.vertices.len() + vertex_count;
        if need > self.vertices.capacity() {
            let cap = grown_capacity(self.vertices.capacity(), need, self.config.max_scratch_vertices as usize);
            self.vertices.reserve_exact(cap - self.vertices.len());
            log::debug!("vertex scratch grown to {cap}");
        }

        let need = self.indices.len() + index_count;
        if need > self.indices.capacity() {
            let cap = grown_capacity(self.indices.capacity(), need, self.config.max_scratch_indices as usize);
            self.indices.reserve_exact(cap - self.indices.len());
            log::debug!("index scratch grown to {cap}");
        }
    }

    /// Clears geometry and batches. Scratch capacity is kept.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.batches.clear();
        self.batches.push(BatchDescriptor::default());
        self.announced = false;
    }

    // ── access ────────────────────────────────────────────────────────────

    #[inline]
    pub fn batches(&self) -> &[BatchDescriptor] {
        &self.batches
    }

    #[inline]
    pub fn batch(&self, index: u32) -> &BatchDescriptor {
        &self.batches[index as usize]
    }

    pub fn batch_vertices(&self, index: u32) -> &[V] {
        let b = self.batch(index);
        let start = b.vertex_offset as usize;
        &self.vertices[start..start + b.vertex_count as usize]
    }

    pub fn batch_indices(&self, index: u32) -> &[Index] {
        let b = self.batch(index);
        let start = b.index_offset as usize;
        &self.indices[start..start + b.index_count as usize]
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    #[inline]
    pub fn index_capacity(&self) -> usize {
        self.indices.capacity()
    }
}

/// Doubles `current` until it holds `need`, never past `max`.
fn grown_capacity(current: usize, need: usize, max: usize) -> usize {
    let mut cap = current.max(1);
    while cap < need {
        cap = cap.saturating_mul(2);
    }
    cap.min(max).max(need)
}
