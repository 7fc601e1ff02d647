/// Capacities of the fixed GPU buffers and the growable CPU scratch arrays.
///
/// GPU capacities bound a single batch; scratch capacities bound a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Vertices per GPU vertex buffer. At most 65,536 because indices are `u16`.
    pub gpu_vertex_capacity: u32,
    pub gpu_index_capacity: u32,

    pub initial_scratch_vertices: u32,
    pub initial_scratch_indices: u32,

    /// Hard ceiling for scratch growth; requests beyond it are dropped.
    pub max_scratch_vertices: u32,
    pub max_scratch_indices: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            gpu_vertex_capacity: 65_536,
            gpu_index_capacity: 262_144,
            initial_scratch_vertices: 4_096,
            initial_scratch_indices: 16_384,
            max_scratch_vertices: 16_777_216,
            max_scratch_indices: 67_108_864,
        }
    }
}
