use bytemuck::{Pod, Zeroable};

/// Index type of every batched mesh. Indices are relative to their batch.
pub type Index = u16;

/// 2D vertex in pixel space.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    pub pos: [f32; 2],
    pub tex: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2D {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // tex
        2 => Float32x4  // color
    ];

    #[inline]
    pub const fn new(pos: [f32; 2], tex: [f32; 2], color: [f32; 4]) -> Self {
        Self { pos, tex, color }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex2D>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Vertex of a 3D line list.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LineVertex3D {
    pub pos: [f32; 4],
    pub color: [f32; 4],
}

impl LineVertex3D {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x4, // pos
        1 => Float32x4  // color
    ];

    #[inline]
    pub fn new(pos: glam::Vec3, color: [f32; 4]) -> Self {
        Self { pos: pos.extend(1.0).to_array(), color }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex3D>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}
