use std::fmt;

use glam::{Affine2, Mat4, Vec3, Vec4};

use crate::batch::{Index, LineVertex3D, Upload, Vertex2D};
use crate::command::ConstantBufferCommand;
use crate::coords::Rect;
use crate::paint::Color;
use crate::renderer3d::{Draw3DCommand, PhongMaterial};
use crate::resource::{MeshId, PixelShaderId, RenderTargetId, TextureId, VertexShaderId};
use crate::state::{BlendState, DepthStencilState, RasterizerState, SamplerState, ShaderStage};

/// An indexed draw in GPU-buffer coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndexedDraw {
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
}

/// One resolved 2D replay step.
#[derive(Debug, Clone, PartialEq)]
pub enum Op2D<'a> {
    Upload {
        upload: Upload,
        vertices: &'a [Vertex2D],
        indices: &'a [Index],
    },
    Draw(IndexedDraw),
    DrawNull { vertex_count: u32 },
    ColorMul(Color),
    ColorAdd(Color),
    Blend(BlendState),
    Rasterizer(RasterizerState),
    Sampler { stage: ShaderStage, slot: usize, state: SamplerState },
    Scissor(Rect),
    Viewport(Option<Rect>),
    SdfParams(Vec4),
    RenderTarget(RenderTargetId),
    VertexShader(VertexShaderId),
    PixelShader(PixelShaderId),
    Transform(Affine2),
    ConstantBuffer { command: ConstantBufferCommand, data: &'a [Vec4] },
    Texture { stage: ShaderStage, slot: usize, texture: TextureId },
}

impl Op2D<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Op2D::Upload { .. } => "upload",
            Op2D::Draw(_) => "draw",
            Op2D::DrawNull { .. } => "draw_null",
            Op2D::ColorMul(_) => "color_mul",
            Op2D::ColorAdd(_) => "color_add",
            Op2D::Blend(_) => "blend",
            Op2D::Rasterizer(_) => "rasterizer",
            Op2D::Sampler { .. } => "sampler",
            Op2D::Scissor(_) => "scissor",
            Op2D::Viewport(_) => "viewport",
            Op2D::SdfParams(_) => "sdf_params",
            Op2D::RenderTarget(_) => "render_target",
            Op2D::VertexShader(_) => "vertex_shader",
            Op2D::PixelShader(_) => "pixel_shader",
            Op2D::Transform(_) => "transform",
            Op2D::ConstantBuffer { .. } => "constant_buffer",
            Op2D::Texture { .. } => "texture",
        }
    }
}

impl fmt::Display for Op2D<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op2D::Upload { upload, vertices, indices } => write!(
                f,
                "upload batch={} vertices={} indices={} at v{}/i{} ({:?}/{:?})",
                upload.batch,
                vertices.len(),
                indices.len(),
                upload.info.base_vertex_location,
                upload.info.start_index_location,
                upload.vertex_hint,
                upload.index_hint
            ),
            Op2D::ConstantBuffer { command, .. } => write!(f, "constant_buffer {command:?}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One resolved 3D replay step.
#[derive(Debug, Clone, PartialEq)]
pub enum Op3D<'a> {
    UploadLines {
        upload: Upload,
        vertices: &'a [LineVertex3D],
        indices: &'a [Index],
    },
    DrawLines(IndexedDraw),
    DrawMesh { draw: Draw3DCommand, material: &'a PhongMaterial },
    Blend(BlendState),
    Rasterizer(RasterizerState),
    DepthStencil(DepthStencilState),
    Sampler { stage: ShaderStage, slot: usize, state: SamplerState },
    Scissor(Rect),
    Viewport(Option<Rect>),
    RenderTarget(RenderTargetId),
    VertexShader(VertexShaderId),
    PixelShader(PixelShaderId),
    CameraTransform(Mat4),
    EyePosition(Vec3),
    LocalTransform(Mat4),
    UvTransform(Vec4),
    ConstantBuffer { command: ConstantBufferCommand, data: &'a [Vec4] },
    Texture { stage: ShaderStage, slot: usize, texture: TextureId },
    Mesh(MeshId),
    GlobalAmbientColor(Vec3),
    SunDirection(Vec3),
    SunColor(Vec3),
}

impl Op3D<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Op3D::UploadLines { .. } => "upload_lines",
            Op3D::DrawLines(_) => "draw_lines",
            Op3D::DrawMesh { .. } => "draw_mesh",
            Op3D::Blend(_) => "blend",
            Op3D::Rasterizer(_) => "rasterizer",
            Op3D::DepthStencil(_) => "depth_stencil",
            Op3D::Sampler { .. } => "sampler",
            Op3D::Scissor(_) => "scissor",
            Op3D::Viewport(_) => "viewport",
            Op3D::RenderTarget(_) => "render_target",
            Op3D::VertexShader(_) => "vertex_shader",
            Op3D::PixelShader(_) => "pixel_shader",
            Op3D::CameraTransform(_) => "camera_transform",
            Op3D::EyePosition(_) => "eye_position",
            Op3D::LocalTransform(_) => "local_transform",
            Op3D::UvTransform(_) => "uv_transform",
            Op3D::ConstantBuffer { .. } => "constant_buffer",
            Op3D::Texture { .. } => "texture",
            Op3D::Mesh(_) => "mesh",
            Op3D::GlobalAmbientColor(_) => "global_ambient_color",
            Op3D::SunDirection(_) => "sun_direction",
            Op3D::SunColor(_) => "sun_color",
        }
    }
}

impl fmt::Display for Op3D<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op3D::UploadLines { upload, vertices, indices } => write!(
                f,
                "upload_lines batch={} vertices={} indices={} at v{}/i{}",
                upload.batch,
                vertices.len(),
                indices.len(),
                upload.info.base_vertex_location,
                upload.info.start_index_location
            ),
            Op3D::ConstantBuffer { command, .. } => write!(f, "constant_buffer {command:?}"),
            other => write!(f, "{other:?}"),
        }
    }
}
