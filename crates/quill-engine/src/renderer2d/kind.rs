use crate::command::StageKind;
use crate::state::{ShaderStage, StateKind};

/// Category of a 2D command-stream entry.
///
/// Slot variants carry the sampler/texture slot (`0..8`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command2DKind {
    UpdateBuffers,
    Draw,
    DrawNull,
    ColorMul,
    ColorAdd,
    BlendState,
    RasterizerState,
    VsSampler(u8),
    PsSampler(u8),
    ScissorRect,
    Viewport,
    SdfParams,
    RenderTarget,
    VertexShader,
    PixelShader,
    Transform,
    ConstantBuffer,
    VsTexture(u8),
    PsTexture(u8),
}

impl StateKind for Command2DKind {
    const GEOMETRY_BITS: u64 = 0b111;

    fn bit(self) -> u32 {
        match self {
            Command2DKind::UpdateBuffers => 0,
            Command2DKind::Draw => 1,
            Command2DKind::DrawNull => 2,
            Command2DKind::ColorMul => 3,
            Command2DKind::ColorAdd => 4,
            Command2DKind::BlendState => 5,
            Command2DKind::RasterizerState => 6,
            Command2DKind::VsSampler(s) => 7 + s as u32,
            Command2DKind::PsSampler(s) => 15 + s as u32,
            Command2DKind::ScissorRect => 23,
            Command2DKind::Viewport => 24,
            Command2DKind::SdfParams => 25,
            Command2DKind::RenderTarget => 26,
            Command2DKind::VertexShader => 27,
            Command2DKind::PixelShader => 28,
            Command2DKind::Transform => 29,
            Command2DKind::ConstantBuffer => 30,
            Command2DKind::VsTexture(s) => 31 + s as u32,
            Command2DKind::PsTexture(s) => 39 + s as u32,
        }
    }
}

impl StageKind for Command2DKind {
    const VERTEX_SHADER: Self = Command2DKind::VertexShader;
    const PIXEL_SHADER: Self = Command2DKind::PixelShader;
    const CONSTANT_BUFFER: Self = Command2DKind::ConstantBuffer;

    fn sampler(stage: ShaderStage, slot: u8) -> Self {
        match stage {
            ShaderStage::Vertex => Command2DKind::VsSampler(slot),
            ShaderStage::Pixel => Command2DKind::PsSampler(slot),
        }
    }

    fn texture(stage: ShaderStage, slot: u8) -> Self {
        match stage {
            ShaderStage::Vertex => Command2DKind::VsTexture(slot),
            ShaderStage::Pixel => Command2DKind::PsTexture(slot),
        }
    }
}
