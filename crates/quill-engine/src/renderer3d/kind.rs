use crate::command::StageKind;
use crate::state::{ShaderStage, StateKind};

/// Category of a 3D command-stream entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command3DKind {
    Draw,
    DrawLine3D,
    UpdateLine3DBuffers,
    BlendState,
    RasterizerState,
    DepthStencilState,
    VsSampler(u8),
    PsSampler(u8),
    ScissorRect,
    Viewport,
    RenderTarget,
    VertexShader,
    PixelShader,
    CameraTransform,
    EyePosition,
    LocalTransform,
    UvTransform,
    ConstantBuffer,
    VsTexture(u8),
    PsTexture(u8),
    Mesh,
    GlobalAmbientColor,
    SunDirection,
    SunColor,
}

impl StateKind for Command3DKind {
    const GEOMETRY_BITS: u64 = 0b111;

    fn bit(self) -> u32 {
        match self {
            Command3DKind::Draw => 0,
            Command3DKind::DrawLine3D => 1,
            Command3DKind::UpdateLine3DBuffers => 2,
            Command3DKind::BlendState => 3,
            Command3DKind::RasterizerState => 4,
            Command3DKind::DepthStencilState => 5,
            Command3DKind::VsSampler(s) => 6 + s as u32,
            Command3DKind::PsSampler(s) => 14 + s as u32,
            Command3DKind::ScissorRect => 22,
            Command3DKind::Viewport => 23,
            Command3DKind::RenderTarget => 24,
            Command3DKind::VertexShader => 25,
            Command3DKind::PixelShader => 26,
            Command3DKind::CameraTransform => 27,
            Command3DKind::EyePosition => 28,
            Command3DKind::LocalTransform => 29,
            Command3DKind::UvTransform => 30,
            Command3DKind::ConstantBuffer => 31,
            Command3DKind::VsTexture(s) => 32 + s as u32,
            Command3DKind::PsTexture(s) => 40 + s as u32,
            Command3DKind::Mesh => 48,
            Command3DKind::GlobalAmbientColor => 49,
            Command3DKind::SunDirection => 50,
            Command3DKind::SunColor => 51,
        }
    }
}

impl StageKind for Command3DKind {
    const VERTEX_SHADER: Self = Command3DKind::VertexShader;
    const PIXEL_SHADER: Self = Command3DKind::PixelShader;
    const CONSTANT_BUFFER: Self = Command3DKind::ConstantBuffer;

    fn sampler(stage: ShaderStage, slot: u8) -> Self {
        match stage {
            ShaderStage::Vertex => Command3DKind::VsSampler(slot),
            ShaderStage::Pixel => Command3DKind::PsSampler(slot),
        }
    }

    fn texture(stage: ShaderStage, slot: u8) -> Self {
        match stage {
            ShaderStage::Vertex => Command3DKind::VsTexture(slot),
            ShaderStage::Pixel => Command3DKind::PsTexture(slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_bits_do_not_overlap_neighbors() {
        assert_eq!(Command3DKind::VsSampler(7).bit() + 1, Command3DKind::PsSampler(0).bit());
        assert_eq!(Command3DKind::PsSampler(7).bit() + 1, Command3DKind::ScissorRect.bit());
        assert_eq!(Command3DKind::VsTexture(7).bit() + 1, Command3DKind::PsTexture(0).bit());
        assert_eq!(Command3DKind::PsTexture(7).bit() + 1, Command3DKind::Mesh.bit());
        assert!(Command3DKind::SunColor.bit() < 64);
    }
}
