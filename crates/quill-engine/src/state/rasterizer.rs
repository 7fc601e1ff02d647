#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Rasterizer configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RasterizerState {
    pub fill: FillMode,
    pub cull: CullMode,
    /// When false the scissor rectangle is ignored during replay.
    pub scissor_enable: bool,
    pub depth_bias: i32,
}

impl RasterizerState {
    pub const SOLID_CULL_NONE: RasterizerState = RasterizerState {
        fill: FillMode::Solid,
        cull: CullMode::None,
        scissor_enable: false,
        depth_bias: 0,
    };

    pub const SOLID_CULL_BACK: RasterizerState = RasterizerState {
        cull: CullMode::Back,
        ..Self::SOLID_CULL_NONE
    };

    pub const SOLID_CULL_FRONT: RasterizerState = RasterizerState {
        cull: CullMode::Front,
        ..Self::SOLID_CULL_NONE
    };

    pub const WIREFRAME_CULL_NONE: RasterizerState = RasterizerState {
        fill: FillMode::Wireframe,
        ..Self::SOLID_CULL_NONE
    };

    pub const SOLID_CULL_NONE_SCISSOR: RasterizerState = RasterizerState {
        scissor_enable: true,
        ..Self::SOLID_CULL_NONE
    };

    pub const DEFAULT_2D: RasterizerState = Self::SOLID_CULL_NONE;
    pub const DEFAULT_3D: RasterizerState = Self::SOLID_CULL_BACK;

    /// Primitive state for triangle lists.
    ///
    /// `wireframe_supported` reflects `Features::POLYGON_MODE_LINE`; without it
    /// wireframe falls back to solid fill.
    pub fn to_wgpu(self, wireframe_supported: bool) -> wgpu::PrimitiveState {
        let polygon_mode = match self.fill {
            FillMode::Wireframe if wireframe_supported => wgpu::PolygonMode::Line,
            _ => wgpu::PolygonMode::Fill,
        };
        let cull_mode = match self.cull {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        };
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode,
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        }
    }
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self::DEFAULT_2D
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wireframe_falls_back_without_feature() {
        let p = RasterizerState::WIREFRAME_CULL_NONE.to_wgpu(false);
        assert_eq!(p.polygon_mode, wgpu::PolygonMode::Fill);
        let p = RasterizerState::WIREFRAME_CULL_NONE.to_wgpu(true);
        assert_eq!(p.polygon_mode, wgpu::PolygonMode::Line);
    }

    #[test]
    fn cull_back_maps_to_face() {
        let p = RasterizerState::DEFAULT_3D.to_wgpu(false);
        assert_eq!(p.cull_mode, Some(wgpu::Face::Back));
    }
}
