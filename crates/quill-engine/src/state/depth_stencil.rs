#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunction {
    fn to_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

/// Depth test configuration. The 3D renderer uses reversed Z.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_enable: bool,
    pub depth_write: bool,
    pub compare: CompareFunction,
}

impl DepthStencilState {
    pub const DISABLED: DepthStencilState = DepthStencilState {
        depth_enable: false,
        depth_write: false,
        compare: CompareFunction::Always,
    };

    pub const DEPTH_TEST: DepthStencilState = DepthStencilState {
        depth_enable: true,
        depth_write: false,
        compare: CompareFunction::GreaterEqual,
    };

    pub const DEPTH_TEST_WRITE: DepthStencilState = DepthStencilState {
        depth_write: true,
        ..Self::DEPTH_TEST
    };

    pub const DEFAULT_2D: DepthStencilState = Self::DISABLED;
    pub const DEFAULT_3D: DepthStencilState = Self::DEPTH_TEST_WRITE;

    /// `None` when the depth attachment is not used at all.
    pub fn to_wgpu(self, format: wgpu::TextureFormat) -> Option<wgpu::DepthStencilState> {
        if !self.depth_enable && !self.depth_write {
            return None;
        }
        let compare = if self.depth_enable { self.compare } else { CompareFunction::Always };
        Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_write,
            depth_compare: compare.to_wgpu(),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        })
    }
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self::DEFAULT_3D
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_has_no_wgpu_state() {
        assert!(DepthStencilState::DISABLED.to_wgpu(wgpu::TextureFormat::Depth32Float).is_none());
    }

    #[test]
    fn default_3d_uses_reversed_z() {
        let d = DepthStencilState::DEFAULT_3D
            .to_wgpu(wgpu::TextureFormat::Depth32Float)
            .unwrap();
        assert!(d.depth_write_enabled);
        assert_eq!(d.depth_compare, wgpu::CompareFunction::GreaterEqual);
    }
}
