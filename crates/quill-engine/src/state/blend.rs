#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

impl BlendFactor {
    fn to_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendOp {
    fn to_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOp::Add => wgpu::BlendOperation::Add,
            BlendOp::Subtract => wgpu::BlendOperation::Subtract,
            BlendOp::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOp::Min => wgpu::BlendOperation::Min,
            BlendOp::Max => wgpu::BlendOperation::Max,
        }
    }
}

/// Output-merger blend configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_alpha: BlendOp,
}

impl BlendState {
    /// Straight-alpha "over" blending; destination alpha is preserved.
    pub const NON_PREMULTIPLIED: BlendState = BlendState {
        enabled: true,
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
        op: BlendOp::Add,
        src_alpha: BlendFactor::Zero,
        dst_alpha: BlendFactor::One,
        op_alpha: BlendOp::Add,
    };

    pub const PREMULTIPLIED: BlendState = BlendState {
        src: BlendFactor::One,
        ..Self::NON_PREMULTIPLIED
    };

    pub const OPAQUE: BlendState = BlendState {
        enabled: false,
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
        ..Self::NON_PREMULTIPLIED
    };

    pub const ADDITIVE: BlendState = BlendState {
        dst: BlendFactor::One,
        ..Self::NON_PREMULTIPLIED
    };

    pub const SUBTRACTIVE: BlendState = BlendState {
        dst: BlendFactor::One,
        op: BlendOp::ReverseSubtract,
        ..Self::NON_PREMULTIPLIED
    };

    pub const MULTIPLICATIVE: BlendState = BlendState {
        src: BlendFactor::Zero,
        dst: BlendFactor::SrcColor,
        ..Self::NON_PREMULTIPLIED
    };

    pub const DEFAULT_2D: BlendState = Self::NON_PREMULTIPLIED;
    pub const DEFAULT_3D: BlendState = Self::OPAQUE;

    /// `None` means blending is disabled (source replaces destination).
    pub fn to_wgpu(self) -> Option<wgpu::BlendState> {
        if !self.enabled {
            return None;
        }
        Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: self.src.to_wgpu(),
                dst_factor: self.dst.to_wgpu(),
                operation: self.op.to_wgpu(),
            },
            alpha: wgpu::BlendComponent {
                src_factor: self.src_alpha.to_wgpu(),
                dst_factor: self.dst_alpha.to_wgpu(),
                operation: self.op_alpha.to_wgpu(),
            },
        })
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::DEFAULT_2D
    }
}
