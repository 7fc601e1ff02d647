#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    Mirror,
    Clamp,
}

impl AddressMode {
    fn to_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::Mirror => wgpu::AddressMode::MirrorRepeat,
            AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

impl Filter {
    fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            Filter::Nearest => wgpu::FilterMode::Nearest,
            Filter::Linear => wgpu::FilterMode::Linear,
        }
    }

    fn to_wgpu_mipmap(self) -> wgpu::MipmapFilterMode {
        match self {
            Filter::Nearest => wgpu::MipmapFilterMode::Nearest,
            Filter::Linear => wgpu::MipmapFilterMode::Linear,
        }
    }
}

/// Texture sampling configuration.
///
/// Integer-only so it can key a sampler cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub min: Filter,
    pub mag: Filter,
    pub mip: Filter,
    /// 1 disables anisotropic filtering.
    pub max_anisotropy: u8,
}

impl SamplerState {
    const fn uniform(address: AddressMode, filter: Filter) -> Self {
        Self {
            address_u: address,
            address_v: address,
            address_w: address,
            min: filter,
            mag: filter,
            mip: filter,
            max_anisotropy: 1,
        }
    }

    pub const REPEAT_NEAREST: SamplerState = Self::uniform(AddressMode::Repeat, Filter::Nearest);
    pub const REPEAT_LINEAR: SamplerState = Self::uniform(AddressMode::Repeat, Filter::Linear);
    pub const MIRROR_NEAREST: SamplerState = Self::uniform(AddressMode::Mirror, Filter::Nearest);
    pub const MIRROR_LINEAR: SamplerState = Self::uniform(AddressMode::Mirror, Filter::Linear);
    pub const CLAMP_NEAREST: SamplerState = Self::uniform(AddressMode::Clamp, Filter::Nearest);
    pub const CLAMP_LINEAR: SamplerState = Self::uniform(AddressMode::Clamp, Filter::Linear);

    pub const REPEAT_ANISOTROPIC: SamplerState = SamplerState {
        max_anisotropy: 4,
        ..Self::REPEAT_LINEAR
    };

    pub const DEFAULT_2D: SamplerState = Self::CLAMP_LINEAR;
    pub const DEFAULT_3D: SamplerState = Self::REPEAT_ANISOTROPIC;

    pub fn to_wgpu(self, label: Option<&str>) -> wgpu::SamplerDescriptor<'_> {
        // wgpu rejects anisotropy unless every filter is linear.
        let all_linear = self.min == Filter::Linear && self.mag == Filter::Linear && self.mip == Filter::Linear;
        let anisotropy_clamp = if all_linear { self.max_anisotropy.max(1) as u16 } else { 1 };

        wgpu::SamplerDescriptor {
            label,
            address_mode_u: self.address_u.to_wgpu(),
            address_mode_v: self.address_v.to_wgpu(),
            address_mode_w: self.address_w.to_wgpu(),
            mag_filter: self.mag.to_wgpu(),
            min_filter: self.min.to_wgpu(),
            mipmap_filter: self.mip.to_wgpu_mipmap(),
            anisotropy_clamp,
            ..Default::default()
        }
    }
}

impl Default for SamplerState {
    fn default() -> Self {
        Self::DEFAULT_2D
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anisotropy_requires_linear_filters() {
        let mut s = SamplerState::REPEAT_ANISOTROPIC;
        assert_eq!(s.to_wgpu(None).anisotropy_clamp, 4);
        s.mip = Filter::Nearest;
        assert_eq!(s.to_wgpu(None).anisotropy_clamp, 1);
    }

    #[test]
    fn clamp_maps_to_clamp_to_edge() {
        let d = SamplerState::CLAMP_NEAREST.to_wgpu(Some("s"));
        assert_eq!(d.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(d.mag_filter, wgpu::FilterMode::Nearest);
    }
}
