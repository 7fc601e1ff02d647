use glam::Vec3;

use crate::paint::Color;

/// Per-draw Phong lighting parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PhongMaterial {
    pub ambient: Vec3,
    pub diffuse: Color,
    pub specular: Vec3,
    pub shininess: f32,
    pub emission: Vec3,
    /// Whether pixel texture slot 0 modulates the diffuse color.
    pub has_texture: bool,
}

impl PhongMaterial {
    pub fn from_diffuse(diffuse: Color) -> Self {
        Self { diffuse, ..Self::default() }
    }
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            diffuse: Color::WHITE,
            specular: Vec3::ZERO,
            shininess: 1.0,
            emission: Vec3::ZERO,
            has_texture: false,
        }
    }
}
