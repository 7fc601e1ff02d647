use glam::Vec2;

use crate::batch::Vertex2D;
use crate::paint::Color;
use crate::resource::{PixelShader, PixelShaderId, Texture, VertexShader, VertexShaderId};

use super::compiler::Compiler2D;

/// Ids of the built-in 2D shaders. Custom shaders use ids from
/// [`FIRST_CUSTOM`](Self::FIRST_CUSTOM) upwards.
#[derive(Debug, Copy, Clone)]
pub struct StandardShaders2D;

impl StandardShaders2D {
    /// Pixel-space vertices through the combined transform.
    pub const SPRITE_VS: VertexShaderId = VertexShaderId::new(0);
    /// Vertex-buffer-less full-screen triangle.
    pub const FULLSCREEN_VS: VertexShaderId = VertexShaderId::new(1);
    /// Vertex color only.
    pub const SHAPE_PS: PixelShaderId = PixelShaderId::new(0);
    /// Vertex color times pixel texture slot 0.
    pub const TEXTURE_PS: PixelShaderId = PixelShaderId::new(1);

    pub const FIRST_CUSTOM: u32 = 16;
}

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

impl Compiler2D {
    /// Replaces the standard vertex shader of shape helpers; `None` restores it.
    pub fn set_custom_vs(&mut self, shader: Option<VertexShader>) {
        self.custom_vs = shader;
    }

    /// Replaces the standard pixel shader of shape helpers; `None` restores it.
    pub fn set_custom_ps(&mut self, shader: Option<PixelShader>) {
        self.custom_ps = shader;
    }

    fn bind_shape_shaders(&mut self, standard_ps: PixelShaderId) {
        match self.custom_vs.clone() {
            Some(vs) => self.push_custom_vs(&vs),
            None => self.push_standard_vs(StandardShaders2D::SPRITE_VS),
        }
        match self.custom_ps.clone() {
            Some(ps) => self.push_custom_ps(&ps),
            None => self.push_standard_ps(standard_ps),
        }
    }

    /// Writes one quad (`corners` clockwise from top-left) and draws it.
    ///
    /// Returns `false` when the shape was dropped.
    fn add_quad(&mut self, corners: [Vec2; 4], uvs: [Vec2; 4], color: Color) -> bool {
        let color = color.to_array();
        let mut w = match self.request_buffer(4, 6) {
            Ok(w) => w,
            Err(err) => {
                log::debug!("quad dropped: {err}");
                return false;
            }
        };
        for ((v, p), uv) in w.vertices.iter_mut().zip(corners).zip(uvs) {
            *v = Vertex2D::new(p.to_array(), uv.to_array(), color);
        }
        w.set_indices(&QUAD_INDICES);
        self.push_draw(6);
        true
    }

    /// Solid axis-aligned rectangle.
    pub fn add_rect(&mut self, min: Vec2, size: Vec2, color: Color) -> bool {
        if size.x <= 0.0 || size.y <= 0.0 {
            return false;
        }
        self.bind_shape_shaders(StandardShaders2D::SHAPE_PS);
        let max = min + size;
        self.add_quad(
            [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)],
            [Vec2::ZERO; 4],
            color,
        )
    }

    pub fn add_triangle(&mut self, points: [Vec2; 3], color: Color) -> bool {
        self.bind_shape_shaders(StandardShaders2D::SHAPE_PS);
        let color = color.to_array();
        let mut w = match self.request_buffer(3, 3) {
            Ok(w) => w,
            Err(err) => {
                log::debug!("triangle dropped: {err}");
                return false;
            }
        };
        for (v, p) in w.vertices.iter_mut().zip(points) {
            *v = Vertex2D::new(p.to_array(), [0.0; 2], color);
        }
        w.set_indices(&[0, 1, 2]);
        self.push_draw(3);
        true
    }

    /// Line segment of `thickness` pixels, widened around its center line.
    pub fn add_line(&mut self, from: Vec2, to: Vec2, thickness: f32, color: Color) -> bool {
        let Some(dir) = (to - from).try_normalize() else { return false };
        if thickness <= 0.0 {
            return false;
        }
        self.bind_shape_shaders(StandardShaders2D::SHAPE_PS);
        let n = dir.perp() * (thickness * 0.5);
        self.add_quad([from + n, to + n, to - n, from - n], [Vec2::ZERO; 4], color)
    }

    /// Textured rectangle sampling `uv_min..uv_max` of `texture`, tinted by `tint`.
    pub fn add_textured_quad(
        &mut self,
        texture: &Texture,
        min: Vec2,
        size: Vec2,
        uv_min: Vec2,
        uv_max: Vec2,
        tint: Color,
    ) -> bool {
        if size.x <= 0.0 || size.y <= 0.0 {
            return false;
        }
        self.bind_shape_shaders(StandardShaders2D::TEXTURE_PS);
        self.push_ps_texture(0, texture);
        let max = min + size;
        self.add_quad(
            [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)],
            [uv_min, Vec2::new(uv_max.x, uv_min.y), uv_max, Vec2::new(uv_min.x, uv_max.y)],
            tint,
        )
    }

    /// Copies `texture` over the whole target with a vertex-buffer-less triangle.
    pub fn add_fullscreen_texture(&mut self, texture: &Texture) {
        self.push_standard_vs(StandardShaders2D::FULLSCREEN_VS);
        self.push_standard_ps(StandardShaders2D::TEXTURE_PS);
        self.push_ps_texture(0, texture);
        self.push_null_vertices(3);
    }
}
