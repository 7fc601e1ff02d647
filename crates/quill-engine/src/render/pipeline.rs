use bytemuck::{Pod, Zeroable};
use glam::Affine2;
use hashbrown::HashMap;

use crate::batch::Vertex2D;
use crate::paint::Color;
use crate::renderer2d::StandardShaders2D;
use crate::resource::{PixelShaderId, VertexShaderId};
use crate::state::{BlendState, RasterizerState};

/// Uniform slots are addressed with dynamic offsets of this stride.
pub(super) const UNIFORM_STRIDE: u64 = 256;

/// Per-draw uniform block of `sprite2d.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct DrawUniform {
    pub row0: [f32; 4],
    pub row1: [f32; 4],
    pub color_mul: [f32; 4],
    pub color_add: [f32; 4],
    pub target_size: [f32; 4],
}

impl DrawUniform {
    pub fn new(transform: &Affine2, color_mul: Color, color_add: Color, width: u32, height: u32) -> Self {
        let m = transform.matrix2;
        let t = transform.translation;
        Self {
            row0: [m.x_axis.x, m.y_axis.x, t.x, 0.0],
            row1: [m.x_axis.y, m.y_axis.y, t.y, 0.0],
            color_mul: color_mul.to_array(),
            color_add: color_add.to_array(),
            target_size: [width as f32, height as f32, 0.0, 0.0],
        }
    }
}

/// Everything a 2D render pipeline depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub blend: BlendState,
    pub rasterizer: RasterizerState,
    pub vs: VertexShaderId,
    pub ps: PixelShaderId,
    pub format: wgpu::TextureFormat,
    /// Drawn without vertex buffers.
    pub null_vertices: bool,
}

impl PipelineKey {
    fn vertex_entry(&self) -> &'static str {
        if self.null_vertices || self.vs == StandardShaders2D::FULLSCREEN_VS {
            "vs_fullscreen"
        } else {
            "vs_main"
        }
    }

    fn fragment_entry(&self) -> &'static str {
        if self.ps == StandardShaders2D::TEXTURE_PS {
            "fs_texture"
        } else {
            "fs_shape"
        }
    }
}

/// Shader module, layouts and the pipelines created from them.
pub(super) struct PipelineCache {
    shader: wgpu::ShaderModule,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    wireframe_supported: bool,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quill sprite2d shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite2d.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill 2d uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill 2d texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quill 2d pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        Self {
            shader,
            uniform_layout,
            texture_layout,
            layout,
            pipelines: HashMap::new(),
            wireframe_supported: device.features().contains(wgpu::Features::POLYGON_MODE_LINE),
        }
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Returns the pipeline for `key`, creating it on first use.
    pub fn get_or_create(&mut self, device: &wgpu::Device, key: PipelineKey) -> &wgpu::RenderPipeline {
        let shader = &self.shader;
        let layout = &self.layout;
        let wireframe_supported = self.wireframe_supported;

        self.pipelines.entry(key).or_insert_with(|| {
            log::debug!(
                "creating 2D pipeline: vs={} ps={} blend={:?} raster={:?} format={:?} null={}",
                key.vs.raw(),
                key.ps.raw(),
                key.blend,
                key.rasterizer,
                key.format,
                key.null_vertices
            );

            let buffers = if key.null_vertices {
                Vec::new()
            } else {
                vec![Vertex2D::layout()]
            };

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("quill 2d pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some(key.vertex_entry()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some(key.fragment_entry()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.format,
                        blend: key.blend.to_wgpu(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: key.rasterizer.to_wgpu(wireframe_supported),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    #[test]
    fn uniform_fits_one_slot() {
        assert!(std::mem::size_of::<DrawUniform>() as u64 <= UNIFORM_STRIDE);
        assert_eq!(std::mem::size_of::<DrawUniform>() % 16, 0);
    }

    #[test]
    fn uniform_rows_hold_the_affine_transform() {
        let m = Affine2::from_scale_angle_translation(Vec2::new(2.0, 3.0), 0.0, Vec2::new(10.0, 20.0));
        let u = DrawUniform::new(&m, Color::WHITE, Color::TRANSPARENT, 640, 480);

        assert_eq!(u.row0, [2.0, 0.0, 10.0, 0.0]);
        assert_eq!(u.row1, [0.0, 3.0, 20.0, 0.0]);
        assert_eq!(u.target_size, [640.0, 480.0, 0.0, 0.0]);
    }

    // ── shader ────────────────────────────────────────────────────────────

    fn sprite_module() -> naga::Module {
        let module = naga::front::wgsl::parse_str(include_str!("shaders/sprite2d.wgsl"))
            .unwrap_or_else(|e| panic!("sprite2d.wgsl does not parse: {e:?}"));
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|e| panic!("sprite2d.wgsl does not validate: {e:?}"));
        module
    }

    #[test]
    fn every_pipeline_entry_point_exists() {
        let module = sprite_module();
        let has = |stage: naga::ShaderStage, name: &str| {
            module.entry_points.iter().any(|ep| ep.stage == stage && ep.name == name)
        };

        for vs in [StandardShaders2D::SPRITE_VS, StandardShaders2D::FULLSCREEN_VS] {
            for ps in [StandardShaders2D::SHAPE_PS, StandardShaders2D::TEXTURE_PS] {
                for null_vertices in [false, true] {
                    let key = PipelineKey {
                        blend: BlendState::DEFAULT_2D,
                        rasterizer: RasterizerState::DEFAULT_2D,
                        vs,
                        ps,
                        format: wgpu::TextureFormat::Rgba8UnormSrgb,
                        null_vertices,
                    };
                    assert!(has(naga::ShaderStage::Vertex, key.vertex_entry()), "{}", key.vertex_entry());
                    assert!(has(naga::ShaderStage::Fragment, key.fragment_entry()), "{}", key.fragment_entry());
                }
            }
        }
    }

    #[test]
    fn sprite_vertex_inputs_match_vertex_layout() {
        let module = sprite_module();
        let vs_main = module
            .entry_points
            .iter()
            .find(|ep| ep.name == "vs_main")
            .expect("vs_main");

        let mut locations = Vec::new();
        for arg in &vs_main.function.arguments {
            match &module.types[arg.ty].inner {
                naga::TypeInner::Struct { members, .. } => {
                    for m in members {
                        if let Some(naga::Binding::Location { location, .. }) = m.binding {
                            locations.push(location);
                        }
                    }
                }
                _ => {
                    if let Some(naga::Binding::Location { location, .. }) = arg.binding {
                        locations.push(location);
                    }
                }
            }
        }
        locations.sort_unstable();

        let layout = Vertex2D::layout();
        let expected: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, expected);
    }

    #[test]
    fn entry_points_follow_shader_ids() {
        let key = PipelineKey {
            blend: BlendState::DEFAULT_2D,
            rasterizer: RasterizerState::DEFAULT_2D,
            vs: StandardShaders2D::SPRITE_VS,
            ps: StandardShaders2D::TEXTURE_PS,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            null_vertices: false,
        };
        assert_eq!(key.vertex_entry(), "vs_main");
        assert_eq!(key.fragment_entry(), "fs_texture");

        let null = PipelineKey {
            null_vertices: true,
            ps: StandardShaders2D::SHAPE_PS,
            ..key
        };
        assert_eq!(null.vertex_entry(), "vs_fullscreen");
        assert_eq!(null.fragment_entry(), "fs_shape");
    }
}
