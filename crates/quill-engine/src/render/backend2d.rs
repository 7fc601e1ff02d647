use anyhow::{Context, Result, ensure};
use glam::Affine2;
use hashbrown::HashMap;
use wgpu::util::DeviceExt;

use crate::batch::{BatchConfig, Index, Upload, UploadPlanner, Vertex2D, padded_index_count};
use crate::coords::Rect;
use crate::paint::Color;
use crate::renderer2d::{Compiler2D, StandardShaders2D};
use crate::replay::{Backend2D, IndexedDraw, Op2D, ReplayStats, replay_2d};
use crate::resource::{PixelShaderId, RenderTargetId, TextureId, VertexShaderId};
use crate::state::{BlendState, RasterizerState, SamplerState, ShaderStage};

use super::ctx::{RenderCtx, TargetView};
use super::pipeline::{DrawUniform, PipelineCache, PipelineKey, UNIFORM_STRIDE};

/// Configuration of a [`WgpuBackend2D`].
#[derive(Debug, Clone)]
pub struct WgpuBackend2DConfig {
    /// Format of every color target the backend draws into.
    pub target_format: wgpu::TextureFormat,
    /// Uniform slots per frame. A slot is consumed by each draw that follows
    /// a transform, color or viewport change.
    pub uniform_capacity: u32,
}

impl Default for WgpuBackend2DConfig {
    fn default() -> Self {
        Self {
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            uniform_capacity: 4_096,
        }
    }
}

/// State most recently applied by the replay, resolved at draw time.
#[derive(Debug, Copy, Clone)]
struct Bindings {
    blend: BlendState,
    rasterizer: RasterizerState,
    vs: VertexShaderId,
    ps: PixelShaderId,
    sampler: SamplerState,
    texture: TextureId,
    scissor: Rect,
    viewport: Option<Rect>,
    render_target: RenderTargetId,
    transform: Affine2,
    color_mul: Color,
    color_add: Color,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            blend: BlendState::DEFAULT_2D,
            rasterizer: RasterizerState::DEFAULT_2D,
            vs: StandardShaders2D::SPRITE_VS,
            ps: StandardShaders2D::SHAPE_PS,
            sampler: SamplerState::DEFAULT_2D,
            texture: TextureId::INVALID,
            scissor: Rect::default(),
            viewport: None,
            render_target: RenderTargetId::INVALID,
            transform: Affine2::IDENTITY,
            color_mul: Color::WHITE,
            color_add: Color::TRANSPARENT,
        }
    }
}

/// What the open render pass already has bound.
#[derive(Debug, Default)]
struct PassCache {
    pipeline: Option<PipelineKey>,
    texture: Option<(TextureId, SamplerState)>,
    uniform: Option<u32>,
    geometry: bool,
}

struct Frame {
    encoder: wgpu::CommandEncoder,
    target: TargetView,
    /// Consumed by the first pass on the main target.
    clear: Option<Color>,
}

/// Ops this backend accepts but cannot express; each is reported once.
#[derive(Debug, Default)]
struct Warned {
    extra_slots: bool,
    sdf: bool,
    constant_buffers: bool,
    custom_shaders: bool,
}

/// wgpu implementation of [`Backend2D`].
///
/// Geometry lives in two fixed GPU buffers sized from [`BatchConfig`]. Each
/// batch upload is copied in from a staging buffer inside the frame's
/// encoder, so render passes are split around uploads and later batches
/// never overwrite data that earlier draws still read.
///
/// Only pixel texture/sampler slot 0 is bound; the standard shaders read
/// nothing else.
pub struct WgpuBackend2D {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: WgpuBackend2DConfig,

    pipelines: PipelineCache,
    samplers: HashMap<SamplerState, wgpu::Sampler>,
    texture_groups: HashMap<(TextureId, SamplerState), wgpu::BindGroup>,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u32,
    index_buffer: wgpu::Buffer,
    index_capacity: u32,

    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    uniform_cursor: u32,
    uniform_slot: Option<u32>,

    white: wgpu::TextureView,
    textures: HashMap<TextureId, wgpu::TextureView>,
    targets: HashMap<RenderTargetId, TargetView>,

    bindings: Bindings,
    frame: Option<Frame>,
    pass: Option<wgpu::RenderPass<'static>>,
    pass_cache: PassCache,

    warned: Warned,
}

impl WgpuBackend2D {
    pub fn new(ctx: &RenderCtx<'_>, config: WgpuBackend2DConfig, batch: &BatchConfig) -> Self {
        let device = ctx.device;
        let pipelines = PipelineCache::new(device);

        let vertex_capacity = batch.gpu_vertex_capacity;
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quill 2d vertex buffer"),
            size: vertex_capacity as u64 * std::mem::size_of::<Vertex2D>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_capacity = padded_index_count(batch.gpu_index_capacity);
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quill 2d index buffer"),
            size: index_capacity as u64 * std::mem::size_of::<Index>() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_capacity = config.uniform_capacity.max(1);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quill 2d uniform ring"),
            size: uniform_capacity as u64 * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quill 2d uniform bind group"),
            layout: &pipelines.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });

        let white = device
            .create_texture_with_data(
                ctx.queue,
                &wgpu::TextureDescriptor {
                    label: Some("quill white texture"),
                    size: wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &[255, 255, 255, 255],
            )
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            device: device.clone(),
            queue: ctx.queue.clone(),
            config: WgpuBackend2DConfig {
                uniform_capacity,
                ..config
            },

            pipelines,
            samplers: HashMap::new(),
            texture_groups: HashMap::new(),

            vertex_buffer,
            vertex_capacity,
            index_buffer,
            index_capacity,

            uniform_buffer,
            uniform_group,
            uniform_cursor: 0,
            uniform_slot: None,

            white,
            textures: HashMap::new(),
            targets: HashMap::new(),

            bindings: Bindings::default(),
            frame: None,
            pass: None,
            pass_cache: PassCache::default(),

            warned: Warned::default(),
        }
    }

    // ── resources ─────────────────────────────────────────────────────────

    /// Makes `view` available to `PsTexture` bindings of `id`.
    pub fn register_texture(&mut self, id: TextureId, view: wgpu::TextureView) {
        self.textures.insert(id, view);
        self.texture_groups.retain(|(texture, _), _| *texture != id);
    }

    pub fn unregister_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
        self.texture_groups.retain(|(texture, _), _| *texture != id);
    }

    /// Makes `target` available to `RenderTarget` bindings of `id`.
    pub fn register_render_target(&mut self, id: RenderTargetId, target: TargetView) {
        self.targets.insert(id, target);
    }

    pub fn unregister_render_target(&mut self, id: RenderTargetId) {
        self.targets.remove(&id);
    }

    #[inline]
    pub fn config(&self) -> &WgpuBackend2DConfig {
        &self.config
    }

    #[inline]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Starts recording into `target`; `clear` fills it before the first draw.
    pub fn begin_frame(&mut self, target: TargetView, clear: Option<Color>) {
        if self.frame.is_some() {
            log::warn!("begin_frame() while a frame is open; discarding it");
            self.pass = None;
        }

        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quill 2d frame encoder"),
        });
        self.frame = Some(Frame { encoder, target, clear });
        self.bindings = Bindings::default();
        self.uniform_cursor = 0;
        self.uniform_slot = None;
    }

    /// Closes the frame and returns its command buffer for submission.
    pub fn end_frame(&mut self) -> Result<wgpu::CommandBuffer> {
        self.end_pass();
        let mut frame = self.frame.take().context("end_frame() without begin_frame()")?;

        // A frame without draws still clears its target.
        if let Some(color) = frame.clear.take() {
            let _pass = begin_pass(&mut frame.encoder, &frame.target.view, Some(color));
        }

        log::trace!("2D frame used {} uniform slots", self.uniform_cursor);
        Ok(frame.encoder.finish())
    }

    /// Replays `compiled` into `target` and submits the result.
    pub fn render(
        &mut self,
        compiled: &Compiler2D,
        planner: &mut UploadPlanner,
        target: TargetView,
        clear: Option<Color>,
    ) -> Result<ReplayStats> {
        self.begin_frame(target, clear);
        let stats = match replay_2d(compiled, planner, self) {
            Ok(stats) => stats,
            Err(err) => {
                self.pass = None;
                self.frame = None;
                return Err(err);
            }
        };
        let commands = self.end_frame()?;
        self.queue.submit(std::iter::once(commands));
        Ok(stats)
    }

    fn end_pass(&mut self) {
        self.pass = None;
        self.pass_cache = PassCache::default();
    }

    // ── ops ───────────────────────────────────────────────────────────────

    fn upload(&mut self, upload: &Upload, vertices: &[Vertex2D], indices: &[Index]) -> Result<()> {
        ensure!(
            upload.info.base_vertex_location as usize + vertices.len() <= self.vertex_capacity as usize,
            "batch {} does not fit the GPU vertex buffer",
            upload.batch
        );
        ensure!(
            upload.info.start_index_location + upload.padded_index_count <= self.index_capacity,
            "batch {} does not fit the GPU index buffer",
            upload.batch
        );

        // Copies cannot be recorded while a pass is open.
        self.end_pass();
        let frame = self.frame.as_mut().context("upload outside begin_frame()/end_frame()")?;

        if !vertices.is_empty() {
            let staging = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quill 2d vertex staging"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
            let stride = std::mem::size_of::<Vertex2D>() as u64;
            frame.encoder.copy_buffer_to_buffer(
                &staging,
                0,
                &self.vertex_buffer,
                upload.info.base_vertex_location as u64 * stride,
                std::mem::size_of_val(vertices) as u64,
            );
        }

        if !indices.is_empty() {
            let padded = padded_indices(indices);
            let staging = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quill 2d index staging"),
                contents: bytemuck::cast_slice(&padded),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
            let stride = std::mem::size_of::<Index>() as u64;
            frame.encoder.copy_buffer_to_buffer(
                &staging,
                0,
                &self.index_buffer,
                upload.info.start_index_location as u64 * stride,
                std::mem::size_of_val(padded.as_slice()) as u64,
            );
        }

        log::trace!(
            "uploaded batch {}: {} vertices at {}, {} indices at {} ({:?}/{:?})",
            upload.batch,
            vertices.len(),
            upload.info.base_vertex_location,
            indices.len(),
            upload.info.start_index_location,
            upload.vertex_hint,
            upload.index_hint
        );
        Ok(())
    }

    fn draw_indexed(&mut self, draw: IndexedDraw) -> Result<()> {
        if !self.prepare_draw(false)? {
            return Ok(());
        }
        let pass = self.pass.as_mut().context("no open render pass")?;
        pass.draw_indexed(draw.start_index..draw.start_index + draw.index_count, draw.base_vertex, 0..1);
        Ok(())
    }

    fn draw_null(&mut self, vertex_count: u32) -> Result<()> {
        if !self.prepare_draw(true)? {
            return Ok(());
        }
        let pass = self.pass.as_mut().context("no open render pass")?;
        pass.draw(0..vertex_count, 0..1);
        Ok(())
    }

    /// Binds everything the next draw reads. Returns `false` when the draw is
    /// fully scissored away.
    fn prepare_draw(&mut self, null_vertices: bool) -> Result<bool> {
        let (width, height) = self.target_size()?;
        let b = self.bindings;

        let scissor = if b.rasterizer.scissor_enable {
            match b.scissor.to_scissor(width, height) {
                Some(s) => s,
                None => return Ok(false),
            }
        } else {
            (0, 0, width, height)
        };
        let viewport = match b.viewport {
            Some(v) if !v.is_empty() => v,
            Some(_) => return Ok(false),
            None => Rect::from_size(width as i32, height as i32),
        };

        let slot = self.uniform_slot(viewport)?;
        self.ensure_texture_group(b.texture, b.sampler)?;
        if self.pass.is_none() {
            self.open_pass()?;
        }

        let key = PipelineKey {
            blend: b.blend,
            rasterizer: b.rasterizer,
            vs: b.vs,
            ps: b.ps,
            format: self.config.target_format,
            null_vertices,
        };
        let pipeline = self.pipelines.get_or_create(&self.device, key);
        let pass = self.pass.as_mut().context("no open render pass")?;

        if self.pass_cache.pipeline != Some(key) {
            pass.set_pipeline(pipeline);
            self.pass_cache.pipeline = Some(key);
        }
        if self.pass_cache.uniform != Some(slot) {
            pass.set_bind_group(0, &self.uniform_group, &[(slot as u64 * UNIFORM_STRIDE) as u32]);
            self.pass_cache.uniform = Some(slot);
        }
        if self.pass_cache.texture != Some((b.texture, b.sampler)) {
            let group = self
                .texture_groups
                .get(&(b.texture, b.sampler))
                .context("texture bind group missing")?;
            pass.set_bind_group(1, group, &[]);
            self.pass_cache.texture = Some((b.texture, b.sampler));
        }
        if !null_vertices && !self.pass_cache.geometry {
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            self.pass_cache.geometry = true;
        }

        let (sx, sy, sw, sh) = scissor;
        pass.set_scissor_rect(sx, sy, sw, sh);
        pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.w as f32,
            viewport.h as f32,
            0.0,
            1.0,
        );
        Ok(true)
    }

    fn target_size(&self) -> Result<(u32, u32)> {
        let id = self.bindings.render_target;
        if !id.is_valid() {
            let frame = self.frame.as_ref().context("draw outside begin_frame()/end_frame()")?;
            return Ok((frame.target.width, frame.target.height));
        }
        let target = self
            .targets
            .get(&id)
            .with_context(|| format!("render target {} is not registered", id.raw()))?;
        Ok((target.width, target.height))
    }

    fn open_pass(&mut self) -> Result<()> {
        let id = self.bindings.render_target;
        let frame = self.frame.as_mut().context("draw outside begin_frame()/end_frame()")?;

        let pass = if id.is_valid() {
            let target = self
                .targets
                .get(&id)
                .with_context(|| format!("render target {} is not registered", id.raw()))?;
            begin_pass(&mut frame.encoder, &target.view, None)
        } else {
            let clear = frame.clear.take();
            begin_pass(&mut frame.encoder, &frame.target.view, clear)
        };

        self.pass = Some(pass);
        self.pass_cache = PassCache::default();
        Ok(())
    }

    /// Slot holding the uniform for the current transform, colors and viewport.
    fn uniform_slot(&mut self, viewport: Rect) -> Result<u32> {
        if let Some(slot) = self.uniform_slot {
            return Ok(slot);
        }
        ensure!(
            self.uniform_cursor < self.config.uniform_capacity,
            "uniform ring exhausted after {} draws; raise uniform_capacity",
            self.uniform_cursor
        );

        let b = &self.bindings;
        let uniform = DrawUniform::new(
            &b.transform,
            b.color_mul,
            b.color_add,
            viewport.w as u32,
            viewport.h as u32,
        );
        let slot = self.uniform_cursor;
        self.queue.write_buffer(
            &self.uniform_buffer,
            slot as u64 * UNIFORM_STRIDE,
            bytemuck::bytes_of(&uniform),
        );

        self.uniform_cursor += 1;
        self.uniform_slot = Some(slot);
        Ok(slot)
    }

    fn ensure_texture_group(&mut self, texture: TextureId, sampler: SamplerState) -> Result<()> {
        if self.texture_groups.contains_key(&(texture, sampler)) {
            return Ok(());
        }

        let view = if texture.is_valid() {
            self.textures
                .get(&texture)
                .with_context(|| format!("texture {} is not registered", texture.raw()))?
        } else {
            &self.white
        };
        let device = &self.device;
        let wgpu_sampler = self
            .samplers
            .entry(sampler)
            .or_insert_with(|| device.create_sampler(&sampler.to_wgpu(Some("quill 2d sampler"))));

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quill 2d texture bind group"),
            layout: &self.pipelines.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(wgpu_sampler),
                },
            ],
        });
        self.texture_groups.insert((texture, sampler), group);
        Ok(())
    }

    fn invalidate_uniform(&mut self) {
        self.uniform_slot = None;
    }
}

impl Backend2D for WgpuBackend2D {
    fn apply(&mut self, op: Op2D<'_>) -> Result<()> {
        match op {
            Op2D::Upload {
                upload,
                vertices,
                indices,
            } => self.upload(&upload, vertices, indices)?,
            Op2D::Draw(draw) => self.draw_indexed(draw)?,
            Op2D::DrawNull { vertex_count } => self.draw_null(vertex_count)?,

            Op2D::ColorMul(color) => {
                self.bindings.color_mul = color;
                self.invalidate_uniform();
            }
            Op2D::ColorAdd(color) => {
                self.bindings.color_add = color;
                self.invalidate_uniform();
            }
            Op2D::Transform(transform) => {
                self.bindings.transform = transform;
                self.invalidate_uniform();
            }
            Op2D::Viewport(viewport) => {
                self.bindings.viewport = viewport;
                self.invalidate_uniform();
            }

            Op2D::Blend(state) => self.bindings.blend = state,
            Op2D::Rasterizer(state) => self.bindings.rasterizer = state,
            Op2D::Scissor(rect) => self.bindings.scissor = rect,

            Op2D::RenderTarget(id) => {
                if id != self.bindings.render_target {
                    self.end_pass();
                    self.bindings.render_target = id;
                    self.invalidate_uniform();
                }
            }

            Op2D::VertexShader(id) => {
                self.bindings.vs = supported_vs(id).unwrap_or_else(|| {
                    warn_once(&mut self.warned.custom_shaders, "custom 2D shaders are not supported; using standard ones");
                    StandardShaders2D::SPRITE_VS
                });
            }
            Op2D::PixelShader(id) => {
                self.bindings.ps = supported_ps(id).unwrap_or_else(|| {
                    warn_once(&mut self.warned.custom_shaders, "custom 2D shaders are not supported; using standard ones");
                    StandardShaders2D::SHAPE_PS
                });
            }

            Op2D::Sampler {
                stage: ShaderStage::Pixel,
                slot: 0,
                state,
            } => self.bindings.sampler = state,
            Op2D::Texture {
                stage: ShaderStage::Pixel,
                slot: 0,
                texture,
            } => self.bindings.texture = texture,
            Op2D::Sampler { .. } | Op2D::Texture { .. } => {
                warn_once(&mut self.warned.extra_slots, "only pixel texture/sampler slot 0 is bound; other slots ignored");
            }

            Op2D::SdfParams(_) => {
                warn_once(&mut self.warned.sdf, "SDF parameters ignored; no SDF shader is loaded");
            }
            Op2D::ConstantBuffer { .. } => {
                warn_once(&mut self.warned.constant_buffers, "user constant buffers ignored by the 2D backend");
            }
        }
        Ok(())
    }
}

fn begin_pass(
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    clear: Option<Color>,
) -> wgpu::RenderPass<'static> {
    let load = match clear {
        Some(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
        None => wgpu::LoadOp::Load,
    };
    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quill 2d pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
        .forget_lifetime()
}

fn warn_once(flag: &mut bool, message: &str) {
    if !*flag {
        log::debug!("WgpuBackend2D: {message}");
        *flag = true;
    }
}

fn supported_vs(id: VertexShaderId) -> Option<VertexShaderId> {
    [StandardShaders2D::SPRITE_VS, StandardShaders2D::FULLSCREEN_VS]
        .contains(&id)
        .then_some(id)
}

fn supported_ps(id: PixelShaderId) -> Option<PixelShaderId> {
    [StandardShaders2D::SHAPE_PS, StandardShaders2D::TEXTURE_PS]
        .contains(&id)
        .then_some(id)
}

/// Index data rounded up to whole 4-byte words for `copy_buffer_to_buffer`.
fn padded_indices(indices: &[Index]) -> Vec<Index> {
    let mut padded = indices.to_vec();
    padded.resize(padded_index_count(indices.len() as u32) as usize, 0);
    padded
}
