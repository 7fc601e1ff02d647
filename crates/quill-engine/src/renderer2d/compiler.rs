use glam::{Affine2, Vec4};

use crate::batch::{BatchConfig, BatchDescriptor, BatchError, GeometryBatcher, GeometryWriter, Index, Placement, Vertex2D};
use crate::command::{Command, CommandStream, ConstantBufferCommand, StageStates};
use crate::coords::Rect;
use crate::paint::Color;
use crate::resource::{
    PixelShader, PixelShaderId, RenderTargetId, RenderTexture, Reservations, Texture, TextureId, VertexShader,
    VertexShaderId,
};
use crate::state::{BlendState, ChangeMask, Pushed, RasterizerState, SamplerState, ShaderStage, StateSlot};

use super::kind::Command2DKind;
use super::shapes::StandardShaders2D;

/// Accumulated indexed draw over the current batch.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DrawCommand {
    pub index_count: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramePhase {
    Recording,
    Flushed,
}

/// Frame-start values and batch capacities of a [`Compiler2D`].
#[derive(Debug, Clone)]
pub struct Compiler2DConfig {
    pub batch: BatchConfig,
    pub blend: BlendState,
    pub rasterizer: RasterizerState,
    pub sampler: SamplerState,
    pub scissor: Rect,
    /// `None` covers the whole render target.
    pub viewport: Option<Rect>,
    pub sdf_params: Vec4,
    pub color_mul: Color,
    pub color_add: Color,
    pub vertex_shader: VertexShaderId,
    pub pixel_shader: PixelShaderId,
}

impl Default for Compiler2DConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            blend: BlendState::DEFAULT_2D,
            rasterizer: RasterizerState::DEFAULT_2D,
            sampler: SamplerState::DEFAULT_2D,
            scissor: Rect::default(),
            viewport: None,
            sdf_params: Vec4::new(0.5, 0.5, 0.0, 0.0),
            color_mul: Color::WHITE,
            color_add: Color::TRANSPARENT,
            vertex_shader: StandardShaders2D::SPRITE_VS,
            pixel_shader: StandardShaders2D::SHAPE_PS,
        }
    }
}

/// Deferred 2D render-command compiler.
///
/// Records the draws and state changes of one frame and compiles them into a
/// minimal ordered [`Command`] list. Call [`flush`](Self::flush) once the
/// frame is recorded, read the stream, then [`reset`](Self::reset).
pub struct Compiler2D {
    phase: FramePhase,
    mask: ChangeMask<Command2DKind>,
    stream: CommandStream<Command2DKind>,
    batcher: GeometryBatcher<Vertex2D>,

    draws: Vec<DrawCommand>,
    current_draw: DrawCommand,
    null_draws: Vec<u32>,

    color_mul: StateSlot<Color>,
    color_add: StateSlot<Color>,
    blend: StateSlot<BlendState>,
    rasterizer: StateSlot<RasterizerState>,
    scissor: StateSlot<Rect>,
    viewport: StateSlot<Option<Rect>>,
    sdf_params: StateSlot<Vec4>,
    render_target: StateSlot<RenderTargetId>,
    transform: StateSlot<Affine2>,
    stages: StageStates<Command2DKind>,
    reserved_targets: Reservations<RenderTargetId>,

    local_transform: Affine2,
    camera_transform: Affine2,
    max_scaling: f32,

    pub(super) custom_vs: Option<VertexShader>,
    pub(super) custom_ps: Option<PixelShader>,
}

impl Default for Compiler2D {
    fn default() -> Self {
        Self::new(Compiler2DConfig::default())
    }
}

impl Compiler2D {
    pub fn new(config: Compiler2DConfig) -> Self {
        Self {
            phase: FramePhase::Recording,
            mask: ChangeMask::new(),
            stream: CommandStream::new(),
            batcher: GeometryBatcher::new(config.batch),

            draws: Vec::new(),
            current_draw: DrawCommand::default(),
            null_draws: Vec::new(),

            color_mul: StateSlot::new(config.color_mul),
            color_add: StateSlot::new(config.color_add),
            blend: StateSlot::new(config.blend),
            rasterizer: StateSlot::new(config.rasterizer),
            scissor: StateSlot::new(config.scissor),
            viewport: StateSlot::new(config.viewport),
            sdf_params: StateSlot::new(config.sdf_params),
            render_target: StateSlot::new(RenderTargetId::INVALID),
            transform: StateSlot::new(Affine2::IDENTITY),
            stages: StageStates::new(config.vertex_shader, config.pixel_shader, config.sampler),
            reserved_targets: Reservations::default(),

            local_transform: Affine2::IDENTITY,
            camera_transform: Affine2::IDENTITY,
            max_scaling: 1.0,

            custom_vs: None,
            custom_ps: None,
        }
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Starts a new frame. Current values become the frame-start state;
    /// histories, draws, batches and the stream are cleared.
    pub fn reset(&mut self) {
        self.phase = FramePhase::Recording;
        self.mask.clear_all();
        self.stream.clear();
        self.batcher.reset();

        self.draws.clear();
        self.current_draw = DrawCommand::default();
        self.null_draws.clear();

        self.color_mul.restart();
        self.color_add.restart();
        self.blend.restart();
        self.rasterizer.restart();
        self.scissor.restart();
        self.viewport.restart();
        self.sdf_params.restart();
        self.render_target.restart();
        self.transform.restart();
        self.stages.restart();

        let target = *self.render_target.current();
        self.reserved_targets.retain(|id| id == target);
    }

    /// Completes the frame: emits the open draw and every pending state.
    pub fn flush(&mut self) {
        self.flush_pending();
        self.phase = FramePhase::Flushed;

        log::trace!(
            "2D frame compiled: {} commands, {} draws, {} batches",
            self.stream.len(),
            self.draws.len(),
            self.batcher.batches().len()
        );
    }

    fn flush_pending(&mut self) {
        use Command2DKind as K;

        if self.current_draw.index_count > 0 {
            self.stream.push(K::Draw, self.draws.len() as u32);
            self.draws.push(self.current_draw);
            self.current_draw = DrawCommand::default();
        }

        let mask = &self.mask;
        let stream = &mut self.stream;

        stream.commit_if_dirty(mask, K::ColorMul, &mut self.color_mul);
        stream.commit_if_dirty(mask, K::ColorAdd, &mut self.color_add);
        stream.commit_if_dirty(mask, K::BlendState, &mut self.blend);
        stream.commit_if_dirty(mask, K::RasterizerState, &mut self.rasterizer);
        self.stages.commit_samplers(mask, stream);
        stream.commit_if_dirty(mask, K::ScissorRect, &mut self.scissor);
        stream.commit_if_dirty(mask, K::Viewport, &mut self.viewport);
        stream.commit_if_dirty(mask, K::SdfParams, &mut self.sdf_params);
        stream.commit_if_dirty(mask, K::RenderTarget, &mut self.render_target);
        self.stages.commit_shaders(mask, stream);
        stream.commit_if_dirty(mask, K::Transform, &mut self.transform);
        self.stages.commit_constant_buffer(mask, stream);
        self.stages.commit_textures(mask, stream);

        self.mask.clear_all();
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    fn debug_assert_recording(&self) {
        debug_assert_eq!(self.phase, FramePhase::Recording, "push after flush(); call reset() first");
    }

    /// The compiled stream. Only valid between `flush()` and `reset()`.
    pub fn commands(&self) -> &[Command<Command2DKind>] {
        debug_assert_eq!(self.phase, FramePhase::Flushed, "commands() read while still recording");
        self.stream.as_slice()
    }

    // ── geometry ──────────────────────────────────────────────────────────

    /// Allocates geometry for one shape.
    ///
    /// Emits `UpdateBuffers` when the request opens the frame's first batch
    /// or overflows the current one. The returned slices are valid until the
    /// next request.
    pub fn request_buffer(
        &mut self,
        vertex_count: u32,
        index_count: u32,
    ) -> Result<GeometryWriter<'_, Vertex2D>, BatchError> {
        self.debug_assert_recording();

        let placement = self.batcher.plan(vertex_count, index_count)?;
        match placement {
            Placement::Current => {}
            Placement::Announce(batch) => self.stream.push(Command2DKind::UpdateBuffers, batch),
            Placement::NewBatch(batch) => {
                self.flush_pending();
                self.stream.push(Command2DKind::UpdateBuffers, batch);
            }
        }
        Ok(self.batcher.allocate(placement, vertex_count, index_count))
    }

    /// Draws `index_count` more indices of the current batch.
    pub fn push_draw(&mut self, index_count: u32) {
        self.debug_assert_recording();
        if index_count == 0 {
            return;
        }
        if self.mask.has_state_change() {
            self.flush_pending();
        }
        self.current_draw.index_count += index_count;
    }

    /// Draws `count` vertices without a vertex buffer.
    pub fn push_null_vertices(&mut self, count: u32) {
        self.debug_assert_recording();
        if count == 0 {
            return;
        }
        // The open draw must land before the null draw.
        self.flush_pending();
        self.stream.push(Command2DKind::DrawNull, self.null_draws.len() as u32);
        self.null_draws.push(count);
    }

    // ── state ─────────────────────────────────────────────────────────────

    pub fn push_color_mul(&mut self, color: Color) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::ColorMul, &mut self.color_mul, color);
    }

    pub fn push_color_add(&mut self, color: Color) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::ColorAdd, &mut self.color_add, color);
    }

    pub fn push_blend_state(&mut self, state: BlendState) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::BlendState, &mut self.blend, state);
    }

    pub fn push_rasterizer_state(&mut self, state: RasterizerState) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::RasterizerState, &mut self.rasterizer, state);
    }

    pub fn push_vs_sampler(&mut self, slot: usize, state: SamplerState) {
        self.debug_assert_recording();
        self.stages.push_sampler(&mut self.mask, ShaderStage::Vertex, slot, state);
    }

    pub fn push_ps_sampler(&mut self, slot: usize, state: SamplerState) {
        self.debug_assert_recording();
        self.stages.push_sampler(&mut self.mask, ShaderStage::Pixel, slot, state);
    }

    pub fn push_scissor_rect(&mut self, rect: Rect) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::ScissorRect, &mut self.scissor, rect);
    }

    pub fn push_viewport(&mut self, viewport: Option<Rect>) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::Viewport, &mut self.viewport, viewport);
    }

    pub fn push_sdf_params(&mut self, params: Vec4) {
        self.debug_assert_recording();
        self.mask.push(Command2DKind::SdfParams, &mut self.sdf_params, params);
    }

    /// `None` selects the backend's default target.
    pub fn push_render_target(&mut self, target: Option<&RenderTexture>) {
        self.debug_assert_recording();
        let id = target.map_or(RenderTargetId::INVALID, |t| t.id());
        let pushed = self.mask.push(Command2DKind::RenderTarget, &mut self.render_target, id);
        if let (Pushed::Pending, Some(target)) = (pushed, target) {
            self.reserved_targets.reserve(target);
        }
    }

    pub fn push_standard_vs(&mut self, id: VertexShaderId) {
        self.debug_assert_recording();
        self.stages.push_vertex_shader(&mut self.mask, id);
    }

    pub fn push_custom_vs(&mut self, shader: &VertexShader) {
        self.debug_assert_recording();
        self.stages.push_custom_vertex_shader(&mut self.mask, shader);
    }

    pub fn push_standard_ps(&mut self, id: PixelShaderId) {
        self.debug_assert_recording();
        self.stages.push_pixel_shader(&mut self.mask, id);
    }

    pub fn push_custom_ps(&mut self, shader: &PixelShader) {
        self.debug_assert_recording();
        self.stages.push_custom_pixel_shader(&mut self.mask, shader);
    }

    pub fn push_local_transform(&mut self, local: Affine2) {
        self.debug_assert_recording();
        self.local_transform = local;
        self.push_combined_transform();
    }

    pub fn push_camera_transform(&mut self, camera: Affine2) {
        self.debug_assert_recording();
        self.camera_transform = camera;
        self.push_combined_transform();
    }

    fn push_combined_transform(&mut self) {
        let combined = self.camera_transform * self.local_transform;
        if self.mask.push(Command2DKind::Transform, &mut self.transform, combined) != Pushed::Unchanged {
            self.max_scaling = max_scaling(&combined);
        }
    }

    /// Uploads `data` to constant-buffer `slot` of `stage` before the next draw.
    pub fn push_constant_buffer(&mut self, stage: ShaderStage, slot: u32, data: &[Vec4]) {
        self.debug_assert_recording();
        self.flush_pending();
        self.stages.push_constant_buffer(&mut self.mask, stage, slot, data);
    }

    pub fn push_vs_texture(&mut self, slot: usize, texture: &Texture) {
        self.debug_assert_recording();
        self.stages.push_texture(&mut self.mask, ShaderStage::Vertex, slot, texture);
    }

    pub fn push_vs_texture_unbind(&mut self, slot: usize) {
        self.debug_assert_recording();
        self.stages.push_texture_unbind(&mut self.mask, ShaderStage::Vertex, slot);
    }

    pub fn push_ps_texture(&mut self, slot: usize, texture: &Texture) {
        self.debug_assert_recording();
        self.stages.push_texture(&mut self.mask, ShaderStage::Pixel, slot, texture);
    }

    pub fn push_ps_texture_unbind(&mut self, slot: usize) {
        self.debug_assert_recording();
        self.stages.push_texture_unbind(&mut self.mask, ShaderStage::Pixel, slot);
    }

    // ── compiled data ─────────────────────────────────────────────────────

    #[inline]
    pub fn draw(&self, index: u32) -> DrawCommand {
        self.draws[index as usize]
    }

    #[inline]
    pub fn null_draw(&self, index: u32) -> u32 {
        self.null_draws[index as usize]
    }

    #[inline]
    pub fn color_mul(&self, index: u32) -> Color {
        *self.color_mul.committed(index)
    }

    #[inline]
    pub fn color_add(&self, index: u32) -> Color {
        *self.color_add.committed(index)
    }

    #[inline]
    pub fn blend_state(&self, index: u32) -> BlendState {
        *self.blend.committed(index)
    }

    #[inline]
    pub fn rasterizer_state(&self, index: u32) -> RasterizerState {
        *self.rasterizer.committed(index)
    }

    #[inline]
    pub fn vs_sampler(&self, slot: usize, index: u32) -> SamplerState {
        self.stages.sampler(ShaderStage::Vertex, slot, index)
    }

    #[inline]
    pub fn ps_sampler(&self, slot: usize, index: u32) -> SamplerState {
        self.stages.sampler(ShaderStage::Pixel, slot, index)
    }

    #[inline]
    pub fn scissor_rect(&self, index: u32) -> Rect {
        *self.scissor.committed(index)
    }

    #[inline]
    pub fn viewport(&self, index: u32) -> Option<Rect> {
        *self.viewport.committed(index)
    }

    #[inline]
    pub fn sdf_params(&self, index: u32) -> Vec4 {
        *self.sdf_params.committed(index)
    }

    #[inline]
    pub fn render_target(&self, index: u32) -> RenderTargetId {
        *self.render_target.committed(index)
    }

    #[inline]
    pub fn vertex_shader(&self, index: u32) -> VertexShaderId {
        self.stages.vertex_shader(index)
    }

    #[inline]
    pub fn pixel_shader(&self, index: u32) -> PixelShaderId {
        self.stages.pixel_shader(index)
    }

    #[inline]
    pub fn transform(&self, index: u32) -> Affine2 {
        *self.transform.committed(index)
    }

    #[inline]
    pub fn constant_buffer(&self, index: u32) -> &ConstantBufferCommand {
        self.stages.constant_buffer(index)
    }

    #[inline]
    pub fn constant_data(&self, command: &ConstantBufferCommand) -> &[Vec4] {
        self.stages.constant_data(command)
    }

    #[inline]
    pub fn vs_texture(&self, slot: usize, index: u32) -> TextureId {
        self.stages.texture(ShaderStage::Vertex, slot, index)
    }

    #[inline]
    pub fn ps_texture(&self, slot: usize, index: u32) -> TextureId {
        self.stages.texture(ShaderStage::Pixel, slot, index)
    }

    #[inline]
    pub fn batch(&self, index: u32) -> &BatchDescriptor {
        self.batcher.batch(index)
    }

    #[inline]
    pub fn batches(&self) -> &[BatchDescriptor] {
        self.batcher.batches()
    }

    #[inline]
    pub fn batch_vertices(&self, index: u32) -> &[Vertex2D] {
        self.batcher.batch_vertices(index)
    }

    #[inline]
    pub fn batch_indices(&self, index: u32) -> &[Index] {
        self.batcher.batch_indices(index)
    }

    #[inline]
    pub fn batch_config(&self) -> &BatchConfig {
        self.batcher.config()
    }

    // ── current values ────────────────────────────────────────────────────

    #[inline]
    pub fn current_color_mul(&self) -> Color {
        *self.color_mul.current()
    }

    #[inline]
    pub fn current_color_add(&self) -> Color {
        *self.color_add.current()
    }

    #[inline]
    pub fn current_blend_state(&self) -> BlendState {
        *self.blend.current()
    }

    #[inline]
    pub fn current_rasterizer_state(&self) -> RasterizerState {
        *self.rasterizer.current()
    }

    #[inline]
    pub fn current_ps_sampler(&self, slot: usize) -> SamplerState {
        self.stages.current_sampler(ShaderStage::Pixel, slot)
    }

    #[inline]
    pub fn current_scissor_rect(&self) -> Rect {
        *self.scissor.current()
    }

    #[inline]
    pub fn current_viewport(&self) -> Option<Rect> {
        *self.viewport.current()
    }

    #[inline]
    pub fn current_render_target(&self) -> RenderTargetId {
        *self.render_target.current()
    }

    #[inline]
    pub fn current_vertex_shader(&self) -> VertexShaderId {
        self.stages.current_vertex_shader()
    }

    #[inline]
    pub fn current_pixel_shader(&self) -> PixelShaderId {
        self.stages.current_pixel_shader()
    }

    #[inline]
    pub fn current_ps_texture(&self, slot: usize) -> TextureId {
        self.stages.current_texture(ShaderStage::Pixel, slot)
    }

    #[inline]
    pub fn current_local_transform(&self) -> Affine2 {
        self.local_transform
    }

    #[inline]
    pub fn current_camera_transform(&self) -> Affine2 {
        self.camera_transform
    }

    /// Length of the combined transform's unit diagonal, normalized so
    /// rotations give 1. Used to pick line and outline widths that survive
    /// scaling.
    #[inline]
    pub fn current_max_scaling(&self) -> f32 {
        self.max_scaling
    }

    /// Resources held alive by this frame's bindings.
    pub fn reserved_resource_count(&self) -> usize {
        self.stages.reserved_texture_count() + self.stages.reserved_shader_count() + self.reserved_targets.len()
    }
}

/// Length of the transformed unit diagonal, normalized to 1 for identity.
pub fn max_scaling(transform: &Affine2) -> f32 {
    let m = transform.matrix2;
    (m.x_axis + m.y_axis).length() / std::f32::consts::SQRT_2
}

