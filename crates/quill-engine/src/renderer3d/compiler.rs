use glam::{Mat4, Vec3, Vec4};

use crate::batch::{BatchConfig, BatchDescriptor, BatchError, GeometryBatcher, GeometryWriter, Index, LineVertex3D, Placement};
use crate::command::{Command, CommandStream, ConstantBufferCommand, StageStates};
use crate::coords::Rect;
use crate::paint::Color;
use crate::renderer2d::FramePhase;
use crate::resource::{
    Mesh, MeshId, PixelShader, PixelShaderId, RenderTargetId, RenderTexture, Reservations, Texture, TextureId,
    VertexShader, VertexShaderId,
};
use crate::state::{
    BlendState, ChangeMask, DepthStencilState, Pushed, RasterizerState, SamplerState, ShaderStage, StateSlot,
};

use super::kind::Command3DKind;
use super::material::PhongMaterial;

/// One mesh draw. Unlike 2D draws these are never merged.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Draw3DCommand {
    pub start_index: u32,
    pub index_count: u32,
    pub instance_count: u32,
}

/// Accumulated line-list draw over the current line batch.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DrawLine3DCommand {
    pub index_count: u32,
}

/// Built-in 3D shader ids.
#[derive(Debug, Copy, Clone)]
pub struct StandardShaders3D;

impl StandardShaders3D {
    pub const FORWARD_VS: VertexShaderId = VertexShaderId::new(0);
    pub const FORWARD_PS: PixelShaderId = PixelShaderId::new(0);
    pub const LINE_VS: VertexShaderId = VertexShaderId::new(1);
    pub const LINE_PS: PixelShaderId = PixelShaderId::new(1);
}

/// Frame-start values and line-batch capacities of a [`Compiler3D`].
#[derive(Debug, Clone)]
pub struct Compiler3DConfig {
    pub batch: BatchConfig,
    pub blend: BlendState,
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub sampler: SamplerState,
    pub scissor: Rect,
    pub viewport: Option<Rect>,
    pub vertex_shader: VertexShaderId,
    pub pixel_shader: PixelShaderId,
    pub global_ambient: Vec3,
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
}

impl Default for Compiler3DConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            blend: BlendState::DEFAULT_3D,
            rasterizer: RasterizerState::DEFAULT_3D,
            depth_stencil: DepthStencilState::DEFAULT_3D,
            sampler: SamplerState::DEFAULT_3D,
            scissor: Rect::default(),
            viewport: None,
            vertex_shader: StandardShaders3D::FORWARD_VS,
            pixel_shader: StandardShaders3D::FORWARD_PS,
            global_ambient: Vec3::splat(0.4),
            sun_direction: Vec3::new(0.5, 2.0, -1.5).normalize(),
            sun_color: Vec3::splat(0.75),
        }
    }
}

/// Deferred 3D render-command compiler.
///
/// Mesh draws are emitted one entry per call with their material; 3D lines
/// are batched and merged like 2D geometry.
pub struct Compiler3D {
    phase: FramePhase,
    mask: ChangeMask<Command3DKind>,
    stream: CommandStream<Command3DKind>,
    line_batcher: GeometryBatcher<LineVertex3D>,

    draws: Vec<Draw3DCommand>,
    materials: Vec<PhongMaterial>,
    line_draws: Vec<DrawLine3DCommand>,
    current_line_draw: DrawLine3DCommand,

    blend: StateSlot<BlendState>,
    rasterizer: StateSlot<RasterizerState>,
    depth_stencil: StateSlot<DepthStencilState>,
    scissor: StateSlot<Rect>,
    viewport: StateSlot<Option<Rect>>,
    render_target: StateSlot<RenderTargetId>,
    camera_transform: StateSlot<Mat4>,
    eye_position: StateSlot<Vec3>,
    local_transform: StateSlot<Mat4>,
    uv_transform: StateSlot<Vec4>,
    mesh: StateSlot<MeshId>,
    global_ambient: StateSlot<Vec3>,
    sun_direction: StateSlot<Vec3>,
    sun_color: StateSlot<Vec3>,
    stages: StageStates<Command3DKind>,

    reserved_meshes: Reservations<MeshId>,
    reserved_targets: Reservations<RenderTargetId>,
}

impl Default for Compiler3D {
    fn default() -> Self {
        Self::new(Compiler3DConfig::default())
    }
}

impl Compiler3D {
    pub fn new(config: Compiler3DConfig) -> Self {
        Self {
            phase: FramePhase::Recording,
            mask: ChangeMask::new(),
            stream: CommandStream::new(),
            line_batcher: GeometryBatcher::new(config.batch),

            draws: Vec::new(),
            materials: Vec::new(),
            line_draws: Vec::new(),
            current_line_draw: DrawLine3DCommand::default(),

            blend: StateSlot::new(config.blend),
            rasterizer: StateSlot::new(config.rasterizer),
            depth_stencil: StateSlot::new(config.depth_stencil),
            scissor: StateSlot::new(config.scissor),
            viewport: StateSlot::new(config.viewport),
            render_target: StateSlot::new(RenderTargetId::INVALID),
            camera_transform: StateSlot::new(Mat4::IDENTITY),
            eye_position: StateSlot::new(Vec3::ZERO),
            local_transform: StateSlot::new(Mat4::IDENTITY),
            uv_transform: StateSlot::new(Vec4::new(1.0, 1.0, 0.0, 0.0)),
            mesh: StateSlot::new(MeshId::INVALID),
            global_ambient: StateSlot::new(config.global_ambient),
            sun_direction: StateSlot::new(config.sun_direction),
            sun_color: StateSlot::new(config.sun_color),
            stages: StageStates::new(config.vertex_shader, config.pixel_shader, config.sampler),

            reserved_meshes: Reservations::default(),
            reserved_targets: Reservations::default(),
        }
    }

    // ── frame ─────────────────────────────────────────────────────────────

    pub fn reset(&mut self) {
        self.phase = FramePhase::Recording;
        self.mask.clear_all();
        self.stream.clear();
        self.line_batcher.reset();

        self.draws.clear();
        self.materials.clear();
        self.line_draws.clear();
        self.current_line_draw = DrawLine3DCommand::default();

        self.blend.restart();
        self.rasterizer.restart();
        self.depth_stencil.restart();
        self.scissor.restart();
        self.viewport.restart();
        self.render_target.restart();
        self.camera_transform.restart();
        self.eye_position.restart();
        self.local_transform.restart();
        self.uv_transform.restart();
        self.mesh.restart();
        self.global_ambient.restart();
        self.sun_direction.restart();
        self.sun_color.restart();
        self.stages.restart();

        let mesh = *self.mesh.current();
        self.reserved_meshes.retain(|id| id == mesh);
        let target = *self.render_target.current();
        self.reserved_targets.retain(|id| id == target);
    }

    pub fn flush(&mut self) {
        self.flush_pending();
        self.phase = FramePhase::Flushed;

        log::trace!(
            "3D frame compiled: {} commands, {} mesh draws, {} line draws",
            self.stream.len(),
            self.draws.len(),
            self.line_draws.len()
        );
    }

    fn flush_pending(&mut self) {
        use Command3DKind as K;

        if self.current_line_draw.index_count > 0 {
            self.stream.push(K::DrawLine3D, self.line_draws.len() as u32);
            self.line_draws.push(self.current_line_draw);
            self.current_line_draw = DrawLine3DCommand::default();
        }

        let mask = &self.mask;
        let stream = &mut self.stream;

        stream.commit_if_dirty(mask, K::BlendState, &mut self.blend);
        stream.commit_if_dirty(mask, K::RasterizerState, &mut self.rasterizer);
        stream.commit_if_dirty(mask, K::DepthStencilState, &mut self.depth_stencil);
        self.stages.commit_samplers(mask, stream);
        stream.commit_if_dirty(mask, K::ScissorRect, &mut self.scissor);
        stream.commit_if_dirty(mask, K::Viewport, &mut self.viewport);
        stream.commit_if_dirty(mask, K::RenderTarget, &mut self.render_target);
        self.stages.commit_shaders(mask, stream);
        stream.commit_if_dirty(mask, K::CameraTransform, &mut self.camera_transform);
        stream.commit_if_dirty(mask, K::EyePosition, &mut self.eye_position);
        stream.commit_if_dirty(mask, K::LocalTransform, &mut self.local_transform);
        stream.commit_if_dirty(mask, K::UvTransform, &mut self.uv_transform);
        self.stages.commit_constant_buffer(mask, stream);
        self.stages.commit_textures(mask, stream);
        stream.commit_if_dirty(mask, K::Mesh, &mut self.mesh);
        stream.commit_if_dirty(mask, K::GlobalAmbientColor, &mut self.global_ambient);
        stream.commit_if_dirty(mask, K::SunDirection, &mut self.sun_direction);
        stream.commit_if_dirty(mask, K::SunColor, &mut self.sun_color);

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

    pub fn commands(&self) -> &[Command<Command3DKind>] {
        debug_assert_eq!(self.phase, FramePhase::Flushed, "commands() read while still recording");
        self.stream.as_slice()
    }

    /// True if the frame draws anything.
    pub fn has_draw(&self) -> bool {
        !self.draws.is_empty() || !self.line_draws.is_empty() || self.current_line_draw.index_count > 0
    }

    // ── geometry ──────────────────────────────────────────────────────────

    /// Allocates line-list geometry; see [`Compiler2D::request_buffer`](crate::renderer2d::Compiler2D::request_buffer).
    pub fn request_line_buffer(
        &mut self,
        vertex_count: u32,
        index_count: u32,
    ) -> Result<GeometryWriter<'_, LineVertex3D>, BatchError> {
        self.debug_assert_recording();

        let placement = self.line_batcher.plan(vertex_count, index_count)?;
        match placement {
            Placement::Current => {}
            Placement::Announce(batch) => self.stream.push(Command3DKind::UpdateLine3DBuffers, batch),
            Placement::NewBatch(batch) => {
                self.flush_pending();
                self.stream.push(Command3DKind::UpdateLine3DBuffers, batch);
            }
        }
        Ok(self.line_batcher.allocate(placement, vertex_count, index_count))
    }

    /// Draws `index_count` indices of the bound mesh with `material`.
    pub fn push_draw(&mut self, start_index: u32, index_count: u32, material: PhongMaterial, instance_count: u32) {
        self.debug_assert_recording();
        debug_assert!(instance_count >= 1, "instance_count must be at least 1");
        if index_count == 0 {
            return;
        }

        // An open line draw was recorded earlier and must replay first.
        if self.mask.has_state_change() || self.current_line_draw.index_count > 0 {
            self.flush_pending();
        }

        self.stream.push(Command3DKind::Draw, self.draws.len() as u32);
        self.draws.push(Draw3DCommand {
            start_index,
            index_count,
            instance_count,
        });
        self.materials.push(material);
    }

    pub fn push_draw_line3d(&mut self, index_count: u32) {
        self.debug_assert_recording();
        if index_count == 0 {
            return;
        }
        if self.mask.has_state_change() {
            self.flush_pending();
        }
        self.current_line_draw.index_count += index_count;
    }

    // ── state ─────────────────────────────────────────────────────────────

    pub fn push_blend_state(&mut self, state: BlendState) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::BlendState, &mut self.blend, state);
    }

    pub fn push_rasterizer_state(&mut self, state: RasterizerState) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::RasterizerState, &mut self.rasterizer, state);
    }

    pub fn push_depth_stencil_state(&mut self, state: DepthStencilState) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::DepthStencilState, &mut self.depth_stencil, state);
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
        self.mask.push(Command3DKind::ScissorRect, &mut self.scissor, rect);
    }

    pub fn push_viewport(&mut self, viewport: Option<Rect>) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::Viewport, &mut self.viewport, viewport);
    }

    pub fn push_render_target(&mut self, target: Option<&RenderTexture>) {
        self.debug_assert_recording();
        let id = target.map_or(RenderTargetId::INVALID, |t| t.id());
        let pushed = self.mask.push(Command3DKind::RenderTarget, &mut self.render_target, id);
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

    /// View-projection matrix.
    pub fn push_camera_transform(&mut self, view_proj: Mat4) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::CameraTransform, &mut self.camera_transform, view_proj);
    }

    pub fn push_eye_position(&mut self, eye: Vec3) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::EyePosition, &mut self.eye_position, eye);
    }

    pub fn push_local_transform(&mut self, local: Mat4) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::LocalTransform, &mut self.local_transform, local);
    }

    /// `(scale_u, scale_v, offset_u, offset_v)`.
    pub fn push_uv_transform(&mut self, uv: Vec4) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::UvTransform, &mut self.uv_transform, uv);
    }

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

    pub fn push_mesh(&mut self, mesh: &Mesh) {
        self.debug_assert_recording();
        if self.mask.push(Command3DKind::Mesh, &mut self.mesh, mesh.id()) == Pushed::Pending {
            self.reserved_meshes.reserve(mesh);
        }
    }

    pub fn push_global_ambient_color(&mut self, color: Vec3) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::GlobalAmbientColor, &mut self.global_ambient, color);
    }

    pub fn push_sun_direction(&mut self, direction: Vec3) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::SunDirection, &mut self.sun_direction, direction);
    }

    pub fn push_sun_color(&mut self, color: Vec3) {
        self.debug_assert_recording();
        self.mask.push(Command3DKind::SunColor, &mut self.sun_color, color);
    }

    // ── helpers ───────────────────────────────────────────────────────────

    /// Binds `mesh` and draws all of its `index_count` indices.
    pub fn draw_mesh(&mut self, mesh: &Mesh, index_count: u32, material: PhongMaterial) {
        self.push_mesh(mesh);
        self.push_draw(0, index_count, material, 1);
    }

    /// One line segment. Returns `false` when the segment was dropped.
    pub fn add_line3d(&mut self, from: Vec3, to: Vec3, color: Color) -> bool {
        let color = color.to_array();
        let mut w = match self.request_line_buffer(2, 2) {
            Ok(w) => w,
            Err(err) => {
                log::debug!("line3d dropped: {err}");
                return false;
            }
        };
        w.vertices[0] = LineVertex3D::new(from, color);
        w.vertices[1] = LineVertex3D::new(to, color);
        w.set_indices(&[0, 1]);
        self.push_draw_line3d(2);
        true
    }

    // ── compiled data ─────────────────────────────────────────────────────

    #[inline]
    pub fn draw(&self, index: u32) -> Draw3DCommand {
        self.draws[index as usize]
    }

    #[inline]
    pub fn draw_material(&self, index: u32) -> &PhongMaterial {
        &self.materials[index as usize]
    }

    #[inline]
    pub fn line_draw(&self, index: u32) -> DrawLine3DCommand {
        self.line_draws[index as usize]
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
    pub fn depth_stencil_state(&self, index: u32) -> DepthStencilState {
        *self.depth_stencil.committed(index)
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
    pub fn camera_transform(&self, index: u32) -> Mat4 {
        *self.camera_transform.committed(index)
    }

    #[inline]
    pub fn eye_position(&self, index: u32) -> Vec3 {
        *self.eye_position.committed(index)
    }

    #[inline]
    pub fn local_transform(&self, index: u32) -> Mat4 {
        *self.local_transform.committed(index)
    }

    #[inline]
    pub fn uv_transform(&self, index: u32) -> Vec4 {
        *self.uv_transform.committed(index)
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
    pub fn mesh(&self, index: u32) -> MeshId {
        *self.mesh.committed(index)
    }

    #[inline]
    pub fn global_ambient_color(&self, index: u32) -> Vec3 {
        *self.global_ambient.committed(index)
    }

    #[inline]
    pub fn sun_direction(&self, index: u32) -> Vec3 {
        *self.sun_direction.committed(index)
    }

    #[inline]
    pub fn sun_color(&self, index: u32) -> Vec3 {
        *self.sun_color.committed(index)
    }

    #[inline]
    pub fn line_batch(&self, index: u32) -> &BatchDescriptor {
        self.line_batcher.batch(index)
    }

    #[inline]
    pub fn line_batches(&self) -> &[BatchDescriptor] {
        self.line_batcher.batches()
    }

    #[inline]
    pub fn line_batch_vertices(&self, index: u32) -> &[LineVertex3D] {
        self.line_batcher.batch_vertices(index)
    }

    #[inline]
    pub fn line_batch_indices(&self, index: u32) -> &[Index] {
        self.line_batcher.batch_indices(index)
    }

    #[inline]
    pub fn batch_config(&self) -> &BatchConfig {
        self.line_batcher.config()
    }

    // ── current values ────────────────────────────────────────────────────

    #[inline]
    pub fn current_blend_state(&self) -> BlendState {
        *self.blend.current()
    }

    #[inline]
    pub fn current_depth_stencil_state(&self) -> DepthStencilState {
        *self.depth_stencil.current()
    }

    #[inline]
    pub fn current_camera_transform(&self) -> Mat4 {
        *self.camera_transform.current()
    }

    #[inline]
    pub fn current_local_transform(&self) -> Mat4 {
        *self.local_transform.current()
    }

    #[inline]
    pub fn current_mesh(&self) -> MeshId {
        *self.mesh.current()
    }

    #[inline]
    pub fn current_render_target(&self) -> RenderTargetId {
        *self.render_target.current()
    }

    #[inline]
    pub fn current_ps_texture(&self, slot: usize) -> TextureId {
        self.stages.current_texture(ShaderStage::Pixel, slot)
    }

    /// Resources held alive by this frame's bindings.
    pub fn reserved_resource_count(&self) -> usize {
        self.stages.reserved_texture_count()
            + self.stages.reserved_shader_count()
            + self.reserved_meshes.len()
            + self.reserved_targets.len()
    }
}
