use std::marker::PhantomData;

use glam::Vec4;

use crate::resource::{
    PixelShader, PixelShaderId, Reservations, Texture, TextureId, VertexShader, VertexShaderId,
};
use crate::state::{ChangeMask, MAX_SAMPLER_SLOTS, Pushed, SamplerState, ShaderStage, StateKind, StateSlot};

use super::CommandStream;

/// Categories shared by every renderer that binds shaders, samplers,
/// textures and constant buffers per stage.
pub trait StageKind: StateKind {
    const VERTEX_SHADER: Self;
    const PIXEL_SHADER: Self;
    const CONSTANT_BUFFER: Self;

    fn sampler(stage: ShaderStage, slot: u8) -> Self;
    fn texture(stage: ShaderStage, slot: u8) -> Self;
}

/// A user constant-buffer update recorded for replay.
///
/// `offset` and `num_vectors` address the frame's constant arena in `Vec4`s.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConstantBufferCommand {
    pub stage: ShaderStage,
    pub slot: u32,
    pub offset: u32,
    pub num_vectors: u32,
}

type SlotArray<T> = [[StateSlot<T>; MAX_SAMPLER_SLOTS]; 2];

const STAGES: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Pixel];

/// Shader, sampler, texture and constant-buffer state of the two shader stages.
pub struct StageStates<K> {
    vertex_shader: StateSlot<VertexShaderId>,
    pixel_shader: StateSlot<PixelShaderId>,
    samplers: SlotArray<SamplerState>,
    textures: SlotArray<TextureId>,

    constant_buffers: Vec<ConstantBufferCommand>,
    constants: Vec<Vec4>,

    reserved_textures: Reservations<TextureId>,
    reserved_vertex_shaders: Reservations<VertexShaderId>,
    reserved_pixel_shaders: Reservations<PixelShaderId>,

    _kind: PhantomData<K>,
}

impl<K: StageKind> StageStates<K> {
    pub fn new(vertex_shader: VertexShaderId, pixel_shader: PixelShaderId, sampler: SamplerState) -> Self {
        Self {
            vertex_shader: StateSlot::new(vertex_shader),
            pixel_shader: StateSlot::new(pixel_shader),
            samplers: std::array::from_fn(|_| std::array::from_fn(|_| StateSlot::new(sampler))),
            textures: std::array::from_fn(|_| std::array::from_fn(|_| StateSlot::new(TextureId::INVALID))),
            constant_buffers: Vec::new(),
            constants: Vec::new(),
            reserved_textures: Reservations::default(),
            reserved_vertex_shaders: Reservations::default(),
            reserved_pixel_shaders: Reservations::default(),
            _kind: PhantomData,
        }
    }

    // ── push ──────────────────────────────────────────────────────────────

    pub fn push_vertex_shader(&mut self, mask: &mut ChangeMask<K>, id: VertexShaderId) -> Pushed {
        mask.push(K::VERTEX_SHADER, &mut self.vertex_shader, id)
    }

    pub fn push_custom_vertex_shader(&mut self, mask: &mut ChangeMask<K>, shader: &VertexShader) {
        if self.push_vertex_shader(mask, shader.id()) == Pushed::Pending {
            self.reserved_vertex_shaders.reserve(shader);
        }
    }

    pub fn push_pixel_shader(&mut self, mask: &mut ChangeMask<K>, id: PixelShaderId) -> Pushed {
        mask.push(K::PIXEL_SHADER, &mut self.pixel_shader, id)
    }

    pub fn push_custom_pixel_shader(&mut self, mask: &mut ChangeMask<K>, shader: &PixelShader) {
        if self.push_pixel_shader(mask, shader.id()) == Pushed::Pending {
            self.reserved_pixel_shaders.reserve(shader);
        }
    }

    pub fn push_sampler(&mut self, mask: &mut ChangeMask<K>, stage: ShaderStage, slot: usize, state: SamplerState) {
        debug_assert!(slot < MAX_SAMPLER_SLOTS, "sampler slot {slot} out of range");
        let kind = K::sampler(stage, slot as u8);
        mask.push(kind, &mut self.samplers[stage.index()][slot], state);
    }

    pub fn push_texture(&mut self, mask: &mut ChangeMask<K>, stage: ShaderStage, slot: usize, texture: &Texture) {
        debug_assert!(slot < MAX_SAMPLER_SLOTS, "texture slot {slot} out of range");
        let kind = K::texture(stage, slot as u8);
        if mask.push(kind, &mut self.textures[stage.index()][slot], texture.id()) == Pushed::Pending {
            self.reserved_textures.reserve(texture);
        }
    }

    /// Binds nothing to the slot.
    pub fn push_texture_unbind(&mut self, mask: &mut ChangeMask<K>, stage: ShaderStage, slot: usize) {
        debug_assert!(slot < MAX_SAMPLER_SLOTS, "texture slot {slot} out of range");
        let kind = K::texture(stage, slot as u8);
        mask.push(kind, &mut self.textures[stage.index()][slot], TextureId::INVALID);
    }

    /// Copies `data` into the constant arena and marks the constant buffer dirty.
    ///
    /// The caller flushes first so that the previous update, if any, has
    /// already been emitted.
    pub fn push_constant_buffer(&mut self, mask: &mut ChangeMask<K>, stage: ShaderStage, slot: u32, data: &[Vec4]) {
        let offset = self.constants.len() as u32;
        self.constants.extend_from_slice(data);
        self.constant_buffers.push(ConstantBufferCommand {
            stage,
            slot,
            offset,
            num_vectors: data.len() as u32,
        });
        mask.set(K::CONSTANT_BUFFER);
    }

    // ── commit ────────────────────────────────────────────────────────────

    /// Vertex-stage samplers, then pixel-stage samplers, each in slot order.
    pub fn commit_samplers(&mut self, mask: &ChangeMask<K>, stream: &mut CommandStream<K>) {
        for stage in STAGES {
            for (slot, state) in self.samplers[stage.index()].iter_mut().enumerate() {
                stream.commit_if_dirty(mask, K::sampler(stage, slot as u8), state);
            }
        }
    }

    pub fn commit_shaders(&mut self, mask: &ChangeMask<K>, stream: &mut CommandStream<K>) {
        stream.commit_if_dirty(mask, K::VERTEX_SHADER, &mut self.vertex_shader);
        stream.commit_if_dirty(mask, K::PIXEL_SHADER, &mut self.pixel_shader);
    }

    /// Emits the most recent constant-buffer command.
    pub fn commit_constant_buffer(&mut self, mask: &ChangeMask<K>, stream: &mut CommandStream<K>) {
        if mask.has(K::CONSTANT_BUFFER) && !self.constant_buffers.is_empty() {
            stream.push(K::CONSTANT_BUFFER, (self.constant_buffers.len() - 1) as u32);
        }
    }

    pub fn commit_textures(&mut self, mask: &ChangeMask<K>, stream: &mut CommandStream<K>) {
        for stage in STAGES {
            for (slot, texture) in self.textures[stage.index()].iter_mut().enumerate() {
                stream.commit_if_dirty(mask, K::texture(stage, slot as u8), texture);
            }
        }
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Starts a new frame. Reservations survive only for resources that are
    /// still bound, since those become the frame-start bindings.
    pub fn restart(&mut self) {
        self.vertex_shader.restart();
        self.pixel_shader.restart();
        for stage in self.samplers.iter_mut() {
            stage.iter_mut().for_each(StateSlot::restart);
        }
        for stage in self.textures.iter_mut() {
            stage.iter_mut().for_each(StateSlot::restart);
        }

        let bound: Vec<TextureId> = self
            .textures
            .iter()
            .flatten()
            .map(|slot| *slot.current())
            .collect();
        self.reserved_textures.retain(|id| bound.contains(&id));

        let vs = *self.vertex_shader.current();
        self.reserved_vertex_shaders.retain(|id| id == vs);
        let ps = *self.pixel_shader.current();
        self.reserved_pixel_shaders.retain(|id| id == ps);

        self.constant_buffers.clear();
        self.constants.clear();
    }

    // ── access ────────────────────────────────────────────────────────────

    #[inline]
    pub fn vertex_shader(&self, index: u32) -> VertexShaderId {
        *self.vertex_shader.committed(index)
    }

    #[inline]
    pub fn pixel_shader(&self, index: u32) -> PixelShaderId {
        *self.pixel_shader.committed(index)
    }

    #[inline]
    pub fn sampler(&self, stage: ShaderStage, slot: usize, index: u32) -> SamplerState {
        *self.samplers[stage.index()][slot].committed(index)
    }

    #[inline]
    pub fn texture(&self, stage: ShaderStage, slot: usize, index: u32) -> TextureId {
        *self.textures[stage.index()][slot].committed(index)
    }

    #[inline]
    pub fn constant_buffer(&self, index: u32) -> &ConstantBufferCommand {
        &self.constant_buffers[index as usize]
    }

    /// Arena contents addressed by `command`.
    pub fn constant_data(&self, command: &ConstantBufferCommand) -> &[Vec4] {
        let start = command.offset as usize;
        &self.constants[start..start + command.num_vectors as usize]
    }

    #[inline]
    pub fn current_vertex_shader(&self) -> VertexShaderId {
        *self.vertex_shader.current()
    }

    #[inline]
    pub fn current_pixel_shader(&self) -> PixelShaderId {
        *self.pixel_shader.current()
    }

    #[inline]
    pub fn current_sampler(&self, stage: ShaderStage, slot: usize) -> SamplerState {
        *self.samplers[stage.index()][slot].current()
    }

    #[inline]
    pub fn current_texture(&self, stage: ShaderStage, slot: usize) -> TextureId {
        *self.textures[stage.index()][slot].current()
    }

    pub fn reserved_texture_count(&self) -> usize {
        self.reserved_textures.len()
    }

    pub fn reserved_shader_count(&self) -> usize {
        self.reserved_vertex_shaders.len() + self.reserved_pixel_shaders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Kind {
        Vs,
        Ps,
        Cb,
        Sampler(ShaderStage, u8),
        Texture(ShaderStage, u8),
    }

    impl StateKind for Kind {
        const GEOMETRY_BITS: u64 = 0;

        fn bit(self) -> u32 {
            match self {
                Kind::Vs => 0,
                Kind::Ps => 1,
                Kind::Cb => 2,
                Kind::Sampler(stage, s) => 3 + stage.index() as u32 * 8 + s as u32,
                Kind::Texture(stage, s) => 19 + stage.index() as u32 * 8 + s as u32,
            }
        }
    }

    impl StageKind for Kind {
        const VERTEX_SHADER: Self = Kind::Vs;
        const PIXEL_SHADER: Self = Kind::Ps;
        const CONSTANT_BUFFER: Self = Kind::Cb;

        fn sampler(stage: ShaderStage, slot: u8) -> Self {
            Kind::Sampler(stage, slot)
        }

        fn texture(stage: ShaderStage, slot: u8) -> Self {
            Kind::Texture(stage, slot)
        }
    }

    fn stages() -> StageStates<Kind> {
        StageStates::new(VertexShaderId::new(0), PixelShaderId::new(0), SamplerState::DEFAULT_2D)
    }

    #[test]
    fn samplers_commit_vertex_stage_first() {
        let mut s = stages();
        let mut mask = ChangeMask::new();
        let mut stream = CommandStream::new();

        s.push_sampler(&mut mask, ShaderStage::Pixel, 0, SamplerState::REPEAT_NEAREST);
        s.push_sampler(&mut mask, ShaderStage::Vertex, 2, SamplerState::REPEAT_NEAREST);
        s.commit_samplers(&mask, &mut stream);

        let kinds: Vec<Kind> = stream.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![Kind::Sampler(ShaderStage::Vertex, 2), Kind::Sampler(ShaderStage::Pixel, 0)]
        );
        assert_eq!(s.sampler(ShaderStage::Vertex, 2, 1), SamplerState::REPEAT_NEAREST);
    }

    #[test]
    fn texture_reserved_only_when_pending() {
        let mut s = stages();
        let mut mask = ChangeMask::new();
        let tex = Texture::new(TextureId::new(5));

        s.push_texture(&mut mask, ShaderStage::Pixel, 0, &tex);
        s.push_texture(&mut mask, ShaderStage::Pixel, 0, &tex);
        assert_eq!(s.reserved_texture_count(), 1);
        assert_eq!(tex.ref_count(), 2);

        s.push_texture_unbind(&mut mask, ShaderStage::Pixel, 0);
        assert!(!mask.has(Kind::Texture(ShaderStage::Pixel, 0)));
    }

    #[test]
    fn restart_releases_unbound_textures() {
        let mut s = stages();
        let mut mask = ChangeMask::new();
        let a = Texture::new(TextureId::new(1));
        let b = Texture::new(TextureId::new(2));

        s.push_texture(&mut mask, ShaderStage::Pixel, 0, &a);
        let mut stream = CommandStream::new();
        s.commit_textures(&mask, &mut stream);
        mask.clear_all();
        s.push_texture(&mut mask, ShaderStage::Pixel, 0, &b);

        s.restart();
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 2);
    }

    #[test]
    fn constant_buffer_emits_latest_command() {
        let mut s = stages();
        let mut mask = ChangeMask::new();
        let mut stream = CommandStream::new();

        s.push_constant_buffer(&mut mask, ShaderStage::Pixel, 1, &[Vec4::ONE, Vec4::ZERO]);
        s.commit_constant_buffer(&mask, &mut stream);
        mask.clear_all();
        s.push_constant_buffer(&mut mask, ShaderStage::Vertex, 2, &[Vec4::X]);
        s.commit_constant_buffer(&mask, &mut stream);

        let indices: Vec<u32> = stream.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
        let cb = *s.constant_buffer(1);
        assert_eq!(cb.offset, 2);
        assert_eq!(s.constant_data(&cb), &[Vec4::X]);
    }

    #[test]
    fn custom_shader_is_reserved() {
        let mut s = stages();
        let mut mask = ChangeMask::new();
        let ps = PixelShader::new(PixelShaderId::new(9));
        s.push_custom_pixel_shader(&mut mask, &ps);
        assert_eq!(s.current_pixel_shader(), PixelShaderId::new(9));
        assert_eq!(s.reserved_shader_count(), 1);
    }
}
