use glam::{Affine2, Vec2, Vec4};

use super::*;
use crate::batch::BatchConfig;
use crate::coords::Rect;
use crate::paint::Color;
use crate::resource::{RenderTargetId, RenderTexture, Texture, TextureId};
use crate::state::{BlendState, RasterizerState, SamplerState, ShaderStage};

use Command2DKind as K;

fn kinds(c: &Compiler2D) -> Vec<Command2DKind> {
    c.commands().iter().map(|cmd| cmd.kind).collect()
}

/// Writes `vertex_count` vertices and as many indices, then draws them.
fn emit(c: &mut Compiler2D, vertex_count: u32) {
    let w = c.request_buffer(vertex_count, vertex_count).unwrap();
    let base = w.base_index;
    for (i, idx) in w.indices.iter_mut().enumerate() {
        *idx = base + i as u16;
    }
    c.push_draw(vertex_count);
}

/// Small deterministic generator for mixed push sequences.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }
}

// ── scenarios ─────────────────────────────────────────────────────────────

#[test]
fn repeated_texture_merges_draws() {
    let mut c = Compiler2D::default();
    let t1 = Texture::new(TextureId::new(1));

    c.push_blend_state(BlendState::ADDITIVE);
    c.push_ps_texture(0, &t1);
    c.push_draw(6);
    c.push_ps_texture(0, &t1);
    c.push_draw(6);
    c.flush();

    assert_eq!(kinds(&c), vec![K::BlendState, K::PsTexture(0), K::Draw]);
    assert_eq!(c.draw(0).index_count, 12);
    assert_eq!(c.blend_state(1), BlendState::ADDITIVE);
    assert_eq!(c.ps_texture(0, 1), TextureId::new(1));
}

#[test]
fn alternating_transforms_split_draws() {
    let mut c = Compiler2D::default();
    let m1 = Affine2::from_translation(Vec2::new(5.0, 0.0));
    let m2 = Affine2::from_scale(Vec2::splat(3.0));

    for m in [m1, m2, m1] {
        c.push_local_transform(m);
        c.push_draw(3);
    }
    c.flush();

    assert_eq!(
        kinds(&c),
        vec![K::Transform, K::Draw, K::Transform, K::Draw, K::Transform, K::Draw]
    );
    let indices: Vec<u32> = c.commands().iter().filter(|e| e.kind == K::Transform).map(|e| e.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(c.transform(3), m1);
}

#[test]
fn overflowing_gpu_buffer_opens_second_batch() {
    let mut c = Compiler2D::default();
    assert_eq!(c.batch_config().gpu_vertex_capacity, 65_536);

    for _ in 0..66 {
        emit(&mut c, 1_000);
    }
    c.flush();

    let updates: Vec<u32> = c
        .commands()
        .iter()
        .filter(|e| e.kind == K::UpdateBuffers)
        .map(|e| e.index)
        .collect();
    // ceil(66_000 / 65_536) batches, one of them opened at a boundary.
    assert_eq!(updates, vec![0, 1]);
    assert_eq!(c.batches().len(), 2);
    assert_eq!(c.batch(0).vertex_count, 65_000);
    assert_eq!(c.batch(1).vertex_offset, 65_000);
    assert_eq!(c.batch(1).vertex_count, 1_000);

    assert_eq!(kinds(&c), vec![K::UpdateBuffers, K::Draw, K::UpdateBuffers, K::Draw]);
    assert_eq!(c.draw(0).index_count, 65_000);
    assert_eq!(c.draw(1).index_count, 1_000);
    assert_eq!(c.batch_indices(1)[0], 0);
}

#[test]
fn update_buffer_count_matches_capacity() {
    let mut c = Compiler2D::new(Compiler2DConfig {
        batch: BatchConfig {
            gpu_vertex_capacity: 100,
            ..BatchConfig::default()
        },
        ..Compiler2DConfig::default()
    });
    let total = 1_050u32;
    for _ in 0..total / 10 {
        emit(&mut c, 10);
    }
    c.flush();

    let expected = total.div_ceil(100) as usize;
    let updates = c.commands().iter().filter(|e| e.kind == K::UpdateBuffers).count();
    let boundaries = c.commands().iter().filter(|e| e.kind == K::UpdateBuffers && e.index > 0).count();
    assert_eq!(updates, expected);
    assert_eq!(boundaries, expected - 1);
}

#[test]
fn frame_without_geometry_is_empty() {
    let mut c = Compiler2D::default();
    c.flush();
    assert!(c.commands().is_empty());
}

// ── dedup ─────────────────────────────────────────────────────────────────

#[test]
fn round_trip_collapses() {
    let mut c = Compiler2D::default();
    c.push_blend_state(BlendState::ADDITIVE);
    c.push_blend_state(BlendState::DEFAULT_2D);
    c.push_draw(3);
    c.flush();
    assert_eq!(kinds(&c), vec![K::Draw]);
}

#[test]
fn identical_values_across_flushes_are_both_committed() {
    let mut c = Compiler2D::default();
    for state in [BlendState::ADDITIVE, BlendState::OPAQUE, BlendState::ADDITIVE] {
        c.push_blend_state(state);
        c.push_draw(3);
    }
    c.flush();

    let blends: Vec<BlendState> = c
        .commands()
        .iter()
        .filter(|e| e.kind == K::BlendState)
        .map(|e| c.blend_state(e.index))
        .collect();
    assert_eq!(blends, vec![BlendState::ADDITIVE, BlendState::OPAQUE, BlendState::ADDITIVE]);
}

#[test]
fn mixed_sequence_never_rebinds_same_value() {
    let mut c = Compiler2D::default();
    let blends = [BlendState::DEFAULT_2D, BlendState::ADDITIVE, BlendState::OPAQUE];
    let scissors = [Rect::new(0, 0, 10, 10), Rect::new(5, 5, 10, 10)];
    let mut rng = Lcg(7);

    for _ in 0..500 {
        match rng.next() % 4 {
            0 => c.push_blend_state(blends[rng.next() as usize % blends.len()]),
            1 => c.push_scissor_rect(scissors[rng.next() as usize % scissors.len()]),
            2 => c.push_color_mul(if rng.next() % 2 == 0 { Color::WHITE } else { Color::BLACK }),
            _ => c.push_draw(3),
        }
    }
    c.flush();

    let mut bound_blend = c.blend_state(0);
    let mut bound_scissor = c.scissor_rect(0);
    let mut bound_mul = c.color_mul(0);
    let mut previous: Option<Command2DKind> = None;
    for e in c.commands() {
        match e.kind {
            K::BlendState => {
                assert_ne!(c.blend_state(e.index), bound_blend);
                bound_blend = c.blend_state(e.index);
            }
            K::ScissorRect => {
                assert_ne!(c.scissor_rect(e.index), bound_scissor);
                bound_scissor = c.scissor_rect(e.index);
            }
            K::ColorMul => {
                assert_ne!(c.color_mul(e.index), bound_mul);
                bound_mul = c.color_mul(e.index);
            }
            K::Draw => assert_ne!(previous, Some(K::Draw), "adjacent draws must merge"),
            other => panic!("unexpected {other:?}"),
        }
        previous = Some(e.kind);
    }
}

#[test]
fn history_indices_are_monotonic_per_kind() {
    let mut c = Compiler2D::default();
    let mut rng = Lcg(42);
    for _ in 0..200 {
        if rng.next() % 2 == 0 {
            c.push_sdf_params(Vec4::splat((rng.next() % 3) as f32));
        } else {
            c.push_draw(6);
        }
    }
    c.flush();

    let mut last: Option<u32> = None;
    for e in c.commands().iter().filter(|e| e.kind == K::SdfParams) {
        if let Some(prev) = last {
            assert!(e.index > prev);
        }
        last = Some(e.index);
    }
}

// ── ordering ──────────────────────────────────────────────────────────────

#[test]
fn open_draw_precedes_new_state() {
    let mut c = Compiler2D::default();
    c.push_draw(6);
    c.push_rasterizer_state(RasterizerState::WIREFRAME_CULL_NONE);
    c.push_ps_sampler(2, SamplerState::REPEAT_NEAREST);
    c.push_draw(3);
    c.flush();

    assert_eq!(kinds(&c), vec![K::Draw, K::RasterizerState, K::PsSampler(2), K::Draw]);
    assert_eq!(c.ps_sampler(2, 1), SamplerState::REPEAT_NEAREST);
}

#[test]
fn flush_emits_states_in_fixed_order() {
    let mut c = Compiler2D::default();
    let t = Texture::new(TextureId::new(4));
    c.push_ps_texture(1, &t);
    c.push_local_transform(Affine2::from_angle(0.5));
    c.push_viewport(Some(Rect::new(0, 0, 64, 64)));
    c.push_blend_state(BlendState::ADDITIVE);
    c.push_color_add(Color::new(0.1, 0.0, 0.0, 0.0));
    c.push_vs_sampler(0, SamplerState::CLAMP_NEAREST);
    c.push_draw(3);
    c.flush();

    assert_eq!(
        kinds(&c),
        vec![
            K::ColorAdd,
            K::BlendState,
            K::VsSampler(0),
            K::Viewport,
            K::Transform,
            K::PsTexture(1),
            K::Draw,
        ]
    );
}

#[test]
fn null_vertices_follow_open_draw() {
    let mut c = Compiler2D::default();
    c.push_draw(6);
    c.push_null_vertices(3);
    c.push_draw(6);
    c.flush();

    assert_eq!(kinds(&c), vec![K::Draw, K::DrawNull, K::Draw]);
    assert_eq!(c.null_draw(0), 3);
}

#[test]
fn constant_buffers_are_emitted_in_push_order() {
    let mut c = Compiler2D::default();
    c.push_constant_buffer(ShaderStage::Pixel, 1, &[Vec4::ONE]);
    c.push_draw(3);
    c.push_constant_buffer(ShaderStage::Pixel, 1, &[Vec4::ZERO, Vec4::ONE]);
    c.push_draw(3);
    c.flush();

    assert_eq!(kinds(&c), vec![K::ConstantBuffer, K::Draw, K::ConstantBuffer, K::Draw]);
    let cb = *c.constant_buffer(1);
    assert_eq!(cb.slot, 1);
    assert_eq!(c.constant_data(&cb), &[Vec4::ZERO, Vec4::ONE]);
}

#[test]
fn pending_state_after_last_draw_is_still_emitted() {
    let mut c = Compiler2D::default();
    c.push_draw(3);
    c.push_blend_state(BlendState::OPAQUE);
    c.flush();
    assert_eq!(kinds(&c), vec![K::Draw, K::BlendState]);
}

#[test]
fn flush_twice_adds_nothing() {
    let mut c = Compiler2D::default();
    c.push_draw(3);
    c.flush();
    c.flush();
    assert_eq!(kinds(&c), vec![K::Draw]);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "push after flush")]
fn push_after_flush_is_rejected() {
    let mut c = Compiler2D::default();
    c.flush();
    c.push_draw(3);
}

#[test]
fn oversized_request_leaves_stream_untouched() {
    let mut c = Compiler2D::default();
    assert!(c.request_buffer(70_000, 3).is_err());
    c.flush();
    assert!(c.commands().is_empty());
}

// ── transforms ────────────────────────────────────────────────────────────

#[test]
fn local_transform_applies_before_camera() {
    let mut c = Compiler2D::default();
    c.push_local_transform(Affine2::from_translation(Vec2::new(10.0, 0.0)));
    c.push_camera_transform(Affine2::from_scale(Vec2::splat(2.0)));
    c.push_draw(3);
    c.flush();

    let combined = c.transform(1);
    assert_eq!(combined.transform_point2(Vec2::new(1.0, 0.0)), Vec2::new(22.0, 0.0));
    assert!((c.current_max_scaling() - 2.0).abs() < 1e-5);
}

#[test]
fn rotation_keeps_unit_scaling() {
    let m = Affine2::from_angle(std::f32::consts::FRAC_PI_2);
    assert!((max_scaling(&m) - 1.0).abs() < 1e-5);
}

// ── frame lifecycle ───────────────────────────────────────────────────────

#[test]
fn reset_carries_current_values_forward() {
    let mut c = Compiler2D::default();
    c.push_blend_state(BlendState::ADDITIVE);
    emit(&mut c, 4);
    c.push_scissor_rect(Rect::new(1, 2, 3, 4));
    c.flush();
    let batch_count = c.batches().len();

    c.reset();
    c.reset();
    c.flush();

    assert!(c.commands().is_empty());
    assert_eq!(c.blend_state(0), BlendState::ADDITIVE);
    assert_eq!(c.scissor_rect(0), Rect::new(1, 2, 3, 4));
    assert_eq!(c.batches().len(), batch_count);
    assert!(c.batches()[0].is_empty());
}

#[test]
fn reset_matches_fresh_compiler_output() {
    let record = |c: &mut Compiler2D| {
        c.push_blend_state(BlendState::OPAQUE);
        emit(c, 4);
        c.push_color_mul(Color::BLACK);
        emit(c, 4);
        c.flush();
        kinds(c)
    };

    let mut fresh = Compiler2D::default();
    let first = record(&mut fresh);

    let mut reused = Compiler2D::default();
    reused.push_draw(3);
    reused.flush();
    reused.reset();
    assert_eq!(record(&mut reused), first);
}

#[test]
fn bound_resources_are_held_until_unbound() {
    let mut c = Compiler2D::default();
    let t1 = Texture::new(TextureId::new(1));
    let t2 = Texture::new(TextureId::new(2));
    let rt = RenderTexture::new(RenderTargetId::new(7));

    c.push_ps_texture(0, &t1);
    c.push_draw(3);
    c.push_ps_texture(0, &t2);
    c.push_render_target(Some(&rt));
    c.push_draw(3);
    c.flush();

    assert_eq!(t1.ref_count(), 2);
    assert_eq!(c.reserved_resource_count(), 3);

    c.reset();
    // t1 is no longer bound; t2 and the target start the next frame.
    assert_eq!(t1.ref_count(), 1);
    assert_eq!(t2.ref_count(), 2);
    assert_eq!(rt.ref_count(), 2);
    assert_eq!(c.current_render_target(), RenderTargetId::new(7));

    c.push_render_target(None);
    c.push_ps_texture_unbind(0);
    c.push_draw(3);
    c.flush();
    c.reset();
    assert_eq!(t2.ref_count(), 1);
    assert_eq!(rt.ref_count(), 1);
}
