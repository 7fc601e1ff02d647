use glam::{Mat4, Vec3, Vec4};

use super::*;
use crate::batch::BatchConfig;
use crate::paint::Color;
use crate::resource::{Mesh, MeshId, Texture, TextureId};
use crate::state::{BlendState, DepthStencilState, ShaderStage};

use Command3DKind as K;

fn kinds(c: &Compiler3D) -> Vec<Command3DKind> {
    c.commands().iter().map(|cmd| cmd.kind).collect()
}

// ── mesh draws ────────────────────────────────────────────────────────────

#[test]
fn mesh_draws_are_never_merged() {
    let mut c = Compiler3D::default();
    let mesh = Mesh::new(MeshId::new(3));
    let red = PhongMaterial::from_diffuse(Color::rgb(1.0, 0.0, 0.0));

    c.draw_mesh(&mesh, 36, PhongMaterial::default());
    c.draw_mesh(&mesh, 36, red);
    c.flush();

    assert_eq!(kinds(&c), vec![K::Mesh, K::Draw, K::Draw]);
    assert_eq!(c.mesh(1), MeshId::new(3));
    assert_eq!(
        c.draw(1),
        Draw3DCommand {
            start_index: 0,
            index_count: 36,
            instance_count: 1
        }
    );
    assert_eq!(c.draw_material(0), &PhongMaterial::default());
    assert_eq!(c.draw_material(1).diffuse, Color::rgb(1.0, 0.0, 0.0));
}

#[test]
fn empty_mesh_draw_is_ignored() {
    let mut c = Compiler3D::default();
    c.push_draw(0, 0, PhongMaterial::default(), 1);
    c.flush();
    assert!(c.commands().is_empty());
    assert!(!c.has_draw());
}

#[test]
fn state_between_mesh_draws_is_flushed() {
    let mut c = Compiler3D::default();
    let mesh = Mesh::new(MeshId::new(1));

    c.push_local_transform(Mat4::from_translation(Vec3::X));
    c.draw_mesh(&mesh, 6, PhongMaterial::default());
    c.push_local_transform(Mat4::from_translation(Vec3::Y));
    c.push_depth_stencil_state(DepthStencilState::DISABLED);
    c.push_draw(0, 6, PhongMaterial::default(), 4);
    c.flush();

    assert_eq!(
        kinds(&c),
        vec![
            K::LocalTransform,
            K::Mesh,
            K::Draw,
            K::DepthStencilState,
            K::LocalTransform,
            K::Draw
        ]
    );
    assert_eq!(c.local_transform(2), Mat4::from_translation(Vec3::Y));
    assert_eq!(c.draw(1).instance_count, 4);
}

// ── lines ─────────────────────────────────────────────────────────────────

#[test]
fn lines_merge_into_one_draw() {
    let mut c = Compiler3D::default();
    for i in 0..4 {
        assert!(c.add_line3d(Vec3::ZERO, Vec3::splat(i as f32), Color::WHITE));
    }
    c.flush();

    assert_eq!(kinds(&c), vec![K::UpdateLine3DBuffers, K::DrawLine3D]);
    assert_eq!(c.line_draw(0).index_count, 8);
    assert_eq!(c.line_batch(0).vertex_count, 8);
    assert_eq!(&c.line_batch_indices(0)[..4], &[0u16, 1, 2, 3]);
}

#[test]
fn open_line_draw_closes_before_mesh_draw() {
    let mut c = Compiler3D::default();
    let mesh = Mesh::new(MeshId::new(2));

    c.add_line3d(Vec3::ZERO, Vec3::X, Color::WHITE);
    c.draw_mesh(&mesh, 3, PhongMaterial::default());
    c.add_line3d(Vec3::ZERO, Vec3::Y, Color::BLACK);
    c.flush();

    assert_eq!(
        kinds(&c),
        vec![K::UpdateLine3DBuffers, K::DrawLine3D, K::Mesh, K::Draw, K::DrawLine3D]
    );
    assert_eq!(c.line_draw(0).index_count, 2);
    assert_eq!(c.line_draw(1).index_count, 2);
}

#[test]
fn line_batch_overflow_announces_new_buffer() {
    let mut c = Compiler3D::new(Compiler3DConfig {
        batch: BatchConfig {
            gpu_vertex_capacity: 4,
            ..BatchConfig::default()
        },
        ..Compiler3DConfig::default()
    });
    for _ in 0..3 {
        c.add_line3d(Vec3::ZERO, Vec3::Z, Color::WHITE);
    }
    c.flush();

    assert_eq!(
        kinds(&c),
        vec![
            K::UpdateLine3DBuffers,
            K::DrawLine3D,
            K::UpdateLine3DBuffers,
            K::DrawLine3D
        ]
    );
    assert_eq!(c.line_batches().len(), 2);
    assert_eq!(c.line_draw(0).index_count, 4);
    assert_eq!(c.line_draw(1).index_count, 2);
    assert_eq!(c.line_batch_indices(1), &[0u16, 1]);
}

// ── ordering ──────────────────────────────────────────────────────────────

#[test]
fn flush_emits_states_in_fixed_order() {
    let mut c = Compiler3D::default();
    let mesh = Mesh::new(MeshId::new(1));
    let tex = Texture::new(TextureId::new(9));

    c.push_sun_color(Vec3::ONE);
    c.push_mesh(&mesh);
    c.push_ps_texture(0, &tex);
    c.push_uv_transform(Vec4::new(2.0, 2.0, 0.0, 0.0));
    c.push_eye_position(Vec3::new(0.0, 1.0, -5.0));
    c.push_camera_transform(Mat4::from_scale(Vec3::splat(0.5)));
    c.push_depth_stencil_state(DepthStencilState::DISABLED);
    c.push_blend_state(BlendState::NON_PREMULTIPLIED);
    c.push_draw(0, 3, PhongMaterial::default(), 1);
    c.flush();

    assert_eq!(
        kinds(&c),
        vec![
            K::BlendState,
            K::DepthStencilState,
            K::CameraTransform,
            K::EyePosition,
            K::UvTransform,
            K::PsTexture(0),
            K::Mesh,
            K::SunColor,
            K::Draw
        ]
    );
}

#[test]
fn constant_buffer_precedes_textures() {
    let mut c = Compiler3D::default();
    let tex = Texture::new(TextureId::new(4));

    c.push_ps_texture(1, &tex);
    c.push_constant_buffer(ShaderStage::Pixel, 1, &[Vec4::ONE]);
    c.push_draw(0, 3, PhongMaterial::default(), 1);
    c.flush();

    // The constant-buffer push flushes the texture first.
    assert_eq!(kinds(&c), vec![K::PsTexture(1), K::ConstantBuffer, K::Draw]);
    let cb = *c.constant_buffer(0);
    assert_eq!(cb.slot, 1);
    assert_eq!(c.constant_data(&cb), &[Vec4::ONE]);
}

#[test]
fn frame_without_draws_is_empty() {
    let mut c = Compiler3D::default();
    c.push_sun_direction(Vec3::Y);
    c.push_sun_direction(Compiler3DConfig::default().sun_direction);
    c.flush();
    assert!(c.commands().is_empty());
    assert!(!c.has_draw());
}

// ── frame lifecycle ───────────────────────────────────────────────────────

#[test]
fn reset_carries_state_and_releases_meshes() {
    let mut c = Compiler3D::default();
    let a = Mesh::new(MeshId::new(1));
    let b = Mesh::new(MeshId::new(2));

    c.push_mesh(&a);
    c.push_draw(0, 3, PhongMaterial::default(), 1);
    c.push_mesh(&b);
    c.push_draw(0, 3, PhongMaterial::default(), 1);
    c.push_global_ambient_color(Vec3::ZERO);
    c.flush();
    assert_eq!(c.reserved_resource_count(), 2);

    c.reset();
    assert_eq!(c.reserved_resource_count(), 1);
    assert_eq!(c.current_mesh(), MeshId::new(2));
    assert_eq!(c.mesh(0), MeshId::new(2));
    assert_eq!(c.global_ambient_color(0), Vec3::ZERO);
    assert_eq!(c.line_batches().len(), 1);
    assert!(c.line_batches()[0].is_empty());

    c.push_mesh(&b);
    c.push_draw(0, 3, PhongMaterial::default(), 1);
    c.flush();
    assert_eq!(kinds(&c), vec![K::Draw]);
}
