use anyhow::{Context, ensure};

use crate::batch::UploadPlanner;
use crate::command::{Command, StageKind};
use crate::renderer2d::FramePhase;
use crate::renderer3d::{Command3DKind, Compiler3D};
use crate::state::{MAX_SAMPLER_SLOTS, ShaderStage};

use super::{Backend3D, BatchCursor, Op3D, ReplayStats};

fn frame_start_kinds() -> impl Iterator<Item = Command3DKind> {
    use Command3DKind as K;

    let samplers = [ShaderStage::Vertex, ShaderStage::Pixel]
        .into_iter()
        .flat_map(|stage| (0..MAX_SAMPLER_SLOTS as u8).map(move |slot| K::sampler(stage, slot)));
    let textures = [ShaderStage::Vertex, ShaderStage::Pixel]
        .into_iter()
        .flat_map(|stage| (0..MAX_SAMPLER_SLOTS as u8).map(move |slot| K::texture(stage, slot)));

    [K::BlendState, K::RasterizerState, K::DepthStencilState]
        .into_iter()
        .chain(samplers)
        .chain([
            K::ScissorRect,
            K::Viewport,
            K::RenderTarget,
            K::VertexShader,
            K::PixelShader,
            K::CameraTransform,
            K::EyePosition,
            K::LocalTransform,
            K::UvTransform,
        ])
        .chain(textures)
        .chain([K::Mesh, K::GlobalAmbientColor, K::SunDirection, K::SunColor])
}

fn resolve(frame: &Compiler3D, cmd: Command<Command3DKind>) -> Option<Op3D<'_>> {
    use Command3DKind as K;

    let i = cmd.index;
    let op = match cmd.kind {
        K::Draw | K::DrawLine3D | K::UpdateLine3DBuffers => return None,
        K::BlendState => Op3D::Blend(frame.blend_state(i)),
        K::RasterizerState => Op3D::Rasterizer(frame.rasterizer_state(i)),
        K::DepthStencilState => Op3D::DepthStencil(frame.depth_stencil_state(i)),
        K::VsSampler(slot) => Op3D::Sampler {
            stage: ShaderStage::Vertex,
            slot: slot as usize,
            state: frame.vs_sampler(slot as usize, i),
        },
        K::PsSampler(slot) => Op3D::Sampler {
            stage: ShaderStage::Pixel,
            slot: slot as usize,
            state: frame.ps_sampler(slot as usize, i),
        },
        K::ScissorRect => Op3D::Scissor(frame.scissor_rect(i)),
        K::Viewport => Op3D::Viewport(frame.viewport(i)),
        K::RenderTarget => Op3D::RenderTarget(frame.render_target(i)),
        K::VertexShader => Op3D::VertexShader(frame.vertex_shader(i)),
        K::PixelShader => Op3D::PixelShader(frame.pixel_shader(i)),
        K::CameraTransform => Op3D::CameraTransform(frame.camera_transform(i)),
        K::EyePosition => Op3D::EyePosition(frame.eye_position(i)),
        K::LocalTransform => Op3D::LocalTransform(frame.local_transform(i)),
        K::UvTransform => Op3D::UvTransform(frame.uv_transform(i)),
        K::ConstantBuffer => {
            let command = *frame.constant_buffer(i);
            Op3D::ConstantBuffer {
                command,
                data: frame.constant_data(&command),
            }
        }
        K::VsTexture(slot) => Op3D::Texture {
            stage: ShaderStage::Vertex,
            slot: slot as usize,
            texture: frame.vs_texture(slot as usize, i),
        },
        K::PsTexture(slot) => Op3D::Texture {
            stage: ShaderStage::Pixel,
            slot: slot as usize,
            texture: frame.ps_texture(slot as usize, i),
        },
        K::Mesh => Op3D::Mesh(frame.mesh(i)),
        K::GlobalAmbientColor => Op3D::GlobalAmbientColor(frame.global_ambient_color(i)),
        K::SunDirection => Op3D::SunDirection(frame.sun_direction(i)),
        K::SunColor => Op3D::SunColor(frame.sun_color(i)),
    };
    Some(op)
}

/// Replays a flushed 3D frame into `backend`.
///
/// `planner` places the line batches; mesh draws address their own buffers.
pub fn replay_3d(
    frame: &Compiler3D,
    planner: &mut UploadPlanner,
    backend: &mut impl Backend3D,
) -> anyhow::Result<ReplayStats> {
    ensure!(frame.phase() == FramePhase::Flushed, "3D frame replayed before flush()");

    let mut stats = ReplayStats::default();
    let mut cursor = BatchCursor::default();

    for kind in frame_start_kinds() {
        if let Some(op) = resolve(frame, Command { kind, index: 0 }) {
            backend.apply(op).context("binding frame-start state")?;
        }
    }

    for (position, &cmd) in frame.commands().iter().enumerate() {
        let op = match cmd.kind {
            Command3DKind::UpdateLine3DBuffers => {
                let upload = planner.plan(cmd.index, frame.line_batch(cmd.index));
                cursor.begin(upload.info);
                stats.uploads += 1;
                Op3D::UploadLines {
                    upload,
                    vertices: frame.line_batch_vertices(cmd.index),
                    indices: frame.line_batch_indices(cmd.index),
                }
            }
            Command3DKind::DrawLine3D => {
                let draw = cursor.take(frame.line_draw(cmd.index).index_count)?;
                stats.draw_calls += 1;
                Op3D::DrawLines(draw)
            }
            Command3DKind::Draw => {
                let draw = frame.draw(cmd.index);
                stats.draw_calls += 1;
                stats.triangles += draw.index_count / 3 * draw.instance_count;
                Op3D::DrawMesh {
                    draw,
                    material: frame.draw_material(cmd.index),
                }
            }
            _ => {
                stats.state_changes += 1;
                resolve(frame, cmd).context("unresolvable 3D command")?
            }
        };
        backend
            .apply(op)
            .with_context(|| format!("replaying 3D command #{position} ({:?})", cmd.kind))?;
    }

    log::trace!("3D replay: {stats:?}");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::paint::Color;
    use crate::renderer3d::PhongMaterial;
    use crate::replay::TraceBackend;
    use crate::resource::{Mesh, MeshId};

    const FRAME_START_OPS: usize = 3 + 2 * MAX_SAMPLER_SLOTS + 9 + 2 * MAX_SAMPLER_SLOTS + 4;

    #[test]
    fn lines_and_meshes_replay_in_order() {
        let mut c = Compiler3D::default();
        let mesh = Mesh::new(MeshId::new(5));
        c.add_line3d(Vec3::ZERO, Vec3::X, Color::WHITE);
        c.draw_mesh(&mesh, 36, PhongMaterial::default());
        c.flush();

        let mut planner = UploadPlanner::new(c.batch_config());
        let mut trace = TraceBackend::new();
        let stats = replay_3d(&c, &mut planner, &mut trace).unwrap();

        let names = trace.names();
        assert_eq!(names.len(), FRAME_START_OPS + 4);
        assert_eq!(names[0], "blend");
        assert_eq!(names[FRAME_START_OPS - 1], "sun_color");
        assert_eq!(&names[FRAME_START_OPS..], &["upload_lines", "draw_lines", "mesh", "draw_mesh"]);
        assert_eq!(
            stats,
            ReplayStats {
                draw_calls: 2,
                triangles: 12,
                state_changes: 1,
                uploads: 1
            }
        );
    }

    #[test]
    fn instanced_draws_count_every_instance() {
        let mut c = Compiler3D::default();
        c.push_draw(0, 6, PhongMaterial::default(), 10);
        c.flush();

        let mut planner = UploadPlanner::new(c.batch_config());
        let stats = replay_3d(&c, &mut planner, &mut TraceBackend::new()).unwrap();
        assert_eq!(stats.triangles, 20);
        assert_eq!(stats.uploads, 0);
    }

    #[test]
    fn replay_before_flush_is_rejected() {
        let c = Compiler3D::default();
        let mut planner = UploadPlanner::new(c.batch_config());
        assert!(replay_3d(&c, &mut planner, &mut TraceBackend::new()).is_err());
    }
}
