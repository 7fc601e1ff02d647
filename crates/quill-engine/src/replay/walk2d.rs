use anyhow::{Context, ensure};

use crate::batch::UploadPlanner;
use crate::command::{Command, StageKind};
use crate::renderer2d::{Command2DKind, Compiler2D, FramePhase};
use crate::state::{MAX_SAMPLER_SLOTS, ShaderStage};

use super::{Backend2D, BatchCursor, Op2D, ReplayStats};

/// State categories bound before the stream is walked, in flush order.
fn frame_start_kinds() -> impl Iterator<Item = Command2DKind> {
    use Command2DKind as K;

    let samplers = [ShaderStage::Vertex, ShaderStage::Pixel]
        .into_iter()
        .flat_map(|stage| (0..MAX_SAMPLER_SLOTS as u8).map(move |slot| K::sampler(stage, slot)));
    let textures = [ShaderStage::Vertex, ShaderStage::Pixel]
        .into_iter()
        .flat_map(|stage| (0..MAX_SAMPLER_SLOTS as u8).map(move |slot| K::texture(stage, slot)));

    [K::ColorMul, K::ColorAdd, K::BlendState, K::RasterizerState]
        .into_iter()
        .chain(samplers)
        .chain([
            K::ScissorRect,
            K::Viewport,
            K::SdfParams,
            K::RenderTarget,
            K::VertexShader,
            K::PixelShader,
            K::Transform,
        ])
        .chain(textures)
}

/// Resolves a state entry. Geometry entries are handled by the walker.
fn resolve(frame: &Compiler2D, cmd: Command<Command2DKind>) -> Option<Op2D<'_>> {
    use Command2DKind as K;

    let i = cmd.index;
    let op = match cmd.kind {
        K::UpdateBuffers | K::Draw | K::DrawNull => return None,
        K::ColorMul => Op2D::ColorMul(frame.color_mul(i)),
        K::ColorAdd => Op2D::ColorAdd(frame.color_add(i)),
        K::BlendState => Op2D::Blend(frame.blend_state(i)),
        K::RasterizerState => Op2D::Rasterizer(frame.rasterizer_state(i)),
        K::VsSampler(slot) => Op2D::Sampler {
            stage: ShaderStage::Vertex,
            slot: slot as usize,
            state: frame.vs_sampler(slot as usize, i),
        },
        K::PsSampler(slot) => Op2D::Sampler {
            stage: ShaderStage::Pixel,
            slot: slot as usize,
            state: frame.ps_sampler(slot as usize, i),
        },
        K::ScissorRect => Op2D::Scissor(frame.scissor_rect(i)),
        K::Viewport => Op2D::Viewport(frame.viewport(i)),
        K::SdfParams => Op2D::SdfParams(frame.sdf_params(i)),
        K::RenderTarget => Op2D::RenderTarget(frame.render_target(i)),
        K::VertexShader => Op2D::VertexShader(frame.vertex_shader(i)),
        K::PixelShader => Op2D::PixelShader(frame.pixel_shader(i)),
        K::Transform => Op2D::Transform(frame.transform(i)),
        K::ConstantBuffer => {
            let command = *frame.constant_buffer(i);
            Op2D::ConstantBuffer {
                command,
                data: frame.constant_data(&command),
            }
        }
        K::VsTexture(slot) => Op2D::Texture {
            stage: ShaderStage::Vertex,
            slot: slot as usize,
            texture: frame.vs_texture(slot as usize, i),
        },
        K::PsTexture(slot) => Op2D::Texture {
            stage: ShaderStage::Pixel,
            slot: slot as usize,
            texture: frame.ps_texture(slot as usize, i),
        },
    };
    Some(op)
}

/// Replays a flushed 2D frame into `backend`.
pub fn replay_2d(
    frame: &Compiler2D,
    planner: &mut UploadPlanner,
    backend: &mut impl Backend2D,
) -> anyhow::Result<ReplayStats> {
    ensure!(frame.phase() == FramePhase::Flushed, "2D frame replayed before flush()");

    let mut stats = ReplayStats::default();
    let mut cursor = BatchCursor::default();

    for kind in frame_start_kinds() {
        if let Some(op) = resolve(frame, Command { kind, index: 0 }) {
            backend.apply(op).context("binding frame-start state")?;
        }
    }

    for (position, &cmd) in frame.commands().iter().enumerate() {
        let op = match cmd.kind {
            Command2DKind::UpdateBuffers => {
                let upload = planner.plan(cmd.index, frame.batch(cmd.index));
                cursor.begin(upload.info);
                stats.uploads += 1;
                Op2D::Upload {
                    upload,
                    vertices: frame.batch_vertices(cmd.index),
                    indices: frame.batch_indices(cmd.index),
                }
            }
            Command2DKind::Draw => {
                let draw = cursor.take(frame.draw(cmd.index).index_count)?;
                stats.draw_calls += 1;
                stats.triangles += draw.index_count / 3;
                Op2D::Draw(draw)
            }
            Command2DKind::DrawNull => {
                let vertex_count = frame.null_draw(cmd.index);
                stats.draw_calls += 1;
                stats.triangles += vertex_count / 3;
                Op2D::DrawNull { vertex_count }
            }
            _ => {
                stats.state_changes += 1;
                resolve(frame, cmd).context("unresolvable 2D command")?
            }
        };
        backend
            .apply(op)
            .with_context(|| format!("replaying 2D command #{position} ({:?})", cmd.kind))?;
    }

    log::trace!("2D replay: {stats:?}");
    Ok(stats)
}
