use ash::vk;
use glam::{Mat4, Vec3};
use itertools::Itertools;
use umbra_gfx::{
    commands::{command_buffer::GfxCommandBuffer, label::LabelKind},
    error::GfxResult,
};
use umbra_render_interface::{
    frame_settings::RendererDefaults,
    render_target::{RenderTarget, TargetState, TargetTransition},
    transient_memory::TransientMemory,
};
use umbra_scene::projection;

use crate::{
    frame_targets::FrameTargets,
    passes::{PassRenderingInfo, draw_subtree},
    programs::Programs,
    render_context::RenderContext,
};

/// 只保留投影之后落在屏幕内的光源位置
pub fn visible_light_markers(view_proj: Mat4, positions: impl Iterator<Item = Vec3>) -> Vec<Vec3> {
    positions.filter(|p| projection::is_on_screen(view_proj, *p)).collect_vec()
}

/// G-buffer 在前，depth 在后，进入写入状态
///
/// 先检查全部尺寸再推进状态：resize 之后没有重建时直接失败，所有 target 都留在静止状态
pub fn begin_gbuffer_writes<'t>(
    gbuffer: impl IntoIterator<Item = &'t mut TargetState>,
    depth: &'t mut TargetState,
    viewport: vk::Extent2D,
) -> GfxResult<Vec<TargetTransition>> {
    let mut states = gbuffer.into_iter().chain(std::iter::once(depth)).collect_vec();
    for state in &states {
        state.check_extent(viewport)?;
    }
    states.iter_mut().map(|state| state.begin_write(viewport)).collect()
}

/// 顺序和 [`begin_gbuffer_writes`] 相同
pub fn end_gbuffer_writes<'t>(
    gbuffer: impl IntoIterator<Item = &'t mut TargetState>,
    depth: &'t mut TargetState,
) -> GfxResult<Vec<TargetTransition>> {
    gbuffer.into_iter().chain(std::iter::once(depth)).map(TargetState::end_write).collect()
}

/// 把整个场景图写入本 slot 的 G-buffer：位置、法线、漫反射、高光 + 粗糙度
///
/// 可见的光源位置上额外绘制一个标记
pub struct GeometryPass<'a> {
    programs: &'a Programs,
}
impl<'a> GeometryPass<'a> {
    pub fn new(programs: &'a Programs) -> Self {
        Self { programs }
    }

    pub fn exec(
        &self,
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        targets: &mut FrameTargets,
        transient: &mut TransientMemory,
    ) -> GfxResult<()> {
        let _span = tracy_client::span!("GeometryPass::exec");

        cmd.begin_label("[geometry-pass]gbuffer", LabelKind::Pass);
        let slot = targets.slot_mut(ctx.frame_label);
        let binds = begin_gbuffer_writes(
            slot.gbuffer.iter_mut().map(RenderTarget::target_state_mut),
            slot.depth.target_state_mut(),
            ctx.extent,
        )?;
        for (target, transition) in slot.gbuffer.iter().chain([&slot.depth]).zip(binds) {
            target.record(cmd, transition);
        }

        let rendering = slot
            .gbuffer
            .iter()
            .fold(PassRenderingInfo::new(ctx.extent), |info, target| {
                info.color(target.attachment_view(), RendererDefaults::CLEAR_COLOR)
            })
            .depth(slot.depth.attachment_view(), RendererDefaults::CLEAR_DEPTH);
        rendering.begin(cmd);

        let frame = transient.allocate_constant(&ctx.frame_constants(), "geometry-frame")?;
        let shared: [(u32, vk::DescriptorBufferInfo); 1] = [(0, frame.buffer_info())];

        let program = self.programs.geometry.use_shader(cmd, ctx.bindless_set)?;
        let mut count = draw_subtree(cmd, program, ctx, transient, ctx.roots.root, Mat4::IDENTITY, &shared)?;

        let markers = visible_light_markers(ctx.camera.view_proj(), ctx.lights.positions());
        for position in &markers {
            count += draw_subtree(
                cmd,
                program,
                ctx,
                transient,
                ctx.roots.light_marker,
                Mat4::from_translation(*position),
                &shared,
            )?;
        }

        cmd.end_rendering();
        let unbinds =
            end_gbuffer_writes(slot.gbuffer.iter_mut().map(RenderTarget::target_state_mut), slot.depth.target_state_mut())?;
        for (target, transition) in slot.gbuffer.iter().chain([&slot.depth]).zip(unbinds) {
            target.record(cmd, transition);
        }
        cmd.end_label();
        log::trace!("geometry pass: {count} draws, {} light markers", markers.len());
        Ok(())
    }
}
