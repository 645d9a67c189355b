use umbra_gfx::{
    commands::{command_buffer::GfxCommandBuffer, label::LabelKind},
    error::GfxResult,
};
use umbra_render_interface::{
    frame_settings::RendererDefaults, gpu_data::GBufferIndices, transient_memory::TransientMemory,
};

use crate::{
    frame_targets::{FrameTargets, GBufferSlot},
    passes::{PassRenderingInfo, draw_fullscreen},
    present::RenderPresent,
    programs::Programs,
    render_context::RenderContext,
};

/// 本帧 lighting pass 读取的所有 bindless index
pub fn gbuffer_indices(ctx: &RenderContext, targets: &FrameTargets) -> GBufferIndices {
    let label = ctx.frame_label;
    let [_, ao] = &targets.ao;
    GBufferIndices {
        position: targets.gbuffer_index(label, GBufferSlot::WorldPosition),
        normal: targets.gbuffer_index(label, GBufferSlot::Normal),
        diffuse: targets.gbuffer_index(label, GBufferSlot::Diffuse),
        specular: targets.gbuffer_index(label, GBufferSlot::Specular),
        shadow: targets.shadow_blur[0].read_index().0,
        ao: ao.read_index().0,
        ao_enabled: ctx.settings.ao.enabled as u32,
        _padding: 0,
    }
}

/// 全屏读取 G-buffer，叠加所有光源，直接写入当前的 swapchain image
///
/// 结束时 swapchain image 仍处于 color attachment 状态，UI 接着写入；
/// 回到 PRESENT 的转换在 `EndFrame` 中完成
pub struct LightingPass<'a> {
    programs: &'a Programs,
}
impl<'a> LightingPass<'a> {
    pub fn new(programs: &'a Programs) -> Self {
        Self { programs }
    }

    pub fn exec(
        &self,
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        targets: &FrameTargets,
        transient: &mut TransientMemory,
        present: &mut RenderPresent,
    ) -> GfxResult<()> {
        let _span = tracy_client::span!("LightingPass::exec");

        let frame = transient.allocate_constant(&ctx.frame_constants(), "lighting-frame")?;
        let lights = transient.allocate(&ctx.lights.to_gpu(), "lighting-lights")?;

        cmd.begin_label("[lighting-pass]shade", LabelKind::Pass);
        present.begin_render(cmd, ctx.extent)?;
        PassRenderingInfo::new(ctx.extent)
            .color(present.current_view()?, RendererDefaults::CLEAR_COLOR)
            .begin(cmd);

        let program = self.programs.lighting.use_shader(cmd, ctx.bindless_set)?;
        program.push_buffers(cmd, &[(0, frame.buffer_info()), (1, lights.buffer_info())])?;
        program.push_constants(cmd, &gbuffer_indices(ctx, targets));
        draw_fullscreen(cmd, ctx)?;

        cmd.end_rendering();
        cmd.end_label();
        Ok(())
    }
}
