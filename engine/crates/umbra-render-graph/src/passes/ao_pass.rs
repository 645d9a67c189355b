use umbra_gfx::{
    commands::{command_buffer::GfxCommandBuffer, label::LabelKind},
    error::GfxResult,
};
use umbra_render_interface::{gpu_data::GBufferIndices, transient_memory::TransientMemory};

use crate::{
    blur_kernel::BlurKernel,
    frame_targets::{FrameTargets, GBufferSlot},
    passes::{PassRenderingInfo, blur_pass::BlurPass, draw_fullscreen},
    programs::Programs,
    render_context::RenderContext,
};

/// 屏幕空间的环境光遮蔽
///
/// 读取本帧的 G-buffer，全屏绘制到 `ao[1]`，再做保留边缘的可分离模糊，结果仍在 `ao[1]`
pub struct AoPass<'a> {
    programs: &'a Programs,
    kernel: &'a BlurKernel,
}
impl<'a> AoPass<'a> {
    pub fn new(programs: &'a Programs, kernel: &'a BlurKernel) -> Self {
        Self { programs, kernel }
    }

    pub fn exec(
        &self,
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        targets: &mut FrameTargets,
        transient: &mut TransientMemory,
    ) -> GfxResult<()> {
        let _span = tracy_client::span!("AoPass::exec");

        let frame = transient.allocate_constant(&ctx.frame_constants(), "ao-frame")?;
        let params = transient.allocate_constant(&ctx.settings.ao.to_gpu(self.kernel), "ao-params")?;
        let indices = GBufferIndices {
            position: targets.gbuffer_index(ctx.frame_label, GBufferSlot::WorldPosition),
            normal: targets.gbuffer_index(ctx.frame_label, GBufferSlot::Normal),
            ..Default::default()
        };

        cmd.begin_label("[ao-pass]occlusion", LabelKind::Pass);
        let [_, ao_1] = &mut targets.ao;
        ao_1.bind(cmd, ctx.extent)?;
        PassRenderingInfo::new(ctx.extent).color(ao_1.attachment_view(), [1.0; 4]).begin(cmd);

        let program = self.programs.ao.use_shader(cmd, ctx.bindless_set)?;
        program.push_buffers(cmd, &[(0, frame.buffer_info()), (1, params.buffer_info())])?;
        program.push_constants(cmd, &indices);
        draw_fullscreen(cmd, ctx)?;

        cmd.end_rendering();
        ao_1.unbind(cmd)?;
        cmd.end_label();

        BlurPass::new(self.programs).ao(cmd, ctx, targets, params.buffer_info())
    }
}
