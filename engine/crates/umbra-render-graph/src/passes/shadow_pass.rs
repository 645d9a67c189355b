use glam::Mat4;
use umbra_gfx::{
    commands::{command_buffer::GfxCommandBuffer, label::LabelKind},
    error::GfxResult,
};
use umbra_render_interface::{frame_settings::RendererDefaults, transient_memory::TransientMemory};

use crate::{
    blur_kernel::BlurKernel,
    frame_targets::FrameTargets,
    passes::{PassRenderingInfo, blur_pass::BlurPass, draw_subtree},
    programs::Programs,
    render_context::RenderContext,
};

/// 从阴影光源的视角绘制 `central` 子树，输出深度的四阶矩，之后模糊
///
/// 结果在 `shadow_blur[0]`
pub struct ShadowPass<'a> {
    programs: &'a Programs,
    kernel: &'a BlurKernel,
}
impl<'a> ShadowPass<'a> {
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
        let _span = tracy_client::span!("ShadowPass::exec");
        let extent = RendererDefaults::SHADOW_EXTENT;

        cmd.begin_label("[shadow-pass]moments", LabelKind::Pass);
        targets.shadow.bind(cmd, extent)?;
        targets.shadow_depth.bind(cmd, extent)?;

        // 没有被覆盖的像素视为最远处
        PassRenderingInfo::new(extent)
            .color(targets.shadow.attachment_view(), [1.0; 4])
            .depth(targets.shadow_depth.attachment_view(), RendererDefaults::CLEAR_DEPTH)
            .begin(cmd);

        let light = ctx.lights.shadow.to_gpu();
        let frame = transient.allocate_constant(&ctx.shadow_constants(&light), "shadow-frame")?;
        let light = transient.allocate_constant(&light, "shadow-light")?;

        let program = self.programs.shadow.use_shader(cmd, ctx.bindless_set)?;
        let count = draw_subtree(
            cmd,
            program,
            ctx,
            transient,
            ctx.roots.central,
            Mat4::IDENTITY,
            &[(0, frame.buffer_info()), (2, light.buffer_info())],
        )?;

        cmd.end_rendering();
        targets.shadow_depth.unbind(cmd)?;
        targets.shadow.unbind(cmd)?;
        cmd.end_label();
        log::trace!("shadow pass: {count} draws");

        BlurPass::new(self.programs).shadow(cmd, ctx, targets, transient, self.kernel)
    }
}
