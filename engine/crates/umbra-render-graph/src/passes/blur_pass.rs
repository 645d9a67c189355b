use ash::vk;
use umbra_gfx::{
    commands::{command_buffer::GfxCommandBuffer, label::LabelKind},
    error::GfxResult,
};
use umbra_render_interface::{
    frame_settings::RendererDefaults,
    gpu_data::{AoBlurConstants, AoParams, ComputePushConstants},
    render_target::RenderTarget,
    transient_memory::TransientMemory,
};
use umbra_shader::shader_program::ShaderProgram;

use crate::{
    blur_kernel::BlurKernel,
    frame_targets::{FrameTargets, GBufferSlot},
    programs::Programs,
    render_context::RenderContext,
};

/// 可分离的高斯模糊：先水平后垂直
///
/// compute shader 从 bindless 的 sampled 绑定读取 `src`，写入 storage 绑定的 `dst`。
/// 每一步的 `dst` 在写入期间处于 GENERAL，写完之后回到静止状态，由 tracker 产生的 barrier 衔接下一步。
pub struct BlurPass<'a> {
    programs: &'a Programs,
}
impl<'a> BlurPass<'a> {
    pub fn new(programs: &'a Programs) -> Self {
        Self { programs }
    }

    /// shadow -> blur[0]（拷贝），blur[0] -> blur[1]（水平），blur[1] -> blur[0]（垂直）
    pub fn shadow(
        &self,
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        targets: &mut FrameTargets,
        transient: &mut TransientMemory,
        kernel: &BlurKernel,
    ) -> GfxResult<()> {
        let _span = tracy_client::span!("BlurPass::shadow");
        let extent = RendererDefaults::SHADOW_EXTENT;
        let params = transient.allocate_constant(&kernel.params(), "shadow-blur")?;
        let buffers = [(0, params.buffer_info())];

        let [blur_0, blur_1] = &mut targets.shadow_blur;

        cmd.begin_label("[shadow-pass]copy", LabelKind::Compute);
        Self::dispatch(cmd, ctx, &self.programs.depth_copy, &[], &targets.shadow, blur_0, extent)?;
        cmd.end_label();

        cmd.begin_label("[shadow-pass]blur-h", LabelKind::Compute);
        Self::dispatch(cmd, ctx, &self.programs.blur_h, &buffers, blur_0, blur_1, extent)?;
        cmd.end_label();

        cmd.begin_label("[shadow-pass]blur-v", LabelKind::Compute);
        Self::dispatch(cmd, ctx, &self.programs.blur_v, &buffers, blur_1, blur_0, extent)?;
        cmd.end_label();
        Ok(())
    }

    fn dispatch(
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        program: &ShaderProgram,
        buffers: &[(u32, vk::DescriptorBufferInfo)],
        src: &RenderTarget,
        dst: &mut RenderTarget,
        extent: vk::Extent2D,
    ) -> GfxResult<()> {
        let linked = program.use_shader(cmd, ctx.bindless_set)?;
        if !buffers.is_empty() {
            linked.push_buffers(cmd, buffers)?;
        }
        linked.push_constants(
            cmd,
            &ComputePushConstants {
                src: src.read_index().0,
                dst: dst.read_index().0,
            },
        );

        dst.bind_storage(cmd, extent)?;
        linked.dispatch(cmd, [extent.width, extent.height, 1]);
        dst.unbind_storage(cmd)
    }

    /// ao[1] -> ao[0]（水平），ao[0] -> ao[1]（垂直）
    ///
    /// 权重和 AO 的采样参数放在同一个 [`AoParams`] 中；根据 G-buffer 的位置和法线保留边缘
    pub fn ao(
        &self,
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        targets: &mut FrameTargets,
        ao_params: vk::DescriptorBufferInfo,
    ) -> GfxResult<()> {
        let _span = tracy_client::span!("BlurPass::ao");
        debug_assert_eq!(ao_params.range, size_of::<AoParams>() as vk::DeviceSize);

        let position = targets.gbuffer_index(ctx.frame_label, GBufferSlot::WorldPosition);
        let normal = targets.gbuffer_index(ctx.frame_label, GBufferSlot::Normal);
        let [ao_0, ao_1] = &mut targets.ao;

        cmd.begin_label("[ao-pass]blur-h", LabelKind::Compute);
        Self::dispatch_ao(cmd, ctx, &self.programs.ao_blur_h, ao_params, ao_1, ao_0, position, normal)?;
        cmd.end_label();

        cmd.begin_label("[ao-pass]blur-v", LabelKind::Compute);
        Self::dispatch_ao(cmd, ctx, &self.programs.ao_blur_v, ao_params, ao_0, ao_1, position, normal)?;
        cmd.end_label();
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_ao(
        cmd: &GfxCommandBuffer,
        ctx: &RenderContext,
        program: &ShaderProgram,
        ao_params: vk::DescriptorBufferInfo,
        src: &RenderTarget,
        dst: &mut RenderTarget,
        position: u32,
        normal: u32,
    ) -> GfxResult<()> {
        let linked = program.use_shader(cmd, ctx.bindless_set)?;
        linked.push_buffers(cmd, &[(1, ao_params)])?;
        linked.push_constants(
            cmd,
            &AoBlurConstants {
                src: src.read_index().0,
                dst: dst.read_index().0,
                position,
                normal,
            },
        );

        dst.bind_storage(cmd, ctx.extent)?;
        linked.dispatch(cmd, [ctx.extent.width, ctx.extent.height, 1]);
        dst.unbind_storage(cmd)
    }
}
