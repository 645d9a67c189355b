use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
    pipelines::{layout::GfxPipelineLayout, shader_module::GfxShaderModule},
};

/// 光栅化 pipeline 的固定功能状态
///
/// 使用 dynamic rendering，viewport 和 scissor 都是动态状态
#[derive(Debug, Clone)]
pub struct GfxRasterState {
    pub color_formats: Vec<vk::Format>,
    pub depth_format: Option<vk::Format>,

    /// None 表示没有 vertex buffer
    pub vertex_binding: Option<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,

    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,

    /// None 表示关闭深度测试
    pub depth_compare: Option<vk::CompareOp>,
    pub depth_write: bool,

    /// 所有 color attachment 使用同样的 blend
    pub blend: vk::PipelineColorBlendAttachmentState,
}

/// graphics 或 compute pipeline，独占自己的 layout，drop 时先销毁 pipeline 再销毁 layout
pub struct GfxPipeline {
    handle: vk::Pipeline,
    bind_point: vk::PipelineBindPoint,
    layout: GfxPipelineLayout,
}
impl GfxPipeline {
    pub fn compute(module: &GfxShaderModule, layout: GfxPipelineLayout, name: &str) -> GfxResult<Self> {
        let info = vk::ComputePipelineCreateInfo::default().stage(module.stage_info()).layout(layout.handle());

        let device = Gfx::get().device();
        let handles = unsafe { device.create_compute_pipelines(vk::PipelineCache::null(), &[info], None) }
            .map_err(|(_, e)| e)
            .or_creation_failure(format!("Pipeline::{name}"))?;

        Ok(Self::named(handles[0], vk::PipelineBindPoint::COMPUTE, layout, name))
    }

    pub fn graphics(
        modules: &[GfxShaderModule],
        state: &GfxRasterState,
        layout: GfxPipelineLayout,
        name: &str,
    ) -> GfxResult<Self> {
        let stages: Vec<_> = modules.iter().map(GfxShaderModule::stage_info).collect();

        let bindings: Vec<_> = state.vertex_binding.into_iter().collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&state.vertex_attributes);
        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let raster = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(state.cull_mode)
            .front_face(state.front_face)
            .line_width(1.0);
        let multisample =
            vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(state.depth_compare.is_some())
            .depth_write_enable(state.depth_write)
            .depth_compare_op(state.depth_compare.unwrap_or(vk::CompareOp::ALWAYS));

        let blends = vec![state.blend; state.color_formats.len()];
        let blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blends);

        let mut rendering = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&state.color_formats)
            .depth_attachment_format(state.depth_format.unwrap_or(vk::Format::UNDEFINED));

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport)
            .rasterization_state(&raster)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth)
            .color_blend_state(&blend)
            .dynamic_state(&dynamic)
            .layout(layout.handle())
            .push_next(&mut rendering);

        let device = Gfx::get().device();
        let handles = unsafe { device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None) }
            .map_err(|(_, e)| e)
            .or_creation_failure(format!("Pipeline::{name}"))?;

        Ok(Self::named(handles[0], vk::PipelineBindPoint::GRAPHICS, layout, name))
    }

    fn named(handle: vk::Pipeline, bind_point: vk::PipelineBindPoint, layout: GfxPipelineLayout, name: &str) -> Self {
        let pipeline = Self {
            handle,
            bind_point,
            layout,
        };
        Gfx::get().device().name_object(&pipeline, name);
        pipeline
    }
}
// getters
impl GfxPipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }

    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        self.bind_point
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }
}
impl Drop for GfxPipeline {
    fn drop(&mut self) {
        unsafe { Gfx::get().device().destroy_pipeline(self.handle, None) };
    }
}
impl VkObject for GfxPipeline {
    const KIND: &'static str = "Pipeline";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
