use ash::vk;

use crate::{
    commands::{
        barrier::GfxImageBarrier,
        label::{self, LabelKind},
    },
    error::GfxResult,
    foundation::{device::GfxDevice, naming::VkObject},
    gfx::Gfx,
    pipelines::pipeline::GfxPipeline,
    resources::{buffer::GfxBuffer, vertex::GfxIndex},
};

/// primary 命令缓冲，由 [`GfxCommandPool`](crate::commands::command_pool::GfxCommandPool) 分配和回收
///
/// 只录制 Umbra 用到的命令，每个方法对应一条 `vkCmd*`
pub struct GfxCommandBuffer {
    handle: vk::CommandBuffer,
}
impl GfxCommandBuffer {
    #[inline]
    pub(crate) fn from_handle(handle: vk::CommandBuffer) -> Self {
        Self { handle }
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    #[inline]
    fn device() -> &'static GfxDevice {
        Gfx::get().device()
    }
}
// 录制
impl GfxCommandBuffer {
    /// 每次录制只提交一次；整个录制过程包在名为 `name` 的 label 中
    pub fn begin(&self, name: &str) -> GfxResult<()> {
        let info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { Self::device().begin_command_buffer(self.handle, &info) }?;
        self.begin_label(name, LabelKind::Frame);
        Ok(())
    }

    pub fn end(&self) -> GfxResult<()> {
        self.end_label();
        unsafe { Self::device().end_command_buffer(self.handle) }?;
        Ok(())
    }
}
// 传输
impl GfxCommandBuffer {
    pub fn copy_buffer(&self, src: &GfxBuffer, dst: &GfxBuffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy::default().size(size);
        unsafe { Self::device().cmd_copy_buffer(self.handle, src.handle(), dst.handle(), &[region]) };
    }

    /// 整张 2D color image，image 需要处于 TRANSFER_DST
    pub fn copy_buffer_to_image(&self, src: &GfxBuffer, image: vk::Image, extent: vk::Extent2D) {
        let region = vk::BufferImageCopy2::default()
            .image_subresource(
                vk::ImageSubresourceLayers::default().aspect_mask(vk::ImageAspectFlags::COLOR).layer_count(1),
            )
            .image_extent(extent.into());
        let info = vk::CopyBufferToImageInfo2::default()
            .src_buffer(src.handle())
            .dst_image(image)
            .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .regions(std::slice::from_ref(&region));
        unsafe { Self::device().cmd_copy_buffer_to_image2(self.handle, &info) };
    }
}
// pipeline 状态
impl GfxCommandBuffer {
    pub fn bind_pipeline(&self, pipeline: &GfxPipeline) {
        unsafe { Self::device().cmd_bind_pipeline(self.handle, pipeline.bind_point(), pipeline.handle()) };
    }

    pub fn bind_descriptor_set(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        set_index: u32,
        set: vk::DescriptorSet,
    ) {
        unsafe { Self::device().cmd_bind_descriptor_sets(self.handle, bind_point, layout, set_index, &[set], &[]) };
    }

    /// 不分配 descriptor set，直接把 descriptor 写进命令缓冲
    pub fn push_descriptor_set(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        set_index: u32,
        writes: &[vk::WriteDescriptorSet],
    ) {
        unsafe {
            Self::device().push_descriptor.cmd_push_descriptor_set(self.handle, bind_point, layout, set_index, writes)
        };
    }

    /// 总是从 offset 0 开始写
    pub fn push_constants(&self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, data: &[u8]) {
        unsafe { Self::device().cmd_push_constants(self.handle, layout, stages, 0, data) };
    }
}
// 光栅化
impl GfxCommandBuffer {
    pub fn begin_rendering(&self, info: &vk::RenderingInfo) {
        unsafe { Self::device().dynamic_rendering.cmd_begin_rendering(self.handle, info) };
    }

    pub fn end_rendering(&self) {
        unsafe { Self::device().dynamic_rendering.cmd_end_rendering(self.handle) };
    }

    pub fn set_viewport(&self, viewport: vk::Viewport) {
        unsafe { Self::device().cmd_set_viewport(self.handle, 0, &[viewport]) };
    }

    pub fn set_scissor(&self, scissor: vk::Rect2D) {
        unsafe { Self::device().cmd_set_scissor(self.handle, 0, &[scissor]) };
    }

    pub fn bind_vertex_buffer(&self, buffer: &GfxBuffer) {
        unsafe { Self::device().cmd_bind_vertex_buffers(self.handle, 0, &[buffer.handle()], &[0]) };
    }

    pub fn bind_index_buffer<I: GfxIndex>(&self, buffer: &GfxBuffer) {
        unsafe { Self::device().cmd_bind_index_buffer(self.handle, buffer.handle(), 0, I::INDEX_TYPE) };
    }

    pub fn draw_indexed(&self, index_count: u32, first_index: u32, vertex_offset: i32) {
        unsafe { Self::device().cmd_draw_indexed(self.handle, index_count, 1, first_index, vertex_offset, 0) };
    }
}
// compute
impl GfxCommandBuffer {
    pub fn dispatch(&self, groups: [u32; 3]) {
        let [x, y, z] = groups;
        unsafe { Self::device().cmd_dispatch(self.handle, x, y, z) };
    }
}
// 同步
impl GfxCommandBuffer {
    pub fn pipeline_barrier(&self, barriers: &[GfxImageBarrier]) {
        let barriers: Vec<_> = barriers.iter().map(GfxImageBarrier::to_vk).collect();
        let info = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe { Self::device().cmd_pipeline_barrier2(self.handle, &info) };
    }
}
// debug label
impl GfxCommandBuffer {
    pub fn begin_label(&self, name: &str, kind: LabelKind) {
        let Some(name) = label::label_name(name) else {
            return;
        };
        unsafe {
            Self::device().debug_utils.cmd_begin_debug_utils_label(self.handle, &label::label_info(&name, kind))
        };
    }

    pub fn end_label(&self) {
        unsafe { Self::device().debug_utils.cmd_end_debug_utils_label(self.handle) };
    }
}
impl VkObject for GfxCommandBuffer {
    const KIND: &'static str = "CommandBuffer";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
