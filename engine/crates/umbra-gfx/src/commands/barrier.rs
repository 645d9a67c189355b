use ash::vk;

use crate::commands::image_state::GfxImageState;

/// 一次 image 状态转换，只覆盖第 0 层 mip 和第 0 个 layer
#[derive(Clone, Copy, Debug)]
pub struct GfxImageBarrier {
    image: vk::Image,
    aspect: vk::ImageAspectFlags,
    prev: GfxImageState,
    next: GfxImageState,
}
impl GfxImageBarrier {
    #[inline]
    pub fn new(image: vk::Image, aspect: vk::ImageAspectFlags, prev: GfxImageState, next: GfxImageState) -> Self {
        Self {
            image,
            aspect,
            prev,
            next,
        }
    }

    #[inline]
    pub fn color(image: vk::Image, prev: GfxImageState, next: GfxImageState) -> Self {
        Self::new(image, vk::ImageAspectFlags::COLOR, prev, next)
    }

    /// 源阶段替换为 `stage`，不 flush 任何写入
    ///
    /// swapchain image 需要和 acquire semaphore 的等待阶段衔接
    #[inline]
    pub fn after_stage(mut self, stage: vk::PipelineStageFlags2) -> Self {
        self.prev.stage = stage;
        self.prev.access = vk::AccessFlags2::NONE;
        self
    }

    /// 目标阶段替换为 `stage`，之后的访问由 semaphore 保证可见
    #[inline]
    pub fn before_stage(mut self, stage: vk::PipelineStageFlags2) -> Self {
        self.next.stage = stage;
        self.next.access = vk::AccessFlags2::NONE;
        self
    }

    pub fn to_vk(&self) -> vk::ImageMemoryBarrier2<'static> {
        vk::ImageMemoryBarrier2::default()
            .image(self.image)
            .old_layout(self.prev.layout)
            .new_layout(self.next.layout)
            .src_stage_mask(self.prev.stage)
            .src_access_mask(self.prev.src_access())
            .dst_stage_mask(self.next.stage)
            .dst_access_mask(self.next.access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(
                vk::ImageSubresourceRange::default().aspect_mask(self.aspect).level_count(1).layer_count(1),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_target_bind_fills_layouts_and_masks() {
        let barrier = GfxImageBarrier::color(
            vk::Image::null(),
            GfxImageState::COLOR_ATTACHMENT_WRITE,
            GfxImageState::SHADER_READ_ALL,
        )
        .to_vk();
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        // 读操作不需要 flush
        assert_eq!(barrier.src_access_mask, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags2::SHADER_SAMPLED_READ);
        assert_eq!(barrier.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(barrier.subresource_range.level_count, 1);
    }

    #[test]
    fn swapchain_stage_overrides() {
        let stage = vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT;
        let acquire = GfxImageBarrier::color(
            vk::Image::null(),
            GfxImageState::PRESENT,
            GfxImageState::COLOR_ATTACHMENT_WRITE,
        )
        .after_stage(stage)
        .to_vk();
        assert_eq!(acquire.src_stage_mask, stage);
        assert_eq!(acquire.old_layout, vk::ImageLayout::PRESENT_SRC_KHR);

        let release = GfxImageBarrier::color(
            vk::Image::null(),
            GfxImageState::COLOR_ATTACHMENT_WRITE,
            GfxImageState::PRESENT,
        )
        .before_stage(stage)
        .to_vk();
        assert_eq!(release.dst_stage_mask, stage);
        assert_eq!(release.dst_access_mask, vk::AccessFlags2::NONE);
        assert_eq!(release.new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }
}
