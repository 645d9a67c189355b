use ash::vk;
use itertools::Itertools;
use umbra_gfx::{
    commands::{
        barrier::GfxImageBarrier, command_buffer::GfxCommandBuffer, image_state::GfxImageState,
        semaphore::GfxSemaphore,
    },
    error::{GfxError, GfxResult},
    gfx::Gfx,
    swapchain::{
        render_swapchain::{GfxAcquireOutcome, GfxRenderSwapchain},
        surface::GfxSurface,
    },
};
use umbra_render_interface::{frame_settings::FrameLabel, render_target::ImageStateTracker};

/// 窗口的呈现目标
///
/// swapchain image 的静止状态是 PRESENT：lighting pass 开始时转换为 color attachment，`EndFrame` 时转换回来。
pub struct RenderPresent {
    surface: GfxSurface,
    swapchain: Option<GfxRenderSwapchain>,
    vsync: bool,

    /// 数量和 swapchain image 相同
    image_trackers: Vec<ImageStateTracker>,

    /// 数量和 frame slot 相同
    present_complete_semaphores: Vec<GfxSemaphore>,
    /// 数量和 swapchain image 相同
    render_complete_semaphores: Vec<GfxSemaphore>,
}
// new & init
impl RenderPresent {
    pub fn new(surface: GfxSurface, vsync: bool, extent: vk::Extent2D) -> GfxResult<Self> {
        let mut present = Self {
            surface,
            swapchain: None,
            vsync,
            image_trackers: vec![],
            present_complete_semaphores: vec![],
            render_complete_semaphores: vec![],
        };
        present.create_swapchain(extent)?;
        Ok(present)
    }

    fn create_swapchain(&mut self, extent: vk::Extent2D) -> GfxResult<()> {
        let swapchain = GfxRenderSwapchain::new(&self.surface, self.vsync, extent)?;

        // 刚创建的 image 内容未定义，统一转换到静止状态
        let images = swapchain.images().to_vec();
        let barriers = images
            .iter()
            .map(|image| GfxImageBarrier::color(*image, GfxImageState::UNDEFINED, GfxImageState::PRESENT))
            .collect_vec();
        Gfx::get().submit_immediate("init-swapchain-images", |cmd| cmd.pipeline_barrier(&barriers))?;

        self.image_trackers = (0..images.len())
            .map(|i| ImageStateTracker::new(format!("swapchain-{i}"), GfxImageState::PRESENT, swapchain.extent()))
            .collect();
        self.present_complete_semaphores = FrameLabel::ALL
            .iter()
            .map(|label| GfxSemaphore::new(&format!("present-complete-{label}")))
            .collect::<GfxResult<Vec<_>>>()?;
        self.render_complete_semaphores = (0..images.len())
            .map(|i| GfxSemaphore::new(&format!("render-complete-{i}")))
            .collect::<GfxResult<Vec<_>>>()?;
        self.swapchain = Some(swapchain);
        Ok(())
    }

    fn destroy_swapchain(&mut self) {
        for semaphore in self.present_complete_semaphores.drain(..).chain(self.render_complete_semaphores.drain(..)) {
            semaphore.destroy();
        }
        self.image_trackers.clear();
        if let Some(swapchain) = self.swapchain.take() {
            swapchain.destroy();
        }
    }
}
// update
impl RenderPresent {
    /// 按新的窗口尺寸重建 swapchain
    ///
    /// 调用前需要等待所有 frame 完成。semaphore 一起重建，因此未被消费的 acquire 信号也被丢弃
    pub fn rebuild(&mut self, extent: vk::Extent2D) -> GfxResult<()> {
        let _span = tracy_client::span!("RenderPresent::rebuild");
        self.destroy_swapchain();
        self.create_swapchain(extent)
    }

    /// 获取下一个 image
    pub fn acquire_image(&mut self, frame_label: FrameLabel, timeout_ns: u64) -> GfxResult<GfxAcquireOutcome> {
        let semaphore = &self.present_complete_semaphores[*frame_label];
        let swapchain = self.swapchain.as_mut().ok_or_else(Self::missing_swapchain)?;
        swapchain.acquire(semaphore, timeout_ns)
    }

    /// PRESENT -> color attachment，同时检查 swapchain 是否和 viewport 一致
    pub fn begin_render(&mut self, cmd: &GfxCommandBuffer, viewport: vk::Extent2D) -> GfxResult<()> {
        let (image, index) = self.current()?;
        let tracker = &mut self.image_trackers[index];
        tracker.check_extent(viewport)?;

        if let Some((prev, next)) = tracker.transition(GfxImageState::PRESENT, GfxImageState::COLOR_ATTACHMENT_WRITE)? {
            // 和 acquire semaphore 的等待阶段衔接
            let barrier =
                GfxImageBarrier::color(image, prev, next).after_stage(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
            cmd.pipeline_barrier(&[barrier]);
        }
        Ok(())
    }

    /// color attachment -> PRESENT
    pub fn end_render(&mut self, cmd: &GfxCommandBuffer) -> GfxResult<()> {
        let (image, index) = self.current()?;
        let tracker = &mut self.image_trackers[index];

        if let Some((prev, next)) = tracker.transition(GfxImageState::COLOR_ATTACHMENT_WRITE, GfxImageState::PRESENT)? {
            // dst stage 和 render complete semaphore 的 signal 阶段一致
            let barrier =
                GfxImageBarrier::color(image, prev, next).before_stage(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
            cmd.pipeline_barrier(&[barrier]);
        }
        Ok(())
    }

    /// 返回是否需要重建 swapchain
    pub fn present_image(&self) -> GfxResult<bool> {
        let swapchain = self.swapchain()?;
        swapchain.present(Gfx::get().queue(), &self.render_complete_semaphores[swapchain.current_index()])
    }
}
// getters
impl RenderPresent {
    fn missing_swapchain() -> GfxError {
        GfxError::creation("swapchain", "swapchain is not available after a failed rebuild")
    }

    #[inline]
    pub fn swapchain(&self) -> GfxResult<&GfxRenderSwapchain> {
        self.swapchain.as_ref().ok_or_else(Self::missing_swapchain)
    }

    fn current(&self) -> GfxResult<(vk::Image, usize)> {
        let swapchain = self.swapchain()?;
        Ok((swapchain.current_image(), swapchain.current_index()))
    }

    /// 当前 image 的 view，lighting pass 以及 UI 写入
    pub fn current_view(&self) -> GfxResult<vk::ImageView> {
        Ok(self.swapchain()?.current_view())
    }

    pub fn extent(&self) -> GfxResult<vk::Extent2D> {
        Ok(self.swapchain()?.extent())
    }

    pub fn format(&self) -> GfxResult<vk::Format> {
        Ok(self.swapchain()?.format())
    }

    /// 本帧 acquire 时 signal 的 semaphore
    #[inline]
    pub fn present_complete(&self, frame_label: FrameLabel) -> &GfxSemaphore {
        &self.present_complete_semaphores[*frame_label]
    }

    /// 当前 image 绘制完成时 signal 的 semaphore，present 等待它
    pub fn render_complete(&self) -> GfxResult<&GfxSemaphore> {
        let (_, index) = self.current()?;
        Ok(&self.render_complete_semaphores[index])
    }
}
// destroy
impl RenderPresent {
    pub fn destroy(mut self) {
        self.destroy_swapchain();
        // surface 在 swapchain 之后释放
        drop(self.surface);
    }
}
