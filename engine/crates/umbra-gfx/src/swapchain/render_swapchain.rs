use ash::vk;

use crate::{
    commands::{command_queue::GfxCommandQueue, semaphore::GfxSemaphore},
    error::{GfxResult, VkResultExt},
    gfx::Gfx,
    resources::image_view::GfxImageView,
    swapchain::surface::GfxSurface,
};

/// acquire 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxAcquireOutcome {
    Ready,
    /// image 已经 acquire，本帧照常绘制并 present，之后重建
    Suboptimal,
    /// 没有拿到 image
    OutOfDate,
}
impl GfxAcquireOutcome {
    /// 拿到 image 之后必须 present，否则 acquire semaphore 的信号不会被消费
    #[inline]
    pub fn acquired(self) -> bool {
        self != Self::OutOfDate
    }

    #[inline]
    pub fn needs_rebuild(self) -> bool {
        self != Self::Ready
    }

    /// 返回结果以及拿到的 image index
    fn classify(result: Result<(u32, bool), vk::Result>) -> GfxResult<(Self, Option<usize>)> {
        match result {
            Ok((index, false)) => Ok((Self::Ready, Some(index as usize))),
            Ok((index, true)) => Ok((Self::Suboptimal, Some(index as usize))),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok((Self::OutOfDate, None)),
            Err(e) => Err(e.into()),
        }
    }
}

/// 窗口 swapchain 以及每个 image 的 view
///
/// present 返回 `true` 表示 swapchain 需要按窗口尺寸重建
pub struct GfxRenderSwapchain {
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<GfxImageView>,
    current: usize,

    format: vk::Format,
    extent: vk::Extent2D,
}
impl GfxRenderSwapchain {
    const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    pub fn new(surface: &GfxSurface, vsync: bool, window_extent: vk::Extent2D) -> GfxResult<Self> {
        let caps = surface.capabilities()?;
        let surface_format = Self::pick_format(&surface.formats()?);
        let present_mode = Self::pick_present_mode(&surface.present_modes()?, vsync);
        let extent = Self::fit_extent(&caps, window_extent);
        let min_images = Self::min_image_count(&caps);

        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle)
            .min_image_count(min_images)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let device = Gfx::get().device();
        let handle =
            unsafe { device.swapchain.create_swapchain(&info, None) }.or_creation_failure("Swapchain::main")?;
        device.name_handle(handle, "Swapchain::main");

        let images = unsafe { device.swapchain.get_swapchain_images(handle) }.or_creation_failure("Swapchain::images")?;
        let views = images
            .iter()
            .enumerate()
            .map(|(i, image)| {
                device.name_handle(*image, &format!("Image::swapchain-{i}"));
                GfxImageView::new_2d(*image, surface_format.format, vk::ImageAspectFlags::COLOR, &format!("swapchain-{i}"))
            })
            .collect::<GfxResult<Vec<_>>>()?;

        log::info!(
            "create swapchain {}x{} (window {}x{}), {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            window_extent.width,
            window_extent.height,
            images.len(),
            surface_format.format,
            present_mode
        );
        Ok(Self {
            handle,
            images,
            views,
            current: 0,
            format: surface_format.format,
            extent,
        })
    }

    pub fn destroy(self) {
        for view in self.views {
            view.destroy();
        }
        unsafe { Gfx::get().device().swapchain.destroy_swapchain(self.handle, None) };
    }
}
// 创建参数
impl GfxRenderSwapchain {
    /// current_extent 为 u32::MAX 时由窗口决定尺寸
    fn fit_extent(caps: &vk::SurfaceCapabilitiesKHR, window: vk::Extent2D) -> vk::Extent2D {
        if caps.current_extent.width != u32::MAX && caps.current_extent.height != u32::MAX {
            return caps.current_extent;
        }
        vk::Extent2D {
            width: window.width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: window.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }

    /// 比最小值多一张；max_image_count 为 0 表示没有上限
    fn min_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
        let wanted = caps.min_image_count + 1;
        match caps.max_image_count {
            0 => wanted,
            max => wanted.min(max),
        }
    }

    /// gamma 在 lighting shader 中处理，因此优先 UNORM
    fn pick_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
        formats
            .iter()
            .copied()
            .find(|f| f.format == Self::PREFERRED_FORMAT.format && f.color_space == Self::PREFERRED_FORMAT.color_space)
            .or_else(|| formats.first().copied())
            .unwrap_or(Self::PREFERRED_FORMAT)
    }

    fn pick_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
        if vsync {
            return vk::PresentModeKHR::FIFO;
        }
        [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
            .into_iter()
            .find(|mode| modes.contains(mode))
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }
}
// 每帧
impl GfxRenderSwapchain {
    /// acquire 完成时 signal `semaphore`
    pub fn acquire(&mut self, semaphore: &GfxSemaphore, timeout_ns: u64) -> GfxResult<GfxAcquireOutcome> {
        let result = unsafe {
            Gfx::get().device().swapchain.acquire_next_image(self.handle, timeout_ns, semaphore.handle(), vk::Fence::null())
        };
        let (outcome, index) = GfxAcquireOutcome::classify(result)?;
        if let Some(index) = index {
            self.current = index;
        }
        if outcome != GfxAcquireOutcome::Ready {
            log::debug!("swapchain is {outcome:?} at acquire");
        }
        Ok(outcome)
    }

    pub fn present(&self, queue: &GfxCommandQueue, wait: &GfxSemaphore) -> GfxResult<bool> {
        let waits = [wait.handle()];
        let swapchains = [self.handle];
        let indices = [self.current as u32];
        let info = vk::PresentInfoKHR::default().wait_semaphores(&waits).swapchains(&swapchains).image_indices(&indices);

        match unsafe { Gfx::get().device().swapchain.queue_present(queue.handle(), &info) } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::debug!("swapchain is out of date at present");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}
// getters
impl GfxRenderSwapchain {
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn current_image(&self) -> vk::Image {
        self.images[self.current]
    }

    #[inline]
    pub fn current_view(&self) -> vk::ImageView {
        self.views[self.current].handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(current: vk::Extent2D, min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 16, height: 16 },
            max_image_extent: vk::Extent2D { width: 2048, height: 2048 },
            min_image_count: min_count,
            max_image_count: max_count,
            ..Default::default()
        }
    }

    const UNDEFINED: vk::Extent2D = vk::Extent2D { width: u32::MAX, height: u32::MAX };

    #[test]
    fn surface_extent_wins_when_defined() {
        let window = vk::Extent2D { width: 1280, height: 720 };
        let surface = vk::Extent2D { width: 640, height: 480 };
        assert_eq!(GfxRenderSwapchain::fit_extent(&caps(surface, 2, 3), window), surface);
        assert_eq!(GfxRenderSwapchain::fit_extent(&caps(UNDEFINED, 2, 3), window), window);
    }

    #[test]
    fn window_extent_is_clamped() {
        let window = vk::Extent2D { width: 4000, height: 8 };
        let fitted = GfxRenderSwapchain::fit_extent(&caps(UNDEFINED, 2, 3), window);
        assert_eq!(fitted, vk::Extent2D { width: 2048, height: 16 });
    }

    #[test]
    fn one_image_above_minimum() {
        assert_eq!(GfxRenderSwapchain::min_image_count(&caps(UNDEFINED, 2, 0)), 3);
        assert_eq!(GfxRenderSwapchain::min_image_count(&caps(UNDEFINED, 3, 3)), 3);
    }

    #[test]
    fn vsync_forces_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(GfxRenderSwapchain::pick_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
        assert_eq!(GfxRenderSwapchain::pick_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(GfxRenderSwapchain::pick_present_mode(&[], false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn unorm_format_is_preferred() {
        let srgb = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let picked = GfxRenderSwapchain::pick_format(&[srgb, GfxRenderSwapchain::PREFERRED_FORMAT]);
        assert_eq!(picked.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(GfxRenderSwapchain::pick_format(&[srgb]).format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn suboptimal_acquire_still_yields_an_image() {
        let (outcome, index) = GfxAcquireOutcome::classify(Ok((2, true))).unwrap();
        assert_eq!(outcome, GfxAcquireOutcome::Suboptimal);
        assert_eq!(index, Some(2));
        assert!(outcome.acquired());
        assert!(outcome.needs_rebuild());

        let (outcome, index) = GfxAcquireOutcome::classify(Ok((1, false))).unwrap();
        assert_eq!((outcome, index), (GfxAcquireOutcome::Ready, Some(1)));
        assert!(!outcome.needs_rebuild());
    }

    #[test]
    fn out_of_date_acquire_yields_nothing() {
        let (outcome, index) = GfxAcquireOutcome::classify(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap();
        assert_eq!(outcome, GfxAcquireOutcome::OutOfDate);
        assert_eq!(index, None);
        assert!(!outcome.acquired());
        assert!(outcome.needs_rebuild());

        assert!(GfxAcquireOutcome::classify(Err(vk::Result::ERROR_DEVICE_LOST)).is_err());
    }
}
