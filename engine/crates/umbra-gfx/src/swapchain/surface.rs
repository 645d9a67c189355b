use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// 窗口的 surface，resize 时保留，只重建 swapchain
pub struct GfxSurface {
    pub(crate) handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}
impl GfxSurface {
    pub fn new(
        display: raw_window_handle::RawDisplayHandle,
        window: raw_window_handle::RawWindowHandle,
    ) -> GfxResult<Self> {
        let instance = Gfx::get().instance();
        let loader = ash::khr::surface::Instance::new(instance.entry(), instance.ash_instance());
        let handle =
            unsafe { ash_window::create_surface(instance.entry(), instance.ash_instance(), display, window, None) }
                .or_creation_failure("Surface::main")?;

        let surface = Self { handle, loader };
        Gfx::get().device().name_object(&surface, "main");
        Ok(surface)
    }
}
// 查询
impl GfxSurface {
    pub fn capabilities(&self) -> GfxResult<vk::SurfaceCapabilitiesKHR> {
        let gpu = Gfx::get().gpu().handle();
        Ok(unsafe { self.loader.get_physical_device_surface_capabilities(gpu, self.handle) }?)
    }

    pub fn formats(&self) -> GfxResult<Vec<vk::SurfaceFormatKHR>> {
        let gpu = Gfx::get().gpu().handle();
        Ok(unsafe { self.loader.get_physical_device_surface_formats(gpu, self.handle) }?)
    }

    pub fn present_modes(&self) -> GfxResult<Vec<vk::PresentModeKHR>> {
        let gpu = Gfx::get().gpu().handle();
        Ok(unsafe { self.loader.get_physical_device_surface_present_modes(gpu, self.handle) }?)
    }
}
impl Drop for GfxSurface {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_surface(self.handle, None) };
    }
}
impl VkObject for GfxSurface {
    const KIND: &'static str = "Surface";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
