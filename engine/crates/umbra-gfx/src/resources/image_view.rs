use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// 覆盖整张 2D image 的 view，需要手动 [`GfxImageView::destroy`]
pub struct GfxImageView {
    handle: vk::ImageView,
    format: vk::Format,
}
impl GfxImageView {
    /// `format` 可以和 image 的 format 不同，只要二者兼容
    pub fn new_2d(image: vk::Image, format: vk::Format, aspect: vk::ImageAspectFlags, name: &str) -> GfxResult<Self> {
        let range = vk::ImageSubresourceRange::default().aspect_mask(aspect).level_count(1).layer_count(1);
        let info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(range);

        let device = Gfx::get().device();
        let handle = unsafe { device.create_image_view(&info, None) }.or_creation_failure(format!("ImageView::{name}"))?;
        let view = Self { handle, format };
        device.name_object(&view, name);
        Ok(view)
    }

    pub fn destroy(self) {
        unsafe { Gfx::get().device().destroy_image_view(self.handle, None) };
    }

    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}
impl VkObject for GfxImageView {
    const KIND: &'static str = "ImageView";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
