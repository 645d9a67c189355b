use ash::vk;
use vk_mem::Alloc;

use crate::{
    commands::{barrier::GfxImageBarrier, image_state::GfxImageState},
    error::{GfxError, GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
    resources::buffer::GfxBuffer,
};

/// 和 format 有关的查询
pub struct VulkanFormatUtils;
impl VulkanFormatUtils {
    /// 上传时每个像素的字节数，压缩格式等不支持上传的格式返回 None
    pub fn pixel_size_in_bytes(format: vk::Format) -> Option<usize> {
        match format {
            vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8G8B8A8_SRGB
            | vk::Format::B8G8R8A8_UNORM
            | vk::Format::B8G8R8A8_SRGB
            | vk::Format::R32_SFLOAT
            | vk::Format::D32_SFLOAT => Some(4),
            vk::Format::R16G16B16A16_SFLOAT => Some(8),
            vk::Format::R32G32B32A32_SFLOAT => Some(16),
            _ => None,
        }
    }

    #[inline]
    pub fn is_depth_format(format: vk::Format) -> bool {
        matches!(
            format,
            vk::Format::D16_UNORM
                | vk::Format::D32_SFLOAT
                | vk::Format::D24_UNORM_S8_UINT
                | vk::Format::D32_SFLOAT_S8_UINT
                | vk::Format::X8_D24_UNORM_PACK32
        )
    }

    #[inline]
    pub fn aspect_of(format: vk::Format) -> vk::ImageAspectFlags {
        if Self::is_depth_format(format) { vk::ImageAspectFlags::DEPTH } else { vk::ImageAspectFlags::COLOR }
    }
}

/// 单 mip、单 layer 的 2D image，内存由 VMA 分配
///
/// 需要手动 [`GfxImage::destroy`]
pub struct GfxImage {
    handle: vk::Image,
    allocation: vk_mem::Allocation,
    extent: vk::Extent2D,
    format: vk::Format,
    name: String,
}
// 创建与销毁
impl GfxImage {
    pub fn new_2d(
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        name: &str,
    ) -> GfxResult<Self> {
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent.into())
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };

        let (handle, allocation) = unsafe { Gfx::get().allocator().create_image(&info, &alloc_info) }
            .or_creation_failure(format!("Image::{name}"))?;
        let image = Self {
            handle,
            allocation,
            extent,
            format,
            name: name.to_string(),
        };
        Gfx::get().device().name_object(&image, name);
        Ok(image)
    }

    /// 上传 RGBA8 像素，返回时 image 已经处于 shader 可读状态
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8], name: &str) -> GfxResult<Self> {
        let image = Self::new_2d(
            vk::Extent2D { width, height },
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            name,
        )?;

        let upload = image.check_upload_size(pixels.len()).and_then(|size| {
            let staging = GfxBuffer::staging(size, &format!("{name}-staging"))?;
            staging.write(0, pixels)?;
            staging.flush(0, size)?;
            Gfx::get().submit_immediate(&format!("{name}-upload"), |cmd| {
                let to_dst = GfxImageBarrier::color(image.handle, GfxImageState::UNDEFINED, GfxImageState::TRANSFER_DST);
                let to_read =
                    GfxImageBarrier::color(image.handle, GfxImageState::TRANSFER_DST, GfxImageState::SHADER_READ_ALL);
                cmd.pipeline_barrier(&[to_dst]);
                cmd.copy_buffer_to_image(&staging, image.handle, image.extent);
                cmd.pipeline_barrier(&[to_read]);
            })
        });
        match upload {
            Ok(()) => Ok(image),
            Err(e) => {
                image.destroy();
                Err(e)
            }
        }
    }

    pub fn destroy(mut self) {
        log::debug!("destroy image {}", self.name);
        unsafe { Gfx::get().allocator().destroy_image(self.handle, &mut self.allocation) };
    }

    fn check_upload_size(&self, len: usize) -> GfxResult<vk::DeviceSize> {
        let pixel_size = VulkanFormatUtils::pixel_size_in_bytes(self.format)
            .ok_or_else(|| GfxError::creation(&self.name, format!("cannot upload {:?}", self.format)))?;
        let expected = pixel_size * (self.extent.width * self.extent.height) as usize;
        if len != expected {
            return Err(GfxError::creation(&self.name, format!("got {len} bytes of pixels, expected {expected}")));
        }
        Ok(len as vk::DeviceSize)
    }
}
// getters
impl GfxImage {
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    #[inline]
    pub fn extent_2d(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl VkObject for GfxImage {
    const KIND: &'static str = "Image";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_sizes_of_render_target_formats() {
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R32G32B32A32_SFLOAT), Some(16));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R8G8B8A8_UNORM), Some(4));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::BC1_RGB_UNORM_BLOCK), None);
    }

    #[test]
    fn depth_formats_use_depth_aspect() {
        assert_eq!(VulkanFormatUtils::aspect_of(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert_eq!(VulkanFormatUtils::aspect_of(vk::Format::R32G32B32A32_SFLOAT), vk::ImageAspectFlags::COLOR);
    }
}
