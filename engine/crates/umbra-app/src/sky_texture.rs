use std::path::Path;

use ash::vk;
use image::RgbaImage;
use umbra_gfx::{
    error::GfxResult,
    resources::{image::GfxImage, image_view::GfxImageView},
};
use umbra_render_interface::descriptor_table::{DescriptorIndex, DescriptorTables, DescriptorUsage};

/// 天空球的纹理，注册在 bindless 表中
pub struct SkyTexture {
    image: GfxImage,
    view: GfxImageView,
    index: DescriptorIndex,
}
impl SkyTexture {
    const FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

    pub fn load(tables: &mut DescriptorTables, path: &Path) -> GfxResult<Self> {
        let pixels = load_pixels(path);
        let image = GfxImage::from_rgba8(pixels.width(), pixels.height(), pixels.as_raw(), "sky")?;
        let view = GfxImageView::new_2d(image.handle(), Self::FORMAT, vk::ImageAspectFlags::COLOR, "sky")?;

        let index = tables.bindless.allocate()?;
        tables.bindless.create_view(index, view.handle(), Self::FORMAT, image.extent_2d(), DescriptorUsage::Sampled);
        log::info!("sky texture {}x{} at bindless {}", pixels.width(), pixels.height(), index);

        Ok(Self { image, view, index })
    }

    /// shader 中使用的 index
    #[inline]
    pub fn bindless_index(&self) -> u32 {
        self.index.0
    }

    pub fn destroy(self) {
        self.view.destroy();
        self.image.destroy();
    }
}

/// 读取天空图片；文件不存在或者无法解码时使用渐变色代替
pub fn load_pixels(path: &Path) -> RgbaImage {
    match image::open(path) {
        Ok(img) => img.into_rgba8(),
        Err(e) => {
            log::warn!("failed to load sky {:?}: {e}, use gradient instead", path);
            gradient()
        }
    }
}

/// 上方为天顶色，下方为地平线色；球面的 v 从上到下
fn gradient() -> RgbaImage {
    const ZENITH: [f32; 3] = [0.18, 0.32, 0.62];
    const HORIZON: [f32; 3] = [0.75, 0.82, 0.92];
    const HEIGHT: u32 = 256;

    RgbaImage::from_fn(4, HEIGHT, |_, y| {
        let t = y as f32 / (HEIGHT - 1) as f32;
        let channel = |i: usize| ((ZENITH[i] + (HORIZON[i] - ZENITH[i]) * t) * 255.0).round() as u8;
        image::Rgba([channel(0), channel(1), channel(2), 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_gradient() {
        let pixels = load_pixels(Path::new("/definitely/not/here/sky.hdr"));
        assert_eq!(pixels.dimensions(), (4, 256));

        let top = pixels.get_pixel(0, 0);
        let bottom = pixels.get_pixel(3, 255);
        assert_eq!(top.0, [46, 82, 158, 255]);
        assert_eq!(bottom.0, [191, 209, 235, 255]);
        // 从上到下逐渐变亮
        assert!(pixels.get_pixel(0, 128).0[0] > top.0[0]);
    }
}
