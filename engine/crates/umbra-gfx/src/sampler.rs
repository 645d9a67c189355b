use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// 不使用 mipmap，三个方向的 address mode 相同
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GfxSamplerDesc {
    pub filter: vk::Filter,
    pub address_mode: vk::SamplerAddressMode,
    /// 0 表示关闭各向异性过滤
    pub max_anisotropy: u32,
}
impl GfxSamplerDesc {
    pub const fn linear_repeat() -> Self {
        Self {
            filter: vk::Filter::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: 0,
        }
    }

    /// 按像素读取 render target
    pub const fn point_clamp() -> Self {
        Self {
            filter: vk::Filter::NEAREST,
            address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            max_anisotropy: 0,
        }
    }

    pub const fn anisotropic_clamp(max_anisotropy: u32) -> Self {
        Self {
            filter: vk::Filter::LINEAR,
            address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            max_anisotropy,
        }
    }

    /// 超过 GPU 上限时截断
    fn anisotropy(&self, device_max: f32) -> Option<f32> {
        (self.max_anisotropy > 0).then(|| (self.max_anisotropy as f32).min(device_max))
    }
}

pub struct GfxSampler {
    handle: vk::Sampler,
}
impl GfxSampler {
    pub fn new(desc: &GfxSamplerDesc, name: &str) -> GfxResult<Self> {
        let mipmap_mode = match desc.filter {
            vk::Filter::NEAREST => vk::SamplerMipmapMode::NEAREST,
            _ => vk::SamplerMipmapMode::LINEAR,
        };
        let anisotropy = desc.anisotropy(Gfx::get().gpu().limits().max_sampler_anisotropy);

        let info = vk::SamplerCreateInfo::default()
            .mag_filter(desc.filter)
            .min_filter(desc.filter)
            .mipmap_mode(mipmap_mode)
            .address_mode_u(desc.address_mode)
            .address_mode_v(desc.address_mode)
            .address_mode_w(desc.address_mode)
            .anisotropy_enable(anisotropy.is_some())
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK);

        let device = Gfx::get().device();
        let handle = unsafe { device.create_sampler(&info, None) }.or_creation_failure(format!("Sampler::{name}"))?;
        let sampler = Self { handle };
        device.name_object(&sampler, name);
        Ok(sampler)
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.handle
    }
}
impl Drop for GfxSampler {
    fn drop(&mut self) {
        unsafe { Gfx::get().device().destroy_sampler(self.handle, None) };
    }
}
impl VkObject for GfxSampler {
    const KIND: &'static str = "Sampler";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anisotropy_is_clamped_to_device_limit() {
        assert_eq!(GfxSamplerDesc::anisotropic_clamp(16).anisotropy(8.0), Some(8.0));
        assert_eq!(GfxSamplerDesc::anisotropic_clamp(4).anisotropy(16.0), Some(4.0));
        assert_eq!(GfxSamplerDesc::linear_repeat().anisotropy(16.0), None);
    }
}
