use std::ffi::CString;

use ash::vk;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// 只在创建 pipeline 期间存活，drop 时销毁
pub struct GfxShaderModule {
    handle: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
    entry_point: CString,
}
impl GfxShaderModule {
    /// `spirv` 的长度必须是 4 的整数倍
    pub fn new(spirv: &[u8], stage: vk::ShaderStageFlags, entry_point: &str, name: &str) -> GfxResult<Self> {
        let what = format!("ShaderModule::{name}");
        let words = ash::util::read_spv(&mut std::io::Cursor::new(spirv)).map_err(|e| GfxError::creation(&what, e))?;
        let entry_point = CString::new(entry_point).map_err(|e| GfxError::creation(&what, e))?;

        let device = Gfx::get().device();
        let info = vk::ShaderModuleCreateInfo::default().code(&words);
        let handle = unsafe { device.create_shader_module(&info, None) }.or_creation_failure(&what)?;

        let module = Self {
            handle,
            stage,
            entry_point,
        };
        device.name_object(&module, name);
        Ok(module)
    }

    #[inline]
    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.stage
    }

    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage)
            .module(self.handle)
            .name(&self.entry_point)
    }
}
impl Drop for GfxShaderModule {
    fn drop(&mut self) {
        unsafe { Gfx::get().device().destroy_shader_module(self.handle, None) };
    }
}
impl VkObject for GfxShaderModule {
    const KIND: &'static str = "ShaderModule";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
