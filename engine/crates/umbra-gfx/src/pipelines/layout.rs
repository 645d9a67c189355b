use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// drop 时销毁
pub struct GfxDescriptorSetLayout {
    handle: vk::DescriptorSetLayout,
}
impl GfxDescriptorSetLayout {
    /// `binding_flags` 为空表示不需要 binding flags，否则和 `bindings` 一一对应
    pub fn new(
        bindings: &[vk::DescriptorSetLayoutBinding],
        binding_flags: &[vk::DescriptorBindingFlags],
        flags: vk::DescriptorSetLayoutCreateFlags,
        name: &str,
    ) -> GfxResult<Self> {
        debug_assert!(binding_flags.is_empty() || binding_flags.len() == bindings.len());

        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(binding_flags);
        let mut info = vk::DescriptorSetLayoutCreateInfo::default().flags(flags).bindings(bindings);
        if !binding_flags.is_empty() {
            info = info.push_next(&mut flags_info);
        }

        let device = Gfx::get().device();
        let handle = unsafe { device.create_descriptor_set_layout(&info, None) }
            .or_creation_failure(format!("DescriptorSetLayout::{name}"))?;
        let layout = Self { handle };
        device.name_object(&layout, name);
        Ok(layout)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }
}
impl Drop for GfxDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe { Gfx::get().device().destroy_descriptor_set_layout(self.handle, None) };
    }
}
impl VkObject for GfxDescriptorSetLayout {
    const KIND: &'static str = "DescriptorSetLayout";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}

/// drop 时销毁
pub struct GfxPipelineLayout {
    handle: vk::PipelineLayout,
}
impl GfxPipelineLayout {
    pub fn new(
        set_layouts: &[vk::DescriptorSetLayout],
        push_constants: &[vk::PushConstantRange],
        name: &str,
    ) -> GfxResult<Self> {
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(set_layouts)
            .push_constant_ranges(push_constants);

        let device = Gfx::get().device();
        let handle = unsafe { device.create_pipeline_layout(&info, None) }
            .or_creation_failure(format!("PipelineLayout::{name}"))?;
        let layout = Self { handle };
        device.name_object(&layout, name);
        Ok(layout)
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }
}
impl Drop for GfxPipelineLayout {
    fn drop(&mut self) {
        unsafe { Gfx::get().device().destroy_pipeline_layout(self.handle, None) };
    }
}
impl VkObject for GfxPipelineLayout {
    const KIND: &'static str = "PipelineLayout";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
