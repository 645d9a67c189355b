use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// descriptor set 不单独释放，和 pool 一起销毁
pub struct GfxDescriptorPool {
    handle: vk::DescriptorPool,
}
impl GfxDescriptorPool {
    pub fn new(
        flags: vk::DescriptorPoolCreateFlags,
        max_sets: u32,
        sizes: &[vk::DescriptorPoolSize],
        name: &str,
    ) -> GfxResult<Self> {
        let info = vk::DescriptorPoolCreateInfo::default().flags(flags).max_sets(max_sets).pool_sizes(sizes);
        let device = Gfx::get().device();
        let handle = unsafe { device.create_descriptor_pool(&info, None) }
            .or_creation_failure(format!("DescriptorPool::{name}"))?;

        let pool = Self { handle };
        device.name_object(&pool, name);
        Ok(pool)
    }

    pub fn allocate_set(&self, layout: vk::DescriptorSetLayout, name: &str) -> GfxResult<vk::DescriptorSet> {
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default().descriptor_pool(self.handle).set_layouts(&layouts);

        let device = Gfx::get().device();
        let set = unsafe { device.allocate_descriptor_sets(&info) }
            .or_creation_failure(format!("DescriptorSet::{name}"))?
            .remove(0);
        device.name_handle(set, &format!("DescriptorSet::{name}"));
        Ok(set)
    }
}
impl Drop for GfxDescriptorPool {
    fn drop(&mut self) {
        unsafe { Gfx::get().device().destroy_descriptor_pool(self.handle, None) };
    }
}
impl VkObject for GfxDescriptorPool {
    const KIND: &'static str = "DescriptorPool";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
