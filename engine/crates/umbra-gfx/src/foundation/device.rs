use std::{ffi::CStr, ops::Deref};

use ash::vk;

use crate::{
    error::{GfxResult, VkResultExt},
    foundation::{
        instance::GfxInstance,
        naming::{self, VkObject},
        physical_device::GfxPhysicalDevice,
    },
};

/// 逻辑设备以及用到的扩展函数表
///
/// deref 到 `ash::Device`，核心函数直接调用
pub struct GfxDevice {
    device: ash::Device,

    pub(crate) dynamic_rendering: ash::khr::dynamic_rendering::Device,
    /// 每个 pass 的 render target 通过 push descriptor 绑定
    pub(crate) push_descriptor: ash::khr::push_descriptor::Device,
    pub(crate) swapchain: ash::khr::swapchain::Device,
    pub(crate) debug_utils: ash::ext::debug_utils::Device,
}
impl GfxDevice {
    const EXTENSIONS: [&'static CStr; 3] = [
        ash::khr::swapchain::NAME,
        ash::khr::dynamic_rendering::NAME,
        ash::khr::push_descriptor::NAME,
    ];

    /// 只创建一个 queue，所有 pass 在上面串行执行
    pub fn new(instance: &GfxInstance, gpu: &GfxPhysicalDevice) -> GfxResult<Self> {
        let _span = tracy_client::span!("GfxDevice::new");
        let ash_instance = instance.ash_instance();

        let priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(gpu.queue_family_index())
            .queue_priorities(&priorities)];

        let ext_ptrs = Self::EXTENSIONS.map(|ext| ext.as_ptr());
        log::info!("device extensions: {:?}", Self::EXTENSIONS);

        let core_features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(true)
            .fragment_stores_and_atomics(true)
            // G-Buffer 的每个 attachment 各自设置 blend
            .independent_blend(true)
            .shader_sampled_image_array_dynamic_indexing(true)
            .shader_storage_image_array_dynamic_indexing(true);
        let mut vk13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(true);
        let mut vk12 = vk::PhysicalDeviceVulkan12Features::default()
            .timeline_semaphore(true)
            // bindless 表：部分槽位为空，运行时更新
            .runtime_descriptor_array(true)
            .descriptor_binding_partially_bound(true)
            .shader_sampled_image_array_non_uniform_indexing(true)
            .descriptor_binding_sampled_image_update_after_bind(true)
            .descriptor_binding_storage_image_update_after_bind(true);
        let mut features = vk::PhysicalDeviceFeatures2::default()
            .features(core_features)
            .push_next(&mut vk12)
            .push_next(&mut vk13);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&ext_ptrs)
            .push_next(&mut features);
        let device =
            unsafe { ash_instance.create_device(gpu.handle(), &create_info, None) }.or_creation_failure("Device")?;

        Ok(Self {
            dynamic_rendering: ash::khr::dynamic_rendering::Device::new(ash_instance, &device),
            push_descriptor: ash::khr::push_descriptor::Device::new(ash_instance, &device),
            swapchain: ash::khr::swapchain::Device::new(ash_instance, &device),
            debug_utils: ash::ext::debug_utils::Device::new(ash_instance, &device),
            device,
        })
    }

    pub fn destroy(self) {
        log::info!("destroy device");
        unsafe { self.device.destroy_device(None) };
    }
}
// tools
impl GfxDevice {
    #[inline]
    pub fn name_object<T: VkObject>(&self, object: &T, name: &str) {
        naming::name_raw(&self.debug_utils, object.raw(), &naming::object_name::<T>(name));
    }

    /// 没有 [`VkObject`] 封装的 handle，例如 queue 以及 swapchain image
    #[inline]
    pub fn name_handle(&self, handle: impl vk::Handle, name: &str) {
        naming::name_raw(&self.debug_utils, handle, name);
    }

    #[inline]
    pub fn update_descriptors(&self, writes: &[vk::WriteDescriptorSet]) {
        unsafe { self.device.update_descriptor_sets(writes, &[]) };
    }

    #[inline]
    pub fn wait_idle(&self) -> GfxResult<()> {
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }
}
impl Deref for GfxDevice {
    type Target = ash::Device;

    #[inline]
    fn deref(&self) -> &ash::Device {
        &self.device
    }
}
