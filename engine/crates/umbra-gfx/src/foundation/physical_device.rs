use ash::vk;

use crate::error::{GfxError, GfxResult, VkResultExt};

/// 选中的 GPU，以及其上同时支持 graphics、compute、transfer 的 queue family
///
/// 所有 pass 都提交到这个 family 的同一个 queue 上
pub struct GfxPhysicalDevice {
    handle: vk::PhysicalDevice,
    props: vk::PhysicalDeviceProperties,
    queue_family_index: u32,
}
impl GfxPhysicalDevice {
    const REQUIRED_QUEUE_FLAGS: vk::QueueFlags = vk::QueueFlags::from_raw(
        vk::QueueFlags::GRAPHICS.as_raw() | vk::QueueFlags::COMPUTE.as_raw() | vk::QueueFlags::TRANSFER.as_raw(),
    );

    /// 独立显卡优先，否则使用第一个满足要求的 GPU
    pub fn pick(instance: &ash::Instance) -> GfxResult<Self> {
        let candidates: Vec<Self> = unsafe { instance.enumerate_physical_devices() }
            .or_creation_failure("PhysicalDevice")?
            .into_iter()
            .filter_map(|handle| Self::inspect(instance, handle))
            .collect();

        let picked = candidates
            .iter()
            .position(|gpu| gpu.props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
            .unwrap_or(0);
        let gpu = candidates
            .into_iter()
            .nth(picked)
            .ok_or_else(|| GfxError::creation("PhysicalDevice", "no gpu has a graphics + compute queue family"))?;

        log::info!("use gpu {} with queue family {}", gpu.name(), gpu.queue_family_index);
        Ok(gpu)
    }

    fn inspect(instance: &ash::Instance, handle: vk::PhysicalDevice) -> Option<Self> {
        let props = unsafe { instance.get_physical_device_properties(handle) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(handle) };

        let gpu_name = props.device_name_as_c_str().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let Some(queue_family_index) = Self::find_queue_family(&families) else {
            log::warn!("skip gpu {gpu_name}: no queue family supports {:?}", Self::REQUIRED_QUEUE_FLAGS);
            return None;
        };
        log::info!("found gpu {gpu_name} ({:?})", props.device_type);

        Some(Self {
            handle,
            props,
            queue_family_index,
        })
    }

    fn find_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
        families
            .iter()
            .position(|family| family.queue_flags.contains(Self::REQUIRED_QUEUE_FLAGS) && family.queue_count > 0)
            .map(|i| i as u32)
    }
}
// getters
impl GfxPhysicalDevice {
    #[inline]
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    #[inline]
    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.props.limits
    }

    pub fn name(&self) -> String {
        self.props.device_name_as_c_str().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn picks_first_family_with_all_capabilities() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 0),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1),
        ];
        assert_eq!(GfxPhysicalDevice::find_queue_family(&families), Some(2));
    }

    #[test]
    fn compute_only_gpu_is_rejected() {
        let families = [family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 4)];
        assert_eq!(GfxPhysicalDevice::find_queue_family(&families), None);
    }
}
