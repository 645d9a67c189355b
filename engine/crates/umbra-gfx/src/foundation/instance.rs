use std::ffi::{CStr, CString};

use ash::vk;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::validation,
};

/// vulkan loader、instance 以及 validation 消息的转发
///
/// `entry` 被 drop 时会卸载动态库，必须在 instance 销毁之后
pub struct GfxInstance {
    entry: ash::Entry,
    instance: ash::Instance,

    debug_utils: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}
impl GfxInstance {
    const API_VERSION: u32 = vk::API_VERSION_1_3;

    /// `window_exts` 是窗口系统要求的 surface 扩展
    pub fn new(app_name: &str, engine_name: &str, window_exts: &[&'static CStr]) -> GfxResult<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GfxError::creation("vulkan loader", e))?;

        let app_name = CString::new(app_name).map_err(|e| GfxError::creation("Instance", e))?;
        let engine_name = CString::new(engine_name).map_err(|e| GfxError::creation("Instance", e))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .engine_name(&engine_name)
            .api_version(Self::API_VERSION);

        let exts = Self::required_exts(&entry, window_exts)?;
        log::info!("instance extensions: {:?}", exts);
        let ext_ptrs: Vec<_> = exts.iter().map(|ext| ext.as_ptr()).collect();

        // 挂在 instance 上的 messenger 覆盖 instance 自身的创建与销毁
        let mut messenger_ci = validation::messenger_info();
        let instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&ext_ptrs)
            .push_next(&mut messenger_ci);
        let instance = unsafe { entry.create_instance(&instance_ci, None) }.or_creation_failure("Instance")?;

        let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&validation::messenger_info(), None) }
            .or_creation_failure("DebugUtilsMessenger")?;

        Ok(Self {
            entry,
            instance,
            debug_utils,
            messenger,
        })
    }

    /// debug utils 总是开启：messenger、对象命名、命令缓冲中的 label 都依赖它
    ///
    /// validation layer 由 vulkan configurator 控制
    fn required_exts(entry: &ash::Entry, window_exts: &[&'static CStr]) -> GfxResult<Vec<&'static CStr>> {
        let available = unsafe { entry.enumerate_instance_extension_properties(None) }.or_creation_failure("Instance")?;

        let mut exts = window_exts.to_vec();
        exts.push(ash::ext::debug_utils::NAME);
        exts.sort();
        exts.dedup();

        for ext in &exts {
            let found = available.iter().any(|props| props.extension_name_as_c_str().is_ok_and(|name| name == *ext));
            if !found {
                return Err(GfxError::creation("Instance", format!("extension {ext:?} is not available")));
            }
        }
        Ok(exts)
    }

    pub fn destroy(self) {
        log::info!("destroy instance");
        unsafe {
            self.debug_utils.destroy_debug_utils_messenger(self.messenger, None);
            self.instance.destroy_instance(None);
        }
        drop(self.entry);
    }
}
// getters
impl GfxInstance {
    #[inline]
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    #[inline]
    pub fn ash_instance(&self) -> &ash::Instance {
        &self.instance
    }
}
