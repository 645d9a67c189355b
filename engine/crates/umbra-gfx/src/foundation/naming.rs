use std::ffi::CString;

use ash::vk;

/// 可以在 RenderDoc 等工具中显示名字的 vulkan 对象
pub trait VkObject {
    /// 名字的前缀，例如 `Image`
    const KIND: &'static str;

    fn raw(&self) -> impl vk::Handle;
}

/// 对象在调试工具中显示的完整名字
#[inline]
pub fn object_name<T: VkObject>(name: &str) -> String {
    format!("{}::{}", T::KIND, name)
}

/// 设置失败不影响渲染，只记录日志
pub(crate) fn name_raw(debug_utils: &ash::ext::debug_utils::Device, handle: impl vk::Handle, name: &str) {
    let Ok(c_name) = CString::new(name) else {
        log::warn!("skip debug name with interior nul: {name:?}");
        return;
    };
    let info = vk::DebugUtilsObjectNameInfoEXT::default().object_handle(handle).object_name(&c_name);
    if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&info) } {
        log::warn!("set debug name {name:?} failed: {e:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeImage;
    impl VkObject for FakeImage {
        const KIND: &'static str = "Image";
        fn raw(&self) -> impl vk::Handle {
            vk::Image::null()
        }
    }

    #[test]
    fn name_is_prefixed_with_kind() {
        assert_eq!(object_name::<FakeImage>("gbuffer-0-A"), "Image::gbuffer-0-A");
    }
}
