use ash::vk;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// binary 或 timeline semaphore
///
/// 只持有 handle，可以 Clone；需要调用 [`GfxSemaphore::destroy`]
#[derive(Clone)]
pub struct GfxSemaphore {
    handle: vk::Semaphore,
    name: String,
}
impl GfxSemaphore {
    /// binary semaphore，用于 acquire 和 present
    pub fn new(name: &str) -> GfxResult<Self> {
        Self::create(&mut vk::SemaphoreTypeCreateInfo::default().semaphore_type(vk::SemaphoreType::BINARY), name)
    }

    /// timeline semaphore，计数从 `initial` 开始
    pub fn new_timeline(initial: u64, name: &str) -> GfxResult<Self> {
        Self::create(
            &mut vk::SemaphoreTypeCreateInfo::default().semaphore_type(vk::SemaphoreType::TIMELINE).initial_value(initial),
            name,
        )
    }

    fn create(type_info: &mut vk::SemaphoreTypeCreateInfo, name: &str) -> GfxResult<Self> {
        let device = Gfx::get().device();
        let info = vk::SemaphoreCreateInfo::default().push_next(type_info);
        let handle =
            unsafe { device.create_semaphore(&info, None) }.or_creation_failure(format!("Semaphore::{name}"))?;

        let semaphore = Self {
            handle,
            name: name.to_string(),
        };
        device.name_object(&semaphore, name);
        Ok(semaphore)
    }

    pub fn destroy(self) {
        unsafe { Gfx::get().device().destroy_semaphore(self.handle, None) };
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
// timeline
impl GfxSemaphore {
    /// 阻塞到计数达到 `value`；超时返回 [`GfxError::FenceTimeout`]
    pub fn wait_timeline(&self, value: u64, timeout_ns: u64) -> GfxResult<()> {
        let _span = tracy_client::span!("GfxSemaphore::wait_timeline");
        let handles = [self.handle];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::default().semaphores(&handles).values(&values);

        unsafe { Gfx::get().device().wait_semaphores(&info, timeout_ns) }.map_err(|e| match e {
            vk::Result::TIMEOUT => GfxError::FenceTimeout {
                name: self.name.clone(),
                value,
            },
            other => other.into(),
        })
    }

    #[inline]
    pub fn counter_value(&self) -> GfxResult<u64> {
        Ok(unsafe { Gfx::get().device().get_semaphore_counter_value(self.handle) }?)
    }
}
impl VkObject for GfxSemaphore {
    const KIND: &'static str = "Semaphore";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
