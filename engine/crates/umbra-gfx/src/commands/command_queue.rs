use ash::vk;

use crate::{commands::submit::GfxSubmitBatch, error::GfxResult, foundation::device::GfxDevice, gfx::Gfx};

/// 唯一的 queue，随 device 一起销毁
pub struct GfxCommandQueue {
    handle: vk::Queue,
}
impl GfxCommandQueue {
    pub(crate) fn new(device: &GfxDevice, family_index: u32) -> Self {
        Self {
            handle: unsafe { device.get_device_queue(family_index, 0) },
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    /// 帧之间的依赖全部由 semaphore 表达，不使用 `vk::Fence`
    pub fn submit(&self, batches: &[GfxSubmitBatch]) -> GfxResult<()> {
        let infos: Vec<_> = batches.iter().map(GfxSubmitBatch::as_vk).collect();
        unsafe { Gfx::get().device().queue_submit2(self.handle, &infos, vk::Fence::null()) }?;
        Ok(())
    }

    #[inline]
    pub fn wait_idle(&self) -> GfxResult<()> {
        unsafe { Gfx::get().device().queue_wait_idle(self.handle) }?;
        Ok(())
    }
}
