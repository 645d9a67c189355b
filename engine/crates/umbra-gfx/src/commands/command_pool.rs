use ash::vk;

use crate::{
    commands::command_buffer::GfxCommandBuffer,
    error::{GfxResult, VkResultExt},
    foundation::{device::GfxDevice, naming::VkObject},
    gfx::Gfx,
};

/// TRANSIENT pool，一次性 reset 其中所有的命令缓冲
pub struct GfxCommandPool {
    handle: vk::CommandPool,
    name: String,
}
impl GfxCommandPool {
    pub fn new(name: &str) -> GfxResult<Self> {
        let gfx = Gfx::get();
        Self::create(gfx.device(), gfx.queue_family_index(), name)
    }

    /// 单例还没有就绪时，显式传入 device
    pub(crate) fn create(device: &GfxDevice, family_index: u32, name: &str) -> GfxResult<Self> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);
        let handle = unsafe { device.create_command_pool(&info, None) }.or_creation_failure(format!("CommandPool::{name}"))?;

        let pool = Self {
            handle,
            name: name.to_string(),
        };
        device.name_object(&pool, name);
        Ok(pool)
    }

    pub fn allocate(&self, name: &str) -> GfxResult<GfxCommandBuffer> {
        let device = Gfx::get().device();
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.handle)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let handles =
            unsafe { device.allocate_command_buffers(&info) }.or_creation_failure(format!("CommandBuffer::{name}"))?;

        let cmd = GfxCommandBuffer::from_handle(handles[0]);
        device.name_object(&cmd, name);
        Ok(cmd)
    }

    pub fn free(&self, cmd: GfxCommandBuffer) {
        unsafe { Gfx::get().device().free_command_buffers(self.handle, &[cmd.handle()]) };
    }

    /// pool 中所有的命令缓冲回到 initial 状态，调用方保证 GPU 已经执行完毕
    pub fn reset(&self) -> GfxResult<()> {
        unsafe { Gfx::get().device().reset_command_pool(self.handle, vk::CommandPoolResetFlags::empty()) }?;
        Ok(())
    }

    pub fn destroy(self) {
        self.destroy_with(Gfx::get().device());
    }

    pub(crate) fn destroy_with(self, device: &GfxDevice) {
        log::debug!("destroy command pool {}", self.name);
        unsafe { device.destroy_command_pool(self.handle, None) };
    }
}
impl VkObject for GfxCommandPool {
    const KIND: &'static str = "CommandPool";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
