use std::ffi::CStr;

use ash::vk;

use crate::{
    commands::{
        command_buffer::GfxCommandBuffer, command_pool::GfxCommandPool, command_queue::GfxCommandQueue,
        submit::GfxSubmitBatch,
    },
    error::{GfxResult, VkResultExt},
    foundation::{device::GfxDevice, instance::GfxInstance, physical_device::GfxPhysicalDevice},
};

/// 进程内唯一的 vulkan 上下文
///
/// 在窗口创建之后 [`Gfx::init`]，所有资源释放之后 [`Gfx::destroy`]。
/// 只在主线程上使用。
pub struct Gfx {
    instance: GfxInstance,
    gpu: GfxPhysicalDevice,
    device: GfxDevice,
    queue: GfxCommandQueue,
    allocator: vk_mem::Allocator,

    /// [`Gfx::submit_immediate`] 使用的 pool
    immediate_pool: GfxCommandPool,
}

static mut G_GFX: Option<Gfx> = None;

// 单例
impl Gfx {
    const ENGINE_NAME: &'static str = "Umbra";

    /// # Panics
    /// 还没有 [`Gfx::init`]，或者已经 [`Gfx::destroy`]
    #[inline]
    pub fn get() -> &'static Gfx {
        let gfx = unsafe { (*std::ptr::addr_of!(G_GFX)).as_ref() };
        gfx.expect("Gfx is used before init or after destroy")
    }

    /// `window_exts` 由 ash-window 根据窗口系统给出
    pub fn init(app_name: &str, window_exts: &[&'static CStr]) -> GfxResult<()> {
        let _span = tracy_client::span!("Gfx::init");
        let gfx = Self::new(app_name, window_exts)?;
        let slot = unsafe { &mut *std::ptr::addr_of_mut!(G_GFX) };
        assert!(slot.is_none(), "Gfx is initialized twice");
        *slot = Some(gfx);
        Ok(())
    }

    /// allocator 在 device 之前销毁，device 在 instance 之前销毁
    pub fn destroy() {
        let Some(gfx) = (unsafe { (*std::ptr::addr_of_mut!(G_GFX)).take() }) else {
            log::warn!("Gfx::destroy without init");
            return;
        };

        let Gfx {
            instance,
            gpu: _,
            device,
            queue: _,
            allocator,
            immediate_pool,
        } = gfx;
        immediate_pool.destroy_with(&device);
        drop(allocator);
        device.destroy();
        instance.destroy();
        log::info!("gfx destroyed");
    }

    fn new(app_name: &str, window_exts: &[&'static CStr]) -> GfxResult<Self> {
        let instance = GfxInstance::new(app_name, Self::ENGINE_NAME, window_exts)?;
        let gpu = GfxPhysicalDevice::pick(instance.ash_instance())?;
        let device = GfxDevice::new(&instance, &gpu)?;
        let queue = GfxCommandQueue::new(&device, gpu.queue_family_index());

        let mut allocator_ci = vk_mem::AllocatorCreateInfo::new(instance.ash_instance(), &device, gpu.handle());
        allocator_ci.vulkan_api_version = vk::API_VERSION_1_3;
        let allocator = unsafe { vk_mem::Allocator::new(allocator_ci) }.or_creation_failure("Allocator")?;

        let immediate_pool = GfxCommandPool::create(&device, gpu.queue_family_index(), "immediate")?;

        device.name_handle(gpu.handle(), "PhysicalDevice");
        device.name_handle(device.handle(), "Device");
        device.name_handle(queue.handle(), "Queue::main");

        Ok(Self {
            instance,
            gpu,
            device,
            queue,
            allocator,
            immediate_pool,
        })
    }
}
// getters
impl Gfx {
    #[inline]
    pub fn instance(&self) -> &GfxInstance {
        &self.instance
    }

    #[inline]
    pub fn gpu(&self) -> &GfxPhysicalDevice {
        &self.gpu
    }

    #[inline]
    pub fn device(&self) -> &GfxDevice {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &GfxCommandQueue {
        &self.queue
    }

    #[inline]
    pub fn allocator(&self) -> &vk_mem::Allocator {
        &self.allocator
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.gpu.queue_family_index()
    }
}
// tools
impl Gfx {
    /// 录制并提交一个命令缓冲，阻塞到 queue 空闲
    ///
    /// 只在初始化和重建资源时使用，不在帧循环中使用
    pub fn submit_immediate<R>(&self, name: &str, record: impl FnOnce(&GfxCommandBuffer) -> R) -> GfxResult<R> {
        let _span = tracy_client::span!("Gfx::submit_immediate");
        let cmd = self.immediate_pool.allocate(name)?;

        cmd.begin(name)?;
        let result = record(&cmd);
        cmd.end()?;

        self.queue.submit(&[GfxSubmitBatch::new(&cmd)])?;
        self.queue.wait_idle()?;
        self.immediate_pool.free(cmd);
        Ok(result)
    }

    #[inline]
    pub fn wait_idle(&self) -> GfxResult<()> {
        self.device.wait_idle()
    }
}
