use ash::vk;
use vk_mem::Alloc;

use crate::{
    error::{GfxError, GfxResult, VkResultExt},
    foundation::naming::VkObject,
    gfx::Gfx,
};

/// 由 VMA 分配的 buffer，drop 时释放
///
/// host visible 的 buffer 在创建时 map，直到销毁都保持 map
pub struct GfxBuffer {
    handle: vk::Buffer,
    allocation: vk_mem::Allocation,
    size: vk::DeviceSize,
    mapped: Option<*mut u8>,
    name: String,
}
// 创建
impl GfxBuffer {
    const DEFAULT_ALIGN: vk::DeviceSize = 8;

    /// CPU 每帧写入的 buffer，例如 imgui 的顶点和 transient 常量
    pub fn host_visible(
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        align: vk::DeviceSize,
        name: &str,
    ) -> GfxResult<Self> {
        Self::create(size, usage, align, vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM, name)
    }

    pub fn staging(size: vk::DeviceSize, name: &str) -> GfxResult<Self> {
        Self::host_visible(size, vk::BufferUsageFlags::TRANSFER_SRC, Self::DEFAULT_ALIGN, name)
    }

    /// 创建 device local 的 buffer，经过 staging buffer 写入 `data`，阻塞到上传完成
    pub fn device_local_with<T: bytemuck::Pod>(usage: vk::BufferUsageFlags, data: &[T], name: &str) -> GfxResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let size = bytes.len() as vk::DeviceSize;
        let buffer = Self::create(
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            Self::DEFAULT_ALIGN,
            vk_mem::AllocationCreateFlags::empty(),
            name,
        )?;

        let staging = Self::staging(size, &format!("{name}-staging"))?;
        staging.write(0, bytes)?;
        staging.flush(0, size)?;
        Gfx::get().submit_immediate(&format!("{name}-upload"), |cmd| cmd.copy_buffer(&staging, &buffer, size))?;

        Ok(buffer)
    }

    fn create(
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        align: vk::DeviceSize,
        flags: vk_mem::AllocationCreateFlags,
        name: &str,
    ) -> GfxResult<Self> {
        let what = format!("Buffer::{name}");
        let buffer_info = vk::BufferCreateInfo::default().size(size).usage(usage);
        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            flags,
            ..Default::default()
        };

        let allocator = Gfx::get().allocator();
        let (handle, mut allocation) =
            unsafe { allocator.create_buffer_with_alignment(&buffer_info, &alloc_info, align) }
                .or_creation_failure(&what)?;

        let mapped = if flags.contains(vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM) {
            match unsafe { allocator.map_memory(&mut allocation) } {
                Ok(ptr) => Some(ptr),
                Err(e) => {
                    unsafe { allocator.destroy_buffer(handle, &mut allocation) };
                    return Err(GfxError::creation(what, format!("map failed: {e:?}")));
                }
            }
        } else {
            None
        };

        let buffer = Self {
            handle,
            allocation,
            size,
            mapped,
            name: name.to_string(),
        };
        Gfx::get().device().name_object(&buffer, name);
        Ok(buffer)
    }
}
// getters
impl GfxBuffer {
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
// host 写入
impl GfxBuffer {
    /// 拷贝到 mapped 内存的 `offset` 处，不 flush；返回写入的字节数
    pub fn write<T: bytemuck::Pod>(&self, offset: vk::DeviceSize, data: &[T]) -> GfxResult<vk::DeviceSize> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let len = bytes.len() as vk::DeviceSize;
        let Some(base) = self.mapped else {
            return Err(GfxError::creation(&self.name, "buffer is not host visible"));
        };
        if offset + len > self.size {
            return Err(GfxError::creation(
                &self.name,
                format!("{len} bytes at offset {offset} exceed buffer size {}", self.size),
            ));
        }

        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), base.add(offset as usize), bytes.len()) };
        Ok(len)
    }

    pub fn flush(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> GfxResult<()> {
        Gfx::get().allocator().flush_allocation(&self.allocation, offset, size)?;
        Ok(())
    }
}
impl Drop for GfxBuffer {
    fn drop(&mut self) {
        let allocator = Gfx::get().allocator();
        unsafe {
            if self.mapped.is_some() {
                allocator.unmap_memory(&mut self.allocation);
            }
            allocator.destroy_buffer(self.handle, &mut self.allocation);
        }
    }
}
impl VkObject for GfxBuffer {
    const KIND: &'static str = "Buffer";

    fn raw(&self) -> impl vk::Handle {
        self.handle
    }
}
