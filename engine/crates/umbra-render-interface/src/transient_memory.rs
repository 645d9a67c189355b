//! 每帧的临时内存
//!
//! 每个 frame slot 一个持久 map 的 buffer，线性分配。
//! 某个 slot 的内存在该 slot 的命令缓冲 reset 之后才会回收，在此之前保持属于使用它的那一帧。

pub mod bump;

use ash::vk;
use umbra_gfx::{error::GfxResult, gfx::Gfx, resources::buffer::GfxBuffer};

pub use bump::{BumpAllocation, BumpArena};

use crate::frame_settings::{FRAME_COUNT, FrameLabel, RendererDefaults};

/// 从临时内存中分出来的一段
#[derive(Debug, Clone, Copy)]
pub struct TransientSlice {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}
impl TransientSlice {
    #[inline]
    pub fn buffer_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset: self.offset,
            range: self.size,
        }
    }
}

struct TransientSlot {
    buffer: GfxBuffer,
    arena: BumpArena,
    /// 正在使用这段内存的帧
    owner_frame: Option<u64>,
}

pub struct TransientMemory {
    slots: Vec<TransientSlot>,
    current: FrameLabel,
}
// new & init
impl TransientMemory {
    pub fn new() -> GfxResult<Self> {
        Self::with_capacity(RendererDefaults::TRANSIENT_MEMORY_SIZE)
    }

    pub fn with_capacity(capacity: vk::DeviceSize) -> GfxResult<Self> {
        // uniform buffer 和 storage buffer 的 offset 对齐取较大的
        let limits = Gfx::get().gpu().limits();
        let alignment = limits.min_uniform_buffer_offset_alignment.max(limits.min_storage_buffer_offset_alignment);

        let slots = FrameLabel::ALL
            .iter()
            .map(|label| {
                let buffer = GfxBuffer::host_visible(
                    capacity,
                    vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER,
                    alignment,
                    &format!("transient-{label}"),
                )?;
                Ok(TransientSlot {
                    buffer,
                    arena: BumpArena::new(capacity, alignment),
                    owner_frame: None,
                })
            })
            .collect::<GfxResult<Vec<_>>>()?;
        debug_assert_eq!(slots.len(), FRAME_COUNT);

        Ok(Self {
            slots,
            current: FrameLabel::A,
        })
    }
}
// 帧生命周期
impl TransientMemory {
    /// 该 slot 的命令缓冲已经 reset，回收上一次使用的内存
    pub fn begin_frame(&mut self, frame_label: FrameLabel, frame_id: u64) {
        let slot = &mut self.slots[*frame_label];
        if let Some(prev) = slot.owner_frame {
            log::trace!("reclaim transient-{} from frame {}: {} bytes", frame_label, prev, slot.arena.used());
        }
        slot.arena.reset();
        slot.owner_frame = Some(frame_id);
        self.current = frame_label;
    }

    /// 分配并写入数据，在 [`Self::commit`] 时 flush
    pub fn allocate<T: bytemuck::Pod>(&mut self, data: &[T], name: &str) -> GfxResult<TransientSlice> {
        let slot = &mut self.slots[*self.current];
        let size = size_of_val(data) as vk::DeviceSize;
        let allocation = slot.arena.allocate(size, name)?;
        slot.buffer.write(allocation.offset, data)?;

        Ok(TransientSlice {
            buffer: slot.buffer.handle(),
            offset: allocation.offset,
            size: allocation.size,
        })
    }

    #[inline]
    pub fn allocate_constant<T: bytemuck::Pod>(&mut self, data: &T, name: &str) -> GfxResult<TransientSlice> {
        self.allocate(std::slice::from_ref(data), name)
    }

    /// pass 结束时调用，flush 本 pass 写入的范围
    pub fn commit(&mut self) -> GfxResult<()> {
        let slot = &mut self.slots[*self.current];
        if let Some(range) = slot.arena.commit() {
            slot.buffer.flush(range.offset, range.size)?;
        }
        Ok(())
    }
}
// getters
impl TransientMemory {
    #[inline]
    pub fn owner_frame(&self, frame_label: FrameLabel) -> Option<u64> {
        self.slots[*frame_label].owner_frame
    }

    #[inline]
    pub fn used(&self, frame_label: FrameLabel) -> vk::DeviceSize {
        self.slots[*frame_label].arena.used()
    }
}
