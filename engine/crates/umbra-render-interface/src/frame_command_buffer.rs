//! 每个 frame slot、每类 pass 一个命令缓冲
//!
//! 命令缓冲的完成由 timeline semaphore 表示；N 个 frame slot 决定了 CPU 最多领先 GPU N 帧。

pub mod fence;

use std::time::Duration;

use ash::vk;
use umbra_gfx::{
    commands::{
        command_buffer::GfxCommandBuffer, command_pool::GfxCommandPool, semaphore::GfxSemaphore,
        submit::GfxSubmitBatch,
    },
    error::GfxResult,
    gfx::Gfx,
};

pub use fence::{FenceTimeline, FenceTracker, FrameCommandState, drain_before_teardown};

use crate::frame_settings::{FRAME_COUNT, FrameLabel};

/// pass 的类别，每类 pass 各自拥有命令缓冲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassCategory {
    /// shadow 以及 AO
    Shadow,
    Geometry,
    Lighting,
}
impl PassCategory {
    pub const ALL: [PassCategory; 3] = [PassCategory::Shadow, PassCategory::Geometry, PassCategory::Lighting];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Geometry => "geometry",
            Self::Lighting => "lighting",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Shadow => 0,
            Self::Geometry => 1,
            Self::Lighting => 2,
        }
    }
}

/// 提交时额外等待的 binary semaphore
pub struct FrameWait<'a> {
    pub semaphore: &'a GfxSemaphore,
    pub stage: vk::PipelineStageFlags2,
}

pub struct FrameCommandBuffer {
    name: String,
    pool: GfxCommandPool,
    cmd: GfxCommandBuffer,
    tracker: FenceTracker<GfxSemaphore>,
}
// new & init
impl FrameCommandBuffer {
    pub fn new(category: PassCategory, frame_label: FrameLabel, timeout: Duration) -> GfxResult<Self> {
        let name = format!("{}-cmd-{}", category.name(), frame_label);
        let pool = GfxCommandPool::new(&name)?;
        let cmd = pool.allocate(&name)?;
        let fence = GfxSemaphore::new_timeline(0, &format!("{name}-fence"))?;

        Ok(Self {
            name,
            pool,
            cmd,
            tracker: FenceTracker::new(fence, timeout),
        })
    }
}
// Wait / Reset / Execute
impl FrameCommandBuffer {
    /// 阻塞等待最近一次提交完成
    #[inline]
    pub fn wait(&mut self) -> GfxResult<()> {
        self.tracker.wait()
    }

    /// 开始录制，返回可以录制的命令缓冲
    pub fn reset(&mut self) -> GfxResult<&GfxCommandBuffer> {
        self.tracker.reset()?;
        self.pool.reset()?;
        self.cmd.begin(&self.name)?;
        Ok(&self.cmd)
    }

    /// 结束录制并提交，返回 post 的 fence 值
    pub fn execute(&mut self, waits: &[FrameWait<'_>], signals: &[&GfxSemaphore]) -> GfxResult<u64> {
        let _span = tracy_client::span!("FrameCommandBuffer::execute");
        self.cmd.end()?;

        let value = self.tracker.next_value();
        let batch = waits
            .iter()
            .fold(GfxSubmitBatch::new(&self.cmd), |batch, wait| batch.wait(wait.semaphore, wait.stage));
        let batch =
            signals.iter().fold(batch, |batch, signal| batch.signal(signal)).signal_timeline(self.tracker.fence(), value);
        Gfx::get().queue().submit(&[batch])?;

        Ok(self.tracker.mark_submitted())
    }
}
// getters
impl FrameCommandBuffer {
    /// 当前正在录制的命令缓冲
    #[inline]
    pub fn cmd(&self) -> &GfxCommandBuffer {
        debug_assert_eq!(self.tracker.state(), FrameCommandState::Recording, "{} is not recording", self.name);
        &self.cmd
    }

    #[inline]
    pub fn state(&self) -> FrameCommandState {
        self.tracker.state()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
// destroy
impl FrameCommandBuffer {
    pub fn destroy(self) {
        let Self {
            pool, tracker, name, ..
        } = self;
        log::info!("destroy frame command buffer {}", name);
        pool.destroy();
        tracker.into_fence().destroy();
    }
}

/// 所有 frame slot × pass 类别的命令缓冲
pub struct FrameCommandBuffers {
    slots: Vec<Vec<FrameCommandBuffer>>,
}
impl FrameCommandBuffers {
    pub fn new(timeout: Duration) -> GfxResult<Self> {
        let slots = FrameLabel::ALL
            .iter()
            .map(|label| {
                PassCategory::ALL
                    .iter()
                    .map(|category| FrameCommandBuffer::new(*category, *label, timeout))
                    .collect::<GfxResult<Vec<_>>>()
            })
            .collect::<GfxResult<Vec<_>>>()?;
        debug_assert_eq!(slots.len(), FRAME_COUNT);
        Ok(Self { slots })
    }

    #[inline]
    pub fn get_mut(&mut self, frame_label: FrameLabel, category: PassCategory) -> &mut FrameCommandBuffer {
        &mut self.slots[*frame_label][category.index()]
    }

    #[inline]
    pub fn get(&self, frame_label: FrameLabel, category: PassCategory) -> &FrameCommandBuffer {
        &self.slots[*frame_label][category.index()]
    }

    /// 等待所有 in-flight 的命令缓冲
    pub fn wait_all(&mut self) -> GfxResult<()> {
        let _span = tracy_client::span!("FrameCommandBuffers::wait_all");
        for cmd in self.slots.iter_mut().flatten() {
            cmd.wait()?;
        }
        Ok(())
    }

    pub fn destroy(self) {
        for cmd in self.slots.into_iter().flatten() {
            cmd.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_have_distinct_slots() {
        let indices = PassCategory::ALL.map(|c| c.index());
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(PassCategory::Lighting.name(), "lighting");
    }
}
