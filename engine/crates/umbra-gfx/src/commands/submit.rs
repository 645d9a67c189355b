use ash::vk;

use crate::commands::{command_buffer::GfxCommandBuffer, semaphore::GfxSemaphore};

/// 一次 `vkQueueSubmit2` 中的一个 batch
///
/// 自己持有所有数组，[`GfxSubmitBatch::as_vk`] 返回的结构体借用这些数组
#[derive(Default)]
pub struct GfxSubmitBatch {
    commands: Vec<vk::CommandBufferSubmitInfo<'static>>,
    waits: Vec<vk::SemaphoreSubmitInfo<'static>>,
    signals: Vec<vk::SemaphoreSubmitInfo<'static>>,
}
impl GfxSubmitBatch {
    pub fn new(cmd: &GfxCommandBuffer) -> Self {
        Self {
            commands: vec![vk::CommandBufferSubmitInfo::default().command_buffer(cmd.handle())],
            ..Default::default()
        }
    }

    /// 不含命令缓冲，只推进 semaphore
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// 等待 binary semaphore
    pub fn wait(mut self, semaphore: &GfxSemaphore, stage: vk::PipelineStageFlags2) -> Self {
        self.waits.push(vk::SemaphoreSubmitInfo::default().semaphore(semaphore.handle()).stage_mask(stage));
        self
    }

    /// 所有命令完成之后 signal binary semaphore
    pub fn signal(mut self, semaphore: &GfxSemaphore) -> Self {
        self.signals.push(
            vk::SemaphoreSubmitInfo::default()
                .semaphore(semaphore.handle())
                .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
        );
        self
    }

    /// 所有命令完成之后把 timeline semaphore 推进到 `value`
    pub fn signal_timeline(mut self, semaphore: &GfxSemaphore, value: u64) -> Self {
        self.signals.push(
            vk::SemaphoreSubmitInfo::default()
                .semaphore(semaphore.handle())
                .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
                .value(value),
        );
        self
    }

    pub fn as_vk(&self) -> vk::SubmitInfo2<'_> {
        vk::SubmitInfo2::default()
            .command_buffer_infos(&self.commands)
            .wait_semaphore_infos(&self.waits)
            .signal_semaphore_infos(&self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_only_carries_signals() {
        let batch = GfxSubmitBatch::empty();
        let info = batch.as_vk();
        assert_eq!(info.command_buffer_info_count, 0);
        assert_eq!(info.wait_semaphore_info_count, 0);
        assert_eq!(info.signal_semaphore_info_count, 0);
    }
}
