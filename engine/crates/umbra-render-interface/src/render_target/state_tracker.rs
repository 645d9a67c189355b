use ash::vk;
use umbra_gfx::{
    commands::image_state::GfxImageState,
    error::{GfxError, GfxResult},
};

/// 资源当前状态的标签
///
/// 每次转换都要声明期望的起点状态，不一致时立即报错，而不是交给 validation layer
#[derive(Debug, Clone)]
pub struct ImageStateTracker {
    name: String,
    state: GfxImageState,
    extent: vk::Extent2D,
}
impl ImageStateTracker {
    pub fn new(name: impl Into<String>, initial: GfxImageState, extent: vk::Extent2D) -> Self {
        Self {
            name: name.into(),
            state: initial,
            extent,
        }
    }

    /// 从 `expected` 转换到 `next`
    ///
    /// 返回需要录制的 barrier 两端；read-after-read 不需要 barrier 时返回 None
    pub fn transition(
        &mut self,
        expected: GfxImageState,
        next: GfxImageState,
    ) -> GfxResult<Option<(GfxImageState, GfxImageState)>> {
        if self.state.layout != expected.layout {
            return Err(GfxError::InvalidTransition {
                name: self.name.clone(),
                expected: expected.layout,
                found: self.state.layout,
            });
        }

        let prev = self.state;
        self.state = next;
        Ok(prev.needs_barrier(&next).then_some((prev, next)))
    }

    /// 尺寸和当前 viewport 不一致说明 resize 之后没有重建
    pub fn check_extent(&self, viewport: vk::Extent2D) -> GfxResult<()> {
        if self.extent != viewport {
            return Err(GfxError::StaleRenderTarget {
                name: self.name.clone(),
                target: self.extent,
                viewport,
            });
        }
        Ok(())
    }

    /// 资源重建之后从新的初始状态开始
    pub fn rebuild(&mut self, initial: GfxImageState, extent: vk::Extent2D) {
        self.state = initial;
        self.extent = extent;
    }

    #[inline]
    pub fn state(&self) -> GfxImageState {
        self.state
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: vk::Extent2D = vk::Extent2D {
        width: 1920,
        height: 1080,
    };

    fn gbuffer() -> ImageStateTracker {
        ImageStateTracker::new("gbuffer-0-A", GfxImageState::SHADER_READ_ALL, VIEWPORT)
    }

    #[test]
    fn matched_bind_unbind() {
        let mut tracker = gbuffer();
        let bind = tracker.transition(GfxImageState::SHADER_READ_ALL, GfxImageState::COLOR_ATTACHMENT_WRITE).unwrap();
        assert_eq!(bind, Some((GfxImageState::SHADER_READ_ALL, GfxImageState::COLOR_ATTACHMENT_WRITE)));

        let unbind = tracker.transition(GfxImageState::COLOR_ATTACHMENT_WRITE, GfxImageState::SHADER_READ_ALL).unwrap();
        assert!(unbind.is_some());
        assert_eq!(tracker.state(), GfxImageState::SHADER_READ_ALL);
    }

    #[test]
    fn duplicated_bind_is_rejected() {
        let mut tracker = gbuffer();
        tracker.transition(GfxImageState::SHADER_READ_ALL, GfxImageState::COLOR_ATTACHMENT_WRITE).unwrap();

        let err = tracker.transition(GfxImageState::SHADER_READ_ALL, GfxImageState::COLOR_ATTACHMENT_WRITE);
        match err {
            Err(GfxError::InvalidTransition { expected, found, .. }) => {
                assert_eq!(expected, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                assert_eq!(found, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // 失败的转换不改变状态
        assert_eq!(tracker.state(), GfxImageState::COLOR_ATTACHMENT_WRITE);
    }

    #[test]
    fn missed_unbind_is_rejected() {
        let mut tracker = gbuffer();
        assert!(tracker.transition(GfxImageState::COLOR_ATTACHMENT_WRITE, GfxImageState::SHADER_READ_ALL).is_err());
    }

    #[test]
    fn read_after_read_skips_barrier() {
        let mut tracker = gbuffer();
        let result = tracker.transition(GfxImageState::SHADER_READ_ALL, GfxImageState::SHADER_READ_ALL).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resized_viewport_is_detected() {
        let mut tracker = gbuffer();
        tracker.check_extent(VIEWPORT).unwrap();

        let resized = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        match tracker.check_extent(resized) {
            Err(GfxError::StaleRenderTarget { target, viewport, .. }) => {
                assert_eq!(target, VIEWPORT);
                assert_eq!(viewport, resized);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        tracker.rebuild(GfxImageState::SHADER_READ_ALL, resized);
        tracker.check_extent(resized).unwrap();
    }
}
