use std::time::{Duration, Instant};

use crate::frame_settings::{FRAME_COUNT, FrameLabel};

/// 每秒结算一次的帧时间平均值
#[derive(Default)]
struct FpsWindow {
    elapsed: Duration,
    frames: u32,
    frame_time_ms: f32,
    fps: f32,
}
impl FpsWindow {
    const PERIOD: Duration = Duration::from_secs(1);

    fn push(&mut self, delta: Duration) {
        self.elapsed += delta;
        self.frames += 1;
        if self.elapsed < Self::PERIOD {
            return;
        }

        let secs = self.elapsed.as_secs_f32();
        self.frame_time_ms = secs * 1000.0 / self.frames as f32;
        self.fps = self.frames as f32 / secs;
        *self = Self {
            frame_time_ms: self.frame_time_ms,
            fps: self.fps,
            ..Default::default()
        };
    }
}

/// 单调递增的帧序号，决定当前使用哪个 frame slot
pub struct FrameCounter {
    frame_id: u64,
    last_tick: Instant,
    delta: Duration,
    window: FpsWindow,
}
impl FrameCounter {
    pub fn new(first_frame: u64) -> Self {
        Self {
            frame_id: first_frame,
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            window: FpsWindow::default(),
        }
    }

    /// 帧开始时调用，量出距上次 tick 的时间
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.record(now - self.last_tick);
        self.last_tick = now;
    }

    fn record(&mut self, delta: Duration) {
        self.delta = delta;
        self.window.push(delta);
    }

    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel::from_usize((self.frame_id % FRAME_COUNT as u64) as usize)
    }

    /// 日志前缀，例如 `[F12A]`
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }

    /// 上一帧耗时，秒
    #[inline]
    pub fn delta_time(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    #[inline]
    pub fn avg_frame_time_ms(&self) -> f32 {
        self.window.frame_time_ms
    }

    #[inline]
    pub fn avg_fps(&self) -> f32 {
        self.window.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_alternates_between_slots() {
        let mut counter = FrameCounter::new(0);
        let mut labels = vec![];
        for _ in 0..4 {
            labels.push(counter.frame_label());
            counter.next_frame();
        }
        assert_eq!(labels, [FrameLabel::A, FrameLabel::B, FrameLabel::A, FrameLabel::B]);
        assert_eq!(counter.frame_name(), "[F4A]");
    }

    #[test]
    fn averages_update_once_per_second() {
        let mut counter = FrameCounter::new(0);
        (0..59).for_each(|_| counter.record(Duration::from_millis(16)));
        assert_eq!(counter.avg_fps(), 0.0);

        (0..4).for_each(|_| counter.record(Duration::from_millis(16)));
        assert!((counter.avg_frame_time_ms() - 16.0).abs() < 0.01);
        assert!((counter.avg_fps() - 62.5).abs() < 0.1);
        assert!((counter.delta_time() - 0.016).abs() < 1e-6);
    }
}
