use std::time::Duration;

use umbra_gfx::{commands::semaphore::GfxSemaphore, error::GfxResult};

/// 单调递增的完成计数器
///
/// 设备上由 timeline semaphore 实现
pub trait FenceTimeline {
    fn fence_name(&self) -> &str;

    /// GPU 已经完成的值
    fn completed_value(&self) -> GfxResult<u64>;

    /// 等待计数器到达 `value`，超时返回 [`umbra_gfx::error::GfxError::FenceTimeout`]
    fn wait_value(&self, value: u64, timeout: Duration) -> GfxResult<()>;
}

impl FenceTimeline for GfxSemaphore {
    #[inline]
    fn fence_name(&self) -> &str {
        self.name()
    }

    #[inline]
    fn completed_value(&self) -> GfxResult<u64> {
        self.counter_value()
    }

    #[inline]
    fn wait_value(&self, value: u64, timeout: Duration) -> GfxResult<()> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self.wait_timeline(value, timeout_ns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCommandState {
    Idle,
    Recording,
    Submitted,
}

/// frame command buffer 的状态机：Idle -> Recording -> Submitted -> Idle
///
/// 每次提交都会 post 一个严格递增的 fence 值
pub struct FenceTracker<F: FenceTimeline> {
    fence: F,
    state: FrameCommandState,
    /// 最近一次 post 的值，0 表示从未提交
    last_posted: u64,
    timeout: Duration,
}
impl<F: FenceTimeline> FenceTracker<F> {
    pub fn new(fence: F, timeout: Duration) -> Self {
        Self {
            fence,
            state: FrameCommandState::Idle,
            last_posted: 0,
            timeout,
        }
    }

    /// 等待最近一次提交完成；没有未完成的提交时直接返回
    pub fn wait(&mut self) -> GfxResult<()> {
        if self.state != FrameCommandState::Submitted {
            return Ok(());
        }
        if self.fence.completed_value()? < self.last_posted {
            let _span = tracy_client::span!("FenceTracker::wait");
            self.fence.wait_value(self.last_posted, self.timeout)?;
        }
        self.state = FrameCommandState::Idle;
        Ok(())
    }

    /// 进入 Recording
    ///
    /// 调用方应当先 wait；如果上一次提交还没有完成，这里会阻塞等待
    pub fn reset(&mut self) -> GfxResult<()> {
        match self.state {
            FrameCommandState::Idle => {}
            FrameCommandState::Submitted => {
                if self.fence.completed_value()? < self.last_posted {
                    log::warn!(
                        "`{}` reset before wait, blocking on value {}",
                        self.fence.fence_name(),
                        self.last_posted
                    );
                }
                self.wait()?;
            }
            FrameCommandState::Recording => {
                log::warn!("`{}` reset while recording, recorded commands are dropped", self.fence.fence_name());
            }
        }
        self.state = FrameCommandState::Recording;
        Ok(())
    }

    /// 本次提交需要 signal 的值
    #[inline]
    pub fn next_value(&self) -> u64 {
        self.last_posted + 1
    }

    /// 提交成功之后调用，Recording -> Submitted
    pub fn mark_submitted(&mut self) -> u64 {
        debug_assert_eq!(
            self.state,
            FrameCommandState::Recording,
            "`{}` submitted without recording",
            self.fence.fence_name()
        );
        self.last_posted = self.next_value();
        self.state = FrameCommandState::Submitted;
        self.last_posted
    }

    #[inline]
    pub fn state(&self) -> FrameCommandState {
        self.state
    }

    #[inline]
    pub fn last_posted(&self) -> u64 {
        self.last_posted
    }

    #[inline]
    pub fn fence(&self) -> &F {
        &self.fence
    }

    #[inline]
    pub fn into_fence(self) -> F {
        self.fence
    }
}

/// teardown 之前的等待
///
/// 先等所有帧的命令缓冲，再按 `timeout` 等 idle timeline 到达 `idle_value`。
/// 两者都成功之后才调用 `device_idle`，此时 device 上只剩一次性提交，不会无限阻塞；
/// 任何一步失败都直接返回，不再调用 `device_idle`。
pub fn drain_before_teardown<F: FenceTimeline>(
    wait_frames: impl FnOnce() -> GfxResult<()>,
    idle: &F,
    idle_value: u64,
    timeout: Duration,
    device_idle: impl FnOnce() -> GfxResult<()>,
) -> GfxResult<()> {
    let _span = tracy_client::span!("drain_before_teardown");
    wait_frames()?;
    idle.wait_value(idle_value, timeout)?;
    device_idle()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::{Arc, Condvar, Mutex},
        thread,
        time::Instant,
    };

    use umbra_gfx::error::GfxError;

    use super::*;

    /// 由另一个线程 signal 的 fence
    #[derive(Clone, Default)]
    pub(crate) struct MockFence {
        inner: Arc<(Mutex<u64>, Condvar)>,
    }
    impl MockFence {
        pub(crate) fn signal(&self, value: u64) {
            let (lock, cvar) = &*self.inner;
            let mut current = lock.lock().unwrap();
            *current = (*current).max(value);
            cvar.notify_all();
        }
    }
    impl FenceTimeline for MockFence {
        fn fence_name(&self) -> &str {
            "mock"
        }

        fn completed_value(&self) -> GfxResult<u64> {
            Ok(*self.inner.0.lock().unwrap())
        }

        fn wait_value(&self, value: u64, timeout: Duration) -> GfxResult<()> {
            let (lock, cvar) = &*self.inner;
            let guard = lock.lock().unwrap();
            let (_guard, result) = cvar.wait_timeout_while(guard, timeout, |current| *current < value).unwrap();
            if result.timed_out() {
                return Err(GfxError::FenceTimeout {
                    name: "mock".to_string(),
                    value,
                });
            }
            Ok(())
        }
    }

    fn submit(tracker: &mut FenceTracker<MockFence>) -> u64 {
        tracker.reset().unwrap();
        tracker.mark_submitted()
    }

    #[test]
    fn wait_without_submission_is_noop() {
        let mut tracker = FenceTracker::new(MockFence::default(), Duration::from_millis(10));
        tracker.wait().unwrap();
        assert_eq!(tracker.state(), FrameCommandState::Idle);
    }

    #[test]
    fn values_strictly_increase() {
        let fence = MockFence::default();
        let mut tracker = FenceTracker::new(fence.clone(), Duration::from_secs(1));

        let first = submit(&mut tracker);
        fence.signal(first);
        tracker.wait().unwrap();
        let second = submit(&mut tracker);

        assert_eq!((first, second), (1, 2));
        assert_eq!(tracker.state(), FrameCommandState::Submitted);
    }

    #[test]
    fn reset_after_wait_sees_signaled_value() {
        let fence = MockFence::default();
        let mut tracker = FenceTracker::new(fence.clone(), Duration::from_secs(5));

        for _ in 0..3 {
            let value = submit(&mut tracker);
            let signaler = fence.clone();
            let handle = thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                signaler.signal(value);
            });

            tracker.wait().unwrap();
            assert!(fence.completed_value().unwrap() >= tracker.last_posted());
            tracker.reset().unwrap();
            assert_eq!(tracker.state(), FrameCommandState::Recording);
            tracker.mark_submitted();
            fence.signal(tracker.last_posted());
            tracker.wait().unwrap();
            handle.join().unwrap();
        }
    }

    #[test]
    fn second_reset_blocks_until_first_value_signaled() {
        // 两个 frame slot，slot 0 连续提交两次，中间没有 wait
        let fences = [MockFence::default(), MockFence::default()];
        let mut slots = fences.clone().map(|f| FenceTracker::new(f, Duration::from_secs(5)));

        let first = submit(&mut slots[0]);
        assert_eq!(first, 1);

        let signaler = fences[0].clone();
        let started = Instant::now();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            signaler.signal(first);
        });

        slots[0].reset().unwrap();
        let elapsed = started.elapsed();

        assert!(fences[0].completed_value().unwrap() >= first);
        assert!(elapsed >= Duration::from_millis(40), "reset returned after {elapsed:?}");
        assert_eq!(slots[0].mark_submitted(), 2);
        // 另一个 slot 不受影响
        assert_eq!(slots[1].state(), FrameCommandState::Idle);
        handle.join().unwrap();
    }

    #[test]
    fn wait_times_out() {
        let mut tracker = FenceTracker::new(MockFence::default(), Duration::from_millis(10));
        submit(&mut tracker);
        match tracker.wait() {
            Err(GfxError::FenceTimeout { value, .. }) => assert_eq!(value, 1),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(tracker.state(), FrameCommandState::Submitted);
    }

    #[test]
    fn device_idle_runs_only_after_bounded_waits() {
        let idle = MockFence::default();
        let timeout = Duration::from_millis(10);
        let mut tracker = FenceTracker::new(MockFence::default(), timeout);
        submit(&mut tracker);

        // 帧没有完成
        let mut device_waited = false;
        let result = drain_before_teardown(
            || tracker.wait(),
            &idle,
            0,
            timeout,
            || {
                device_waited = true;
                Ok(())
            },
        );
        assert!(matches!(result, Err(GfxError::FenceTimeout { .. })));
        assert!(!device_waited);

        // 帧完成了，idle timeline 没有到达
        tracker.fence().signal(tracker.last_posted());
        let started = Instant::now();
        let result = drain_before_teardown(
            || tracker.wait(),
            &idle,
            3,
            timeout,
            || {
                device_waited = true;
                Ok(())
            },
        );
        assert!(matches!(result, Err(GfxError::FenceTimeout { value: 3, .. })));
        assert!(!device_waited);
        assert!(started.elapsed() < Duration::from_secs(1));

        idle.signal(3);
        drain_before_teardown(
            || tracker.wait(),
            &idle,
            3,
            timeout,
            || {
                device_waited = true;
                Ok(())
            },
        )
        .unwrap();
        assert!(device_waited);
        assert_eq!(tracker.state(), FrameCommandState::Idle);
    }
}
