use umbra_gfx::error::{GfxError, GfxResult};

/// 一段 [offset, offset + size) 的分配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BumpAllocation {
    pub offset: u64,
    pub size: u64,
}

/// 线性分配器：只能整体 reset
#[derive(Debug, Clone)]
pub struct BumpArena {
    capacity: u64,
    alignment: u64,
    cursor: u64,
    /// 上一次 commit 之后的起点
    committed: u64,
}
impl BumpArena {
    /// `alignment` 必须是 2 的幂
    pub fn new(capacity: u64, alignment: u64) -> Self {
        debug_assert!(alignment.is_power_of_two(), "alignment {alignment} is not power of 2");
        Self {
            capacity,
            alignment,
            cursor: 0,
            committed: 0,
        }
    }

    #[inline]
    fn align_up(&self, value: u64) -> u64 {
        (value + self.alignment - 1) & !(self.alignment - 1)
    }

    pub fn allocate(&mut self, size: u64, name: &str) -> GfxResult<BumpAllocation> {
        let offset = self.align_up(self.cursor);
        let end = offset.checked_add(size).filter(|end| *end <= self.capacity);
        let Some(end) = end else {
            return Err(GfxError::creation(
                format!("transient memory `{name}`"),
                format!("{size} bytes at {offset} overflows capacity {}", self.capacity),
            ));
        };
        self.cursor = end;
        Ok(BumpAllocation { offset, size })
    }

    /// 自上次 commit 以来新分配的范围
    pub fn commit(&mut self) -> Option<BumpAllocation> {
        let range = (self.cursor > self.committed).then(|| BumpAllocation {
            offset: self.committed,
            size: self.cursor - self.committed,
        });
        self.committed = self.cursor;
        range
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.committed = 0;
    }

    #[inline]
    pub fn used(&self) -> u64 {
        self.cursor
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_respect_alignment() {
        let mut arena = BumpArena::new(1024, 256);
        let a = arena.allocate(100, "a").unwrap();
        let b = arena.allocate(16, "b").unwrap();
        let c = arena.allocate(256, "c").unwrap();

        assert_eq!(a, BumpAllocation { offset: 0, size: 100 });
        assert_eq!(b.offset, 256);
        assert_eq!(c.offset, 512);
        assert_eq!(arena.used(), 768);
    }

    #[test]
    fn overflow_is_reported_without_advancing() {
        let mut arena = BumpArena::new(512, 256);
        arena.allocate(300, "first").unwrap();
        let err = arena.allocate(300, "second").unwrap_err();
        assert!(matches!(err, GfxError::ResourceCreationFailure { .. }));
        assert_eq!(arena.used(), 300);
    }

    #[test]
    fn commit_returns_fresh_range_and_reset_reclaims() {
        let mut arena = BumpArena::new(4096, 64);
        arena.allocate(10, "a").unwrap();
        arena.allocate(10, "b").unwrap();
        assert_eq!(arena.commit(), Some(BumpAllocation { offset: 0, size: 74 }));
        assert_eq!(arena.commit(), None);

        arena.allocate(8, "c").unwrap();
        assert_eq!(arena.commit(), Some(BumpAllocation { offset: 74, size: 62 }));

        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.allocate(1, "d").unwrap().offset, 0);
    }
}
