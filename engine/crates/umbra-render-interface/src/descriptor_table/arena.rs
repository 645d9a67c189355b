use umbra_gfx::error::{GfxError, GfxResult};

/// 描述符表中的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorIndex(pub u32);
impl DescriptorIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
impl std::fmt::Display for DescriptorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 只增不减的槽位分配器
///
/// 分配出去的 index 在所有者的生命周期内不会被回收；容量在创建时确定，之后不能增长
#[derive(Debug, Clone)]
pub struct DescriptorArena {
    name: String,
    capacity: u32,
    next: u32,
}
impl DescriptorArena {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            next: 0,
        }
    }

    /// 返回下一个空闲的 index
    pub fn allocate(&mut self) -> GfxResult<DescriptorIndex> {
        self.allocate_range(1)
    }

    /// 分配连续的 `count` 个 index，返回第一个；失败时不会移动游标
    pub fn allocate_range(&mut self, count: u32) -> GfxResult<DescriptorIndex> {
        let end = self.next.checked_add(count).filter(|end| *end <= self.capacity);
        let Some(end) = end else {
            return Err(GfxError::DescriptorCapacityExhausted {
                table: self.name.clone(),
                capacity: self.capacity,
            });
        };

        let first = DescriptorIndex(self.next);
        self.next = end;
        Ok(first)
    }

    #[inline]
    pub fn is_allocated(&self, index: DescriptorIndex) -> bool {
        index.0 < self.next
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_distinct_and_increasing() {
        let mut arena = DescriptorArena::new("srv", 16);
        let indices: Vec<_> = (0..16).map(|_| arena.allocate().unwrap()).collect();

        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(indices.first(), Some(&DescriptorIndex(0)));
        assert_eq!(indices.last(), Some(&DescriptorIndex(15)));
    }

    #[test]
    fn exhausted_table_fails() {
        let mut arena = DescriptorArena::new("rtv", 3);
        for _ in 0..3 {
            arena.allocate().unwrap();
        }
        match arena.allocate() {
            Err(GfxError::DescriptorCapacityExhausted { table, capacity }) => {
                assert_eq!(table, "rtv");
                assert_eq!(capacity, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(arena.allocated(), 3);
    }

    #[test]
    fn range_overflow_does_not_advance() {
        let mut arena = DescriptorArena::new("srv", 8);
        assert_eq!(arena.allocate_range(4).unwrap(), DescriptorIndex(0));
        assert!(arena.allocate_range(5).is_err());
        assert_eq!(arena.allocate_range(4).unwrap(), DescriptorIndex(4));
        assert!(arena.is_allocated(DescriptorIndex(7)));
        assert!(!arena.is_allocated(DescriptorIndex(8)));
        assert!(arena.allocate_range(u32::MAX).is_err());
    }
}
