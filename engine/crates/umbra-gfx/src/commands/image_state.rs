use ash::vk;

type Stage = vk::PipelineStageFlags2;
type Access = vk::AccessFlags2;
type Layout = vk::ImageLayout;

/// image 在某次访问中的 stage、access 和 layout，barrier 的两端各是一个状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageState {
    pub stage: Stage,
    pub access: Access,
    pub layout: Layout,
}
impl GfxImageState {
    #[inline]
    pub const fn new(stage: Stage, access: Access, layout: Layout) -> Self {
        Self { stage, access, layout }
    }

    const FRAGMENT_TESTS: Stage =
        Stage::from_raw(Stage::EARLY_FRAGMENT_TESTS.as_raw() | Stage::LATE_FRAGMENT_TESTS.as_raw());

    const WRITES: Access = Access::from_raw(
        Access::SHADER_STORAGE_WRITE.as_raw()
            | Access::COLOR_ATTACHMENT_WRITE.as_raw()
            | Access::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
            | Access::TRANSFER_WRITE.as_raw()
            | Access::MEMORY_WRITE.as_raw(),
    );

    /// 内容可以丢弃
    pub const UNDEFINED: Self = Self::new(Stage::TOP_OF_PIPE, Access::NONE, Layout::UNDEFINED);

    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        Stage::COLOR_ATTACHMENT_OUTPUT,
        Access::from_raw(Access::COLOR_ATTACHMENT_READ.as_raw() | Access::COLOR_ATTACHMENT_WRITE.as_raw()),
        Layout::COLOR_ATTACHMENT_OPTIMAL,
    );

    pub const DEPTH_ATTACHMENT_READ_WRITE: Self = Self::new(
        Self::FRAGMENT_TESTS,
        Access::from_raw(
            Access::DEPTH_STENCIL_ATTACHMENT_READ.as_raw() | Access::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
        ),
        Layout::DEPTH_ATTACHMENT_OPTIMAL,
    );

    /// fragment 和 compute 都可以采样，render target 不被写入时停在这里
    pub const SHADER_READ_ALL: Self = Self::new(
        Stage::from_raw(Stage::FRAGMENT_SHADER.as_raw() | Stage::COMPUTE_SHADER.as_raw()),
        Access::SHADER_SAMPLED_READ,
        Layout::SHADER_READ_ONLY_OPTIMAL,
    );

    pub const STORAGE_WRITE_COMPUTE: Self =
        Self::new(Stage::COMPUTE_SHADER, Access::SHADER_STORAGE_WRITE, Layout::GENERAL);

    pub const TRANSFER_DST: Self = Self::new(Stage::TRANSFER, Access::TRANSFER_WRITE, Layout::TRANSFER_DST_OPTIMAL);

    pub const PRESENT: Self = Self::new(Stage::BOTTOM_OF_PIPE, Access::NONE, Layout::PRESENT_SRC_KHR);
}
impl GfxImageState {
    #[inline]
    pub fn writes(&self) -> bool {
        self.access.intersects(Self::WRITES)
    }

    /// 作为 barrier 源端时需要 flush 的部分
    #[inline]
    pub fn src_access(&self) -> Access {
        self.access & Self::WRITES
    }

    /// 读后读并且 layout 不变时可以省掉 barrier
    #[inline]
    pub fn needs_barrier(&self, next: &Self) -> bool {
        self.layout != next.layout || self.writes() || next.writes()
    }
}
impl Default for GfxImageState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_twice_in_a_row_is_free() {
        assert!(!GfxImageState::SHADER_READ_ALL.needs_barrier(&GfxImageState::SHADER_READ_ALL));
    }

    #[test]
    fn layout_change_or_any_write_is_synchronized() {
        assert!(GfxImageState::SHADER_READ_ALL.needs_barrier(&GfxImageState::COLOR_ATTACHMENT_WRITE));
        assert!(GfxImageState::STORAGE_WRITE_COMPUTE.needs_barrier(&GfxImageState::STORAGE_WRITE_COMPUTE));
    }

    #[test]
    fn only_writes_are_flushed() {
        assert_eq!(GfxImageState::COLOR_ATTACHMENT_WRITE.src_access(), Access::COLOR_ATTACHMENT_WRITE);
        assert_eq!(GfxImageState::SHADER_READ_ALL.src_access(), Access::NONE);
        assert!(GfxImageState::DEPTH_ATTACHMENT_READ_WRITE.writes());
        assert!(!GfxImageState::PRESENT.writes());
    }
}
