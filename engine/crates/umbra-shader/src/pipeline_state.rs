use ash::vk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}
impl CullMode {
    pub fn vk_flags(self) -> vk::CullModeFlags {
        match self {
            Self::Back => vk::CullModeFlags::BACK,
            Self::Front => vk::CullModeFlags::FRONT,
            Self::None => vk::CullModeFlags::NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthMode {
    /// 测试并写入，LESS_OR_EQUAL
    #[default]
    Default,
    /// 只测试不写入
    Read,
    /// 不使用 depth attachment
    None,
}
impl DepthMode {
    /// (compare op, 是否写入)
    pub fn vk_test(self) -> (Option<vk::CompareOp>, bool) {
        match self {
            Self::Default => (Some(vk::CompareOp::LESS_OR_EQUAL), true),
            Self::Read => (Some(vk::CompareOp::LESS_OR_EQUAL), false),
            Self::None => (None, false),
        }
    }

    #[inline]
    pub fn uses_attachment(self) -> bool {
        self != Self::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// dst = src + dst
    Additive,
    /// 按 src alpha 混合，用于 UI
    Alpha,
}
impl BlendMode {
    pub fn vk_attachment_state(self) -> vk::PipelineColorBlendAttachmentState {
        let state = vk::PipelineColorBlendAttachmentState::default().color_write_mask(vk::ColorComponentFlags::RGBA);
        match self {
            Self::Opaque => state.blend_enable(false),
            Self::Additive => state
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::ONE)
                .dst_color_blend_factor(vk::BlendFactor::ONE)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE)
                .alpha_blend_op(vk::BlendOp::ADD),
            Self::Alpha => state
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .alpha_blend_op(vk::BlendOp::ADD),
        }
    }
}

/// 链接时使用的固定管线状态
///
/// front face 固定为逆时针：几何体按右手系逆时针生成，投影矩阵翻转了 y
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineState {
    pub cull: CullMode,
    pub depth: DepthMode,
    pub blend: BlendMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_opaque_geometry() {
        let state = PipelineState::default();
        assert_eq!(state.cull.vk_flags(), vk::CullModeFlags::BACK);
        assert_eq!(state.depth.vk_test(), (Some(vk::CompareOp::LESS_OR_EQUAL), true));
        assert_eq!(state.blend.vk_attachment_state().blend_enable, vk::FALSE);
    }

    #[test]
    fn depth_none_drops_attachment() {
        assert!(!DepthMode::None.uses_attachment());
        assert_eq!(DepthMode::None.vk_test(), (None, false));
        assert!(!DepthMode::Read.vk_test().1);
    }

    #[test]
    fn additive_blend_sums() {
        let s = BlendMode::Additive.vk_attachment_state();
        assert_eq!(s.blend_enable, vk::TRUE);
        assert_eq!((s.src_color_blend_factor, s.dst_color_blend_factor), (vk::BlendFactor::ONE, vk::BlendFactor::ONE));
    }

    #[test]
    fn alpha_blend_keeps_destination_under_transparent_pixels() {
        let s = BlendMode::Alpha.vk_attachment_state();
        assert_eq!(s.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(s.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    }
}
