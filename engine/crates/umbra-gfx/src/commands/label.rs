use std::ffi::CString;

use ash::vk;

/// debug label 的类别，在 RenderDoc 中以不同颜色区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// 整个命令缓冲
    Frame,
    /// 光栅化 pass
    Pass,
    /// compute dispatch
    Compute,
    /// 资源上传
    Upload,
}
impl LabelKind {
    pub const fn rgba(self) -> [f32; 4] {
        match self {
            Self::Frame => [0.2, 0.8, 0.3, 1.0],
            Self::Pass => [0.25, 0.45, 1.0, 1.0],
            Self::Compute => [0.9, 0.3, 0.9, 1.0],
            Self::Upload => [1.0, 0.85, 0.2, 1.0],
        }
    }
}

/// 名字中含有 `\0` 时返回 None，调用方直接跳过这个 label
pub(crate) fn label_name(name: &str) -> Option<CString> {
    CString::new(name).ok()
}

pub(crate) fn label_info(name: &CString, kind: LabelKind) -> vk::DebugUtilsLabelEXT<'_> {
    vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(kind.rgba())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_distinct_colors() {
        let kinds = [LabelKind::Frame, LabelKind::Pass, LabelKind::Compute, LabelKind::Upload];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.rgba(), b.rgba());
            }
        }
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(label_name("shadow\0pass").is_none());
        assert_eq!(label_name("shadow").map(|s| s.into_bytes()), Some(b"shadow".to_vec()));
    }
}
