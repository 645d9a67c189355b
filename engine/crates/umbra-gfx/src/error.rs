//! GFX 层统一的错误类型
//!
//! 所有错误都视为致命错误：在发生处构造，通过 `?` 传播到顶层，记录日志后退出进程。
//! 不存在重试或者降级渲染路径。

use std::path::PathBuf;

use ash::vk;

#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    /// device / texture / buffer / view 等资源创建失败
    #[error("failed to create {what}: {reason}")]
    ResourceCreationFailure { what: String, reason: String },

    /// 编译器产生了任何诊断信息（包括 warning）
    #[error("shader compile failed: {file:?}\n{diagnostics}")]
    ShaderCompileFailure { file: PathBuf, diagnostics: String },

    /// 缺少必要的 stage，或者没有任何 stage
    #[error("pipeline link failed: {0}")]
    PipelineLinkFailure(String),

    #[error("descriptor table `{table}` exhausted: capacity {capacity}")]
    DescriptorCapacityExhausted { table: String, capacity: u32 },

    /// shader 源文件不存在或无法读取
    #[error("failed to read {path:?}")]
    FileIOFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 有上限的等待超时
    #[error("timeout while waiting `{name}` to reach value {value}")]
    FenceTimeout { name: String, value: u64 },

    /// render target 的尺寸和当前 viewport 不一致
    #[error("render target `{name}` is {target:?} but viewport is {viewport:?}")]
    StaleRenderTarget {
        name: String,
        target: vk::Extent2D,
        viewport: vk::Extent2D,
    },

    /// 状态转换的起点和资源当前状态不一致
    #[error("invalid transition on `{name}`: expected {expected:?}, found {found:?}")]
    InvalidTransition {
        name: String,
        expected: vk::ImageLayout,
        found: vk::ImageLayout,
    },

    #[error("vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

pub type GfxResult<T> = Result<T, GfxError>;

impl GfxError {
    #[inline]
    pub fn creation(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceCreationFailure {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

/// 将 `VkResult` 转换为带上下文的 [`GfxError::ResourceCreationFailure`]
pub trait VkResultExt<T> {
    fn or_creation_failure(self, what: impl AsRef<str>) -> GfxResult<T>;
}
impl<T> VkResultExt<T> for ash::prelude::VkResult<T> {
    #[inline]
    fn or_creation_failure(self, what: impl AsRef<str>) -> GfxResult<T> {
        self.map_err(|e| GfxError::creation(what.as_ref(), format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_failure_carries_context() {
        let result: ash::prelude::VkResult<()> = Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        let err = result.or_creation_failure("GfxImage::shadow").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("GfxImage::shadow"));
        assert!(msg.contains("OUT_OF_DEVICE_MEMORY"));
    }

    #[test]
    fn link_failure_message_is_verbatim() {
        let err = GfxError::PipelineLinkFailure("No Shaders".to_string());
        assert_eq!(err.to_string(), "pipeline link failed: No Shaders");
    }
}
