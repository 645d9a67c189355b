use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// `umbra.toml` 的完整内容，所有字段都有默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UmbraConfig {
    pub window: WindowConfig,
    pub shader: ShaderConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}
impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Umbra".to_string(),
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// dxc 可执行文件，默认从 PATH 中查找
    pub dxc_path: String,
}
impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            dxc_path: "dxc".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// 等待 frame command buffer 的超时时间
    pub fence_timeout_ms: u64,
    /// 退出时等待 GPU 空闲的超时时间
    pub idle_timeout_ms: u64,
    pub ao_enabled: bool,
    pub shadow_blur_width: u32,
    pub vsync: bool,
}
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fence_timeout_ms: 30_000,
            idle_timeout_ms: 1_000,
            ao_enabled: false,
            shadow_blur_width: 4,
            vsync: true,
        }
    }
}

impl UmbraConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 文件不存在时使用默认配置；文件存在但无法解析时报错
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            log::info!("config file {:?} not found, using defaults", path.as_ref());
            return Ok(Self::default());
        }
        let config = Self::from_file(path.as_ref())?;
        log::info!("loaded config from {:?}:\n{:#?}", path.as_ref(), config);
        Ok(config)
    }
}
