use std::{fmt, ops::Deref, time::Duration};

use ash::vk;
use umbra_crate_tools::config::UmbraConfig;

/// frames in flight
pub const FRAME_COUNT: usize = 2;

/// 各类 render target 的格式和尺寸
pub struct RendererDefaults;
impl RendererDefaults {
    pub const GBUFFER_COUNT: usize = 4;
    pub const GBUFFER_FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;
    pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

    /// 矩阴影图存四个深度矩
    pub const SHADOW_FORMAT: vk::Format = vk::Format::R16G16B16A16_UNORM;
    pub const SHADOW_EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1024,
        height: 1024,
    };

    pub const AO_FORMAT: vk::Format = vk::Format::R32_SFLOAT;

    /// 单输出 pixel shader 的默认 attachment 格式，swapchain 创建后被实际格式替换
    pub const PRESENT_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;

    pub const TRANSIENT_MEMORY_SIZE: vk::DeviceSize = 4 << 20;

    pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    pub const CLEAR_DEPTH: f32 = 1.0;
}

/// 运行期会变化的帧参数
#[derive(Copy, Clone, Debug)]
pub struct FrameSettings {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub frame_extent: vk::Extent2D,

    /// 等待某个 frame slot 的命令缓冲完成
    pub fence_timeout: Duration,
    /// 关闭时等待 GPU 空闲
    pub idle_timeout: Duration,
}
impl FrameSettings {
    pub fn from_config(config: &UmbraConfig) -> Self {
        Self {
            color_format: RendererDefaults::PRESENT_FORMAT,
            depth_format: RendererDefaults::DEPTH_FORMAT,
            frame_extent: vk::Extent2D {
                width: config.window.width,
                height: config.window.height,
            },
            fence_timeout: Duration::from_millis(config.render.fence_timeout_ms),
            idle_timeout: Duration::from_millis(config.render.idle_timeout_ms),
        }
    }
}

/// frame slot，deref 得到数组下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FrameLabel {
    A = 0,
    B = 1,
}
impl FrameLabel {
    pub const ALL: [FrameLabel; FRAME_COUNT] = [FrameLabel::A, FrameLabel::B];
    const SLOTS: [usize; FRAME_COUNT] = [0, 1];

    #[inline]
    pub fn from_usize(idx: usize) -> Self {
        Self::ALL[idx % FRAME_COUNT]
    }
}
impl Deref for FrameLabel {
    type Target = usize;

    #[inline]
    fn deref(&self) -> &usize {
        &Self::SLOTS[*self as usize]
    }
}
impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}
