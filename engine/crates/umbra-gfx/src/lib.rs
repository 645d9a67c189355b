//! Vulkan GFX 抽象层
//!
//! 对 ash 的薄封装：设备、命令录制、同步、资源、pipeline 以及 swapchain。
//! 设备级对象挂在 [`gfx::Gfx`] 单例上，其余资源各自持有 handle。
//!
//! 所有可能失败的创建操作都返回 [`error::GfxResult`]，由调用方一路传播到顶层。

pub mod commands;
pub mod descriptors;
pub mod error;
pub mod foundation;
pub mod gfx;
pub mod pipelines;
pub mod resources;
pub mod sampler;
pub mod swapchain;
