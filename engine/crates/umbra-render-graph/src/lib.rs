//! 延迟着色的每帧流程
//!
//! 一帧固定由以下 pass 组成，顺序见 [`render_graph::FramePlan`]：
//!
//! 1. shadow：从光源视角绘制矩 (moment)，拷贝之后做可分离的高斯模糊
//! 2. geometry：绘制整个场景图到 G-buffer
//! 3. AO（可选）：全屏计算环境光遮蔽，并做同样的可分离模糊
//! 4. lighting：读取 G-buffer、阴影和 AO，叠加所有光源，直接写入 swapchain image
//!
//! 每个 pass 进入时把自己写入的资源从静止状态转换为写入状态，离开时转换回去。

pub mod blur_kernel;
pub mod frame_targets;
pub mod passes;
pub mod present;
pub mod programs;
pub mod render_context;
pub mod render_graph;
pub mod render_settings;
