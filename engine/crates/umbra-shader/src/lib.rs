//! Shader Program
//!
//! HLSL 源码经过 dxc 编译为 SPIR-V，再由 naga 反射出 binding 信息，最后链接成不可变的 pipeline。
//!
//! - [`compiler`]：调用 dxc，任何诊断信息都视为失败
//! - [`reflection`]：从 SPIR-V 中读取输出数量、资源 binding、push constant、workgroup size
//! - [`link_plan`]：纯函数形式的链接决策，不依赖 device
//! - [`shader_program`]：持有各个 stage，链接并绑定 pipeline

pub mod compiler;
pub mod link_plan;
pub mod pipeline_state;
pub mod reflection;
pub mod shader_program;
