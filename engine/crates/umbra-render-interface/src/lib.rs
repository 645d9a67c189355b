//! 渲染器和 GPU 之间的边界
//!
//! - [`descriptor_table`]：固定容量的描述符表，只分配不回收
//! - [`frame_command_buffer`]：每个 frame slot、每类 pass 一个命令缓冲以及对应的 timeline fence
//! - [`render_target`]：带状态标签的 render target，bind / unbind 会检查状态和尺寸
//! - [`transient_memory`]：每帧的临时 uniform 内存
//! - [`gpu_data`]：和 shader 共享的数据布局

pub mod descriptor_table;
pub mod frame_command_buffer;
pub mod frame_counter;
pub mod frame_settings;
pub mod gpu_data;
pub mod render_target;
pub mod transient_memory;
