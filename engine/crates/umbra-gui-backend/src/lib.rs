//! 参考 imgui-rs-vulkan-renderer
//!
//! imgui 的 `TextureId` 直接对应 bindless 表中的 index，字体固定在
//! [`DescriptorTable::UI_FONT_INDEX`](umbra_render_interface::descriptor_table::DescriptorTable::UI_FONT_INDEX)

pub mod gui_backend;
pub mod gui_mesh;
pub mod gui_pass;
pub mod gui_vertex_layout;
