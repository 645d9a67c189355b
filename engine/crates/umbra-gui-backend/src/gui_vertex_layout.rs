use std::mem::offset_of;

use ash::vk;
use umbra_gfx::resources::vertex::GfxVertex;

/// 与 `imgui::DrawVert` 的内存布局一致，可以直接拷贝
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    /// R8G8B8A8
    pub color: [u8; 4],
}
impl From<&imgui::DrawVert> for GuiVertex {
    fn from(v: &imgui::DrawVert) -> Self {
        Self {
            pos: v.pos,
            uv: v.uv,
            color: v.col,
        }
    }
}
impl GfxVertex for GuiVertex {
    const ATTRIBUTES: &'static [(vk::Format, usize)] = &[
        (vk::Format::R32G32_SFLOAT, offset_of!(GuiVertex, pos)),
        (vk::Format::R32G32_SFLOAT, offset_of!(GuiVertex, uv)),
        (vk::Format::R8G8B8A8_UNORM, offset_of!(GuiVertex, color)),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_matches_imgui_layout() {
        assert_eq!(size_of::<GuiVertex>(), size_of::<imgui::DrawVert>());
        assert_eq!(GuiVertex::binding().stride, 20);

        let offsets: Vec<u32> = GuiVertex::attributes().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
    }
}
