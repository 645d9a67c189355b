use ash::vk;
use umbra_gfx::{error::GfxResult, resources::buffer::GfxBuffer};
use umbra_render_interface::frame_settings::FrameLabel;

use crate::gui_vertex_layout::GuiVertex;

/// 容量不足时按 2 的幂增长
pub fn grown_capacity(current: usize, required: usize) -> usize {
    if required <= current { current } else { required.next_power_of_two() }
}

/// imgui 绘制所需的 vertex buffer 和 index buffer
///
/// 每个 frame slot 一份，持久 map，CPU 每帧直接写入
pub struct GuiMesh {
    frame_label: FrameLabel,

    pub vertex_buffer: Option<GfxBuffer>,
    vertex_capacity: usize,

    pub index_buffer: Option<GfxBuffer>,
    index_capacity: usize,
}
// new & init
impl GuiMesh {
    const ALIGN: vk::DeviceSize = 16;

    pub fn new(frame_label: FrameLabel) -> Self {
        Self {
            frame_label,
            vertex_buffer: None,
            vertex_capacity: 0,
            index_buffer: None,
            index_capacity: 0,
        }
    }
}
// update
impl GuiMesh {
    /// 调用方需要保证本 slot 上一次的绘制已经完成
    pub fn grow_if_needed(&mut self, draw_data: &imgui::DrawData) -> GfxResult<()> {
        let vertex_count = grown_capacity(self.vertex_capacity, draw_data.total_vtx_count as usize);
        if vertex_count != self.vertex_capacity || self.vertex_buffer.is_none() {
            let vertex_count = vertex_count.max(1);
            self.vertex_buffer = Some(GfxBuffer::host_visible(
                (vertex_count * size_of::<GuiVertex>()) as vk::DeviceSize,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                Self::ALIGN,
                &format!("{}-imgui-vertex", self.frame_label),
            )?);
            self.vertex_capacity = vertex_count;
            log::debug!("{}: imgui vertex buffer grows to {}", self.frame_label, vertex_count);
        }

        let index_count = grown_capacity(self.index_capacity, draw_data.total_idx_count as usize);
        if index_count != self.index_capacity || self.index_buffer.is_none() {
            let index_count = index_count.max(1);
            self.index_buffer = Some(GfxBuffer::host_visible(
                (index_count * size_of::<imgui::DrawIdx>()) as vk::DeviceSize,
                vk::BufferUsageFlags::INDEX_BUFFER,
                Self::ALIGN,
                &format!("{}-imgui-index", self.frame_label),
            )?);
            self.index_capacity = index_count;
            log::debug!("{}: imgui index buffer grows to {}", self.frame_label, index_count);
        }
        Ok(())
    }

    /// 把所有 draw list 的顶点依次拼接写入
    pub fn fill_vertex_buffer(&self, draw_data: &imgui::DrawData) -> GfxResult<()> {
        let Some(buffer) = &self.vertex_buffer else {
            return Ok(());
        };
        let mut offset = 0;
        for draw_list in draw_data.draw_lists() {
            let vertices: Vec<GuiVertex> = draw_list.vtx_buffer().iter().map(GuiVertex::from).collect();
            offset += buffer.write(offset, &vertices)?;
        }
        buffer.flush(0, offset.max(1))
    }

    pub fn fill_index_buffer(&self, draw_data: &imgui::DrawData) -> GfxResult<()> {
        let Some(buffer) = &self.index_buffer else {
            return Ok(());
        };
        let mut offset = 0;
        for draw_list in draw_data.draw_lists() {
            offset += buffer.write(offset, draw_list.idx_buffer())?;
        }
        buffer.flush(0, offset.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_grows_in_powers_of_two() {
        assert_eq!(grown_capacity(0, 100), 128);
        assert_eq!(grown_capacity(128, 100), 128);
        assert_eq!(grown_capacity(128, 129), 256);
        assert_eq!(grown_capacity(0, 0), 0);
    }
}
