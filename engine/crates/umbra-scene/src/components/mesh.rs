use ash::vk;
use umbra_gfx::{
    commands::command_buffer::GfxCommandBuffer,
    error::{GfxError, GfxResult},
    resources::buffer::GfxBuffer,
};

use crate::{scene_graph::ShapeId, shapes::Shape};

/// 上传到 GPU 的网格，形状的具体类型在这里被擦除
pub struct GpuMesh {
    vertex_buffer: GfxBuffer,
    index_buffer: GfxBuffer,
    index_count: u32,
    name: String,
}
// new & init
impl GpuMesh {
    /// 同步上传，只在初始化阶段使用
    pub fn upload(shape: &dyn Shape) -> GfxResult<Self> {
        let _span = tracy_client::span!("GpuMesh::upload");
        let name = shape.name().to_string();
        let vertices = shape.vertices();
        let indices = shape.indices();
        if vertices.is_empty() || indices.is_empty() {
            return Err(GfxError::creation(format!("mesh-{name}"), "shape has no geometry"));
        }

        let vertex_buffer =
            GfxBuffer::device_local_with(vk::BufferUsageFlags::VERTEX_BUFFER, &vertices, &format!("{name}-vertex"))?;
        let index_buffer =
            GfxBuffer::device_local_with(vk::BufferUsageFlags::INDEX_BUFFER, &indices, &format!("{name}-index"))?;

        log::info!("upload mesh `{}`: {} vertices, {} indices", name, vertices.len(), indices.len());
        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            name,
        })
    }
}
// draw
impl GpuMesh {
    pub fn bind(&self, cmd: &GfxCommandBuffer) {
        cmd.bind_vertex_buffer(&self.vertex_buffer);
        cmd.bind_index_buffer::<u32>(&self.index_buffer);
    }

    pub fn draw(&self, cmd: &GfxCommandBuffer) {
        self.bind(cmd);
        cmd.draw_indexed(self.index_count, 0, 0);
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
// destroy
impl GpuMesh {
    pub fn destroy(self) {
        drop(self.vertex_buffer);
        drop(self.index_buffer);
    }
}

/// 所有上传过的网格，通过 [`ShapeId`] 索引
#[derive(Default)]
pub struct MeshLibrary {
    meshes: Vec<GpuMesh>,
}
impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, shape: &dyn Shape) -> GfxResult<ShapeId> {
        let mesh = GpuMesh::upload(shape)?;
        self.meshes.push(mesh);
        Ok(ShapeId(self.meshes.len() - 1))
    }

    #[inline]
    pub fn get(&self, id: ShapeId) -> Option<&GpuMesh> {
        self.meshes.get(id.0)
    }

    pub fn destroy(self) {
        self.meshes.into_iter().for_each(GpuMesh::destroy);
    }
}
