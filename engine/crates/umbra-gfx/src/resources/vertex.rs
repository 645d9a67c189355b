use std::mem::offset_of;

use ash::vk;

/// 单个 binding、逐顶点步进的顶点格式
///
/// `ATTRIBUTES` 中第 i 项对应 shader 中的 `location = i`
pub trait GfxVertex: bytemuck::Pod {
    /// (format, offset)
    const ATTRIBUTES: &'static [(vk::Format, usize)];

    fn binding() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    fn attributes() -> Vec<vk::VertexInputAttributeDescription> {
        Self::ATTRIBUTES
            .iter()
            .enumerate()
            .map(|(location, &(format, offset))| {
                vk::VertexInputAttributeDescription::default()
                    .binding(0)
                    .location(location as u32)
                    .format(format)
                    .offset(offset as u32)
            })
            .collect()
    }
}

/// index buffer 的元素类型
pub trait GfxIndex: bytemuck::Pod {
    const INDEX_TYPE: vk::IndexType;
}
impl GfxIndex for u16 {
    const INDEX_TYPE: vk::IndexType = vk::IndexType::UINT16;
}
impl GfxIndex for u32 {
    const INDEX_TYPE: vk::IndexType = vk::IndexType::UINT32;
}

/// 场景中所有网格共用的顶点
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}
impl Vertex3D {
    #[inline]
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }
}
impl GfxVertex for Vertex3D {
    const ATTRIBUTES: &'static [(vk::Format, usize)] = &[
        (vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex3D, position)),
        (vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex3D, normal)),
        (vk::Format::R32G32_SFLOAT, offset_of!(Vertex3D, uv)),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_vertex_is_tightly_packed() {
        assert_eq!(Vertex3D::binding().stride, 32);

        let attrs = Vertex3D::attributes();
        let layout: Vec<(u32, u32)> = attrs.iter().map(|a| (a.location, a.offset)).collect();
        assert_eq!(layout, vec![(0, 0), (1, 12), (2, 24)]);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
    }
}
