//! 各个 pass 的录制
//!
//! pass 本身不持有资源：program 来自 [`crate::programs::Programs`]，target 来自
//! [`crate::frame_targets::FrameTargets`]，常量写入本帧的 [`TransientMemory`]。

pub mod ao_pass;
pub mod blur_pass;
pub mod geometry_pass;
pub mod lighting_pass;
pub mod shadow_pass;

use ash::vk;
use glam::Mat4;
use umbra_gfx::{
    commands::command_buffer::GfxCommandBuffer,
    error::{GfxError, GfxResult},
};
use umbra_render_interface::{gpu_data::ObjectData, transient_memory::TransientMemory};
use umbra_scene::scene_graph::{DrawItem, NodeId, ShapeId};
use umbra_shader::shader_program::LinkedProgram;

use crate::render_context::RenderContext;

/// dynamic rendering 的 attachment 描述
pub struct PassRenderingInfo {
    color_attachments: Vec<vk::RenderingAttachmentInfo<'static>>,
    depth_attachment: Option<vk::RenderingAttachmentInfo<'static>>,
    render_area: vk::Rect2D,
}
impl PassRenderingInfo {
    pub fn new(extent: vk::Extent2D) -> Self {
        Self {
            color_attachments: vec![],
            depth_attachment: None,
            render_area: extent.into(),
        }
    }

    /// 开始时清空为 `clear`
    pub fn color(mut self, view: vk::ImageView, clear: [f32; 4]) -> Self {
        self.color_attachments.push(
            vk::RenderingAttachmentInfo::default()
                .image_view(view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .clear_value(vk::ClearValue {
                    color: vk::ClearColorValue { float32: clear },
                }),
        );
        self
    }

    /// 保留已有内容，用于在 lighting 的结果上绘制 UI
    pub fn load_color(mut self, view: vk::ImageView) -> Self {
        self.color_attachments.push(
            vk::RenderingAttachmentInfo::default()
                .image_view(view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE),
        );
        self
    }

    /// 深度只在 pass 内部使用，不需要保留
    pub fn depth(mut self, view: vk::ImageView, clear: f32) -> Self {
        self.depth_attachment = Some(
            vk::RenderingAttachmentInfo::default()
                .image_view(view)
                .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .clear_value(vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: clear,
                        stencil: 0,
                    },
                }),
        );
        self
    }

    pub fn rendering_info(&self) -> vk::RenderingInfo<'_> {
        let info = vk::RenderingInfo::default()
            .render_area(self.render_area)
            .layer_count(1)
            .color_attachments(&self.color_attachments);
        match &self.depth_attachment {
            Some(depth) => info.depth_attachment(depth),
            None => info,
        }
    }

    /// 开始 rendering，同时设置覆盖整个区域的 viewport 和 scissor
    pub fn begin(&self, cmd: &GfxCommandBuffer) {
        cmd.begin_rendering(&self.rendering_info());
        set_viewport(cmd, self.render_area.extent);
    }
}

/// 投影矩阵已经翻转了 y，viewport 使用正的高度
pub fn set_viewport(cmd: &GfxCommandBuffer, extent: vk::Extent2D) {
    cmd.set_viewport(viewport(extent));
    cmd.set_scissor(extent.into());
}

pub fn viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

fn missing_mesh(shape: ShapeId) -> GfxError {
    GfxError::creation(format!("mesh-{}", shape.0), "shape is not registered in the mesh library")
}

/// 绘制场景图中的一个节点
///
/// set 1 的 binding 1 是每个物体的 [`ObjectData`]，其余 binding 由 `shared` 给出
pub(crate) fn draw_scene_item(
    cmd: &GfxCommandBuffer,
    program: &LinkedProgram,
    ctx: &RenderContext,
    transient: &mut TransientMemory,
    item: &DrawItem,
    shared: &[(u32, vk::DescriptorBufferInfo)],
) -> GfxResult<()> {
    let mesh = ctx.meshes.get(item.shape).ok_or_else(|| missing_mesh(item.shape))?;
    let object = ObjectData::new(
        item.model,
        item.material.diffuse,
        item.material.specular,
        item.material.roughness,
        item.texture,
    );
    let object = transient.allocate_constant(&object, "object")?;

    let mut buffers = shared.to_vec();
    buffers.push((1, object.buffer_info()));
    program.push_buffers(cmd, &buffers)?;
    mesh.draw(cmd);
    Ok(())
}

/// 遍历 `root` 的子树并逐个绘制，返回绘制数量
pub(crate) fn draw_subtree(
    cmd: &GfxCommandBuffer,
    program: &LinkedProgram,
    ctx: &RenderContext,
    transient: &mut TransientMemory,
    root: NodeId,
    transform: Mat4,
    shared: &[(u32, vk::DescriptorBufferInfo)],
) -> GfxResult<u32> {
    ctx.scene.draw(root, transform, &mut |item: &DrawItem| {
        draw_scene_item(cmd, program, ctx, transient, item, shared)
    })
}

/// 全屏 pass：绘制覆盖 NDC 的 quad
pub(crate) fn draw_fullscreen(cmd: &GfxCommandBuffer, ctx: &RenderContext) -> GfxResult<()> {
    let quad = ctx.roots.fullscreen_quad;
    ctx.meshes.get(quad).ok_or_else(|| missing_mesh(quad))?.draw(cmd);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    #[test]
    fn gbuffer_layout_clears_every_attachment() {
        let mut info = PassRenderingInfo::new(EXTENT);
        for _ in 0..4 {
            info = info.color(vk::ImageView::null(), [0.0, 0.0, 0.0, 1.0]);
        }
        let info = info.depth(vk::ImageView::null(), 1.0);

        let rendering = info.rendering_info();
        assert_eq!(info.color_attachments.len(), 4);
        assert_eq!(rendering.color_attachment_count, 4);
        assert!(!rendering.p_depth_attachment.is_null());
        assert_eq!(rendering.render_area.extent, EXTENT);
        assert!(info.color_attachments.iter().all(|a| a.load_op == vk::AttachmentLoadOp::CLEAR));
        assert_eq!(info.depth_attachment.map(|d| d.store_op), Some(vk::AttachmentStoreOp::DONT_CARE));
    }

    #[test]
    fn ui_overlay_keeps_existing_contents() {
        let info = PassRenderingInfo::new(EXTENT).load_color(vk::ImageView::null());
        assert_eq!(info.color_attachments[0].load_op, vk::AttachmentLoadOp::LOAD);
        assert!(info.rendering_info().p_depth_attachment.is_null());
    }

    #[test]
    fn viewport_is_not_flipped() {
        let vp = viewport(EXTENT);
        assert_eq!((vp.y, vp.height), (0.0, 600.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
    }
}
