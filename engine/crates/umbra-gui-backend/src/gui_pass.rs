use ash::vk;
use umbra_gfx::{
    commands::{command_buffer::GfxCommandBuffer, label::LabelKind},
    error::{GfxError, GfxResult},
};
use umbra_shader::{
    compiler::{DxcCompiler, ShaderSource, ShaderStage},
    pipeline_state::{BlendMode, CullMode, DepthMode},
    shader_program::{LinkContext, ShaderProgram},
};

use crate::{gui_mesh::GuiMesh, gui_vertex_layout::GuiVertex};

/// imgui.hlsl 中的 push constant
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiPushConstants {
    pub ortho: glam::Mat4,
    /// bindless 表中的 index，即 imgui 的 `TextureId`
    pub texture: u32,
    pub _padding: [u32; 3],
}

/// clip rect 从 imgui 的显示坐标换算到 framebuffer 像素，并裁剪到 framebuffer 之内
pub fn clip_rect_to_scissor(
    clip_rect: [f32; 4],
    clip_offset: [f32; 2],
    clip_scale: [f32; 2],
    extent: vk::Extent2D,
) -> Option<vk::Rect2D> {
    let to_fb = |i: usize| (clip_rect[i] - clip_offset[i % 2]) * clip_scale[i % 2];
    let (x0, y0) = (to_fb(0).max(0.0), to_fb(1).max(0.0));
    let (x1, y1) = (to_fb(2).min(extent.width as f32), to_fb(3).min(extent.height as f32));
    (x1 > x0 && y1 > y0).then(|| vk::Rect2D {
        offset: vk::Offset2D {
            x: x0 as i32,
            y: y0 as i32,
        },
        extent: vk::Extent2D {
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        },
    })
}

/// 左上角为原点，y 向下
pub fn ortho(display_pos: [f32; 2], display_size: [f32; 2]) -> glam::Mat4 {
    glam::Mat4::orthographic_rh(
        display_pos[0],
        display_pos[0] + display_size[0],
        display_pos[1],
        display_pos[1] + display_size[1],
        -1.0,
        1.0,
    )
}

pub struct GuiPass {
    program: ShaderProgram,
}
impl GuiPass {
    pub fn new(compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<Self> {
        let mut program = ShaderProgram::new("imgui");
        program
            .add_shader(compiler, ShaderSource::new("imgui.hlsl", ShaderStage::Vertex, "VSMain"))?
            .add_shader(compiler, ShaderSource::new("imgui.hlsl", ShaderStage::Pixel, "PSMain"))?
            .set_vertex::<GuiVertex>()
            .set_blend_mode(BlendMode::Alpha)
            .set_cull_mode(CullMode::None)
            .set_depth_mode(DepthMode::None);
        program.link(ctx)?;
        Ok(Self { program })
    }

    pub fn reload(&mut self, compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<()> {
        self.program.reload(compiler, ctx)
    }
}
impl GuiPass {
    /// 调用方已经 begin rendering，attachment 和 load op 由调用方决定
    pub fn draw(
        &self,
        cmd: &GfxCommandBuffer,
        bindless_set: vk::DescriptorSet,
        extent: vk::Extent2D,
        gui_mesh: &GuiMesh,
        draw_data: &imgui::DrawData,
    ) -> GfxResult<()> {
        let _span = tracy_client::span!("GuiPass::draw");
        if draw_data.total_idx_count == 0 {
            return Ok(());
        }
        let (Some(vertices), Some(indices)) = (&gui_mesh.vertex_buffer, &gui_mesh.index_buffer) else {
            return Err(GfxError::creation("imgui-mesh", "draw before the mesh is prepared"));
        };

        cmd.begin_label("[ui-pass]draw", LabelKind::Pass);
        let program = self.program.use_shader(cmd, bindless_set)?;
        let [scale_x, scale_y] = draw_data.framebuffer_scale;
        let [width, height] = draw_data.display_size;
        cmd.set_viewport(vk::Viewport {
            width: width * scale_x,
            height: height * scale_y,
            max_depth: 1.0,
            ..Default::default()
        });
        cmd.bind_vertex_buffer(vertices);
        cmd.bind_index_buffer::<imgui::DrawIdx>(indices);

        let mut constants = GuiPushConstants {
            ortho: ortho(draw_data.display_pos, draw_data.display_size),
            texture: 0,
            _padding: [0; 3],
        };
        // 相邻的 draw 多半用同一张纹理
        let mut bound_texture = None;

        // 所有 draw list 拼接在同一对 buffer 中，offset 需要累加
        let (mut list_index_base, mut list_vertex_base) = (0u32, 0i32);
        for list in draw_data.draw_lists() {
            for command in list.commands() {
                let imgui::DrawCmd::Elements { count, cmd_params } = command else {
                    log::warn!("unsupported imgui draw command");
                    continue;
                };
                let Some(scissor) =
                    clip_rect_to_scissor(cmd_params.clip_rect, draw_data.display_pos, draw_data.framebuffer_scale, extent)
                else {
                    continue;
                };
                cmd.set_scissor(scissor);

                if bound_texture != Some(cmd_params.texture_id) {
                    constants.texture = cmd_params.texture_id.id() as u32;
                    program.push_constants(cmd, &constants);
                    bound_texture = Some(cmd_params.texture_id);
                }

                cmd.draw_indexed(
                    count as u32,
                    list_index_base + cmd_params.idx_offset as u32,
                    list_vertex_base + cmd_params.vtx_offset as i32,
                );
            }
            list_index_base += list.idx_buffer().len() as u32;
            list_vertex_base += list.vtx_buffer().len() as i32;
        }
        cmd.end_label();
        Ok(())
    }
}
