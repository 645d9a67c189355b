use ash::vk;
use imgui::{DrawData, FontAtlasTexture};
use umbra_gfx::{
    commands::command_buffer::GfxCommandBuffer,
    error::GfxResult,
    resources::{image::GfxImage, image_view::GfxImageView},
};
use umbra_render_interface::{
    descriptor_table::{DescriptorTable, DescriptorTables, DescriptorUsage},
    frame_settings::{FRAME_COUNT, FrameLabel},
};
use umbra_shader::{compiler::DxcCompiler, shader_program::LinkContext};

use crate::{gui_mesh::GuiMesh, gui_pass::GuiPass};

struct FontTexture {
    image: GfxImage,
    view: GfxImageView,
}

pub struct GuiBackend {
    pass: GuiPass,

    /// 存放多帧 imgui 的 mesh 数据
    gui_meshes: [GuiMesh; FRAME_COUNT],

    font: Option<FontTexture>,
}
// new & init
impl GuiBackend {
    pub fn new(compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<Self> {
        Ok(Self {
            pass: GuiPass::new(compiler, ctx)?,
            gui_meshes: FrameLabel::ALL.map(GuiMesh::new),
            font: None,
        })
    }

    /// 上传字体纹理，写入 bindless 表中保留的 0 号槽位
    ///
    /// 字体的 `TextureId` 需要由调用方设置为 `UI_FONT_INDEX`
    pub fn register_font(&mut self, tables: &mut DescriptorTables, font_atlas: FontAtlasTexture) -> GfxResult<()> {
        let image = GfxImage::from_rgba8(font_atlas.width, font_atlas.height, font_atlas.data, "imgui-fonts")?;
        let view =
            GfxImageView::new_2d(image.handle(), vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR, "imgui-fonts")?;
        tables.bindless.create_view(
            DescriptorTable::UI_FONT_INDEX,
            view.handle(),
            vk::Format::R8G8B8A8_UNORM,
            image.extent_2d(),
            DescriptorUsage::Sampled,
        );
        log::info!("register imgui font atlas {}x{}", font_atlas.width, font_atlas.height);

        self.font = Some(FontTexture { image, view });
        Ok(())
    }

    pub fn reload(&mut self, compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<()> {
        self.pass.reload(compiler, ctx)
    }
}
// render
impl GuiBackend {
    /// 构建 draw 需要的 mesh 数据，然后在当前的 rendering 中绘制
    ///
    /// 调用时本 slot 的命令缓冲已经等待过，旧的 mesh 不再被 GPU 使用
    pub fn draw(
        &mut self,
        cmd: &GfxCommandBuffer,
        bindless_set: vk::DescriptorSet,
        extent: vk::Extent2D,
        frame_label: FrameLabel,
        draw_data: &DrawData,
    ) -> GfxResult<()> {
        let mesh = &mut self.gui_meshes[*frame_label];

        mesh.grow_if_needed(draw_data)?;
        mesh.fill_vertex_buffer(draw_data)?;
        mesh.fill_index_buffer(draw_data)?;

        self.pass.draw(cmd, bindless_set, extent, mesh, draw_data)
    }
}
// destroy
impl GuiBackend {
    pub fn destroy(self) {
        if let Some(FontTexture { image, view }) = self.font {
            view.destroy();
            image.destroy();
        }
    }
}
