use std::time::Duration;

use imgui::{DrawData, FontAtlasTexture, TextureId};
use umbra_render_interface::descriptor_table::DescriptorTable;

use crate::platform::input_event::{InputEvent, MouseButton};

/// 持有 imgui context，负责字体、输入转发和每帧的 UI 构建
pub struct GuiHost {
    ctx: imgui::Context,
    font_size: f32,
}
impl GuiHost {
    const BASE_FONT_SIZE: f64 = 13.0;
    const WINDOW_BG: [f32; 4] = [0.1, 0.1, 0.1, 0.9];

    pub fn new(hidpi_factor: f64, display_size: [f32; 2]) -> Self {
        let mut ctx = imgui::Context::create();
        ctx.set_ini_filename(None);
        ctx.io_mut().display_size = display_size;

        let style = ctx.style_mut();
        style.use_dark_colors();
        style[imgui::StyleColor::WindowBg] = Self::WINDOW_BG;

        Self {
            ctx,
            font_size: (Self::BASE_FONT_SIZE * hidpi_factor) as f32,
        }
    }

    /// 字体按 hidpi 放大后烘焙，纹理放在 bindless 表的保留槽位
    pub fn init_font(&mut self) -> FontAtlasTexture<'_> {
        let config = imgui::FontConfig {
            size_pixels: self.font_size,
            ..Default::default()
        };
        let fonts = self.ctx.fonts();
        fonts.add_font(&[imgui::FontSource::DefaultFontData { config: Some(config) }]);
        fonts.tex_id = Self::font_texture_id();
        fonts.build_rgba32_texture()
    }

    #[inline]
    pub fn font_texture_id() -> TextureId {
        TextureId::new(DescriptorTable::UI_FONT_INDEX.index())
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        let io = self.ctx.io_mut();
        match *event {
            InputEvent::Resized { width, height } => io.display_size = [width as f32, height as f32],
            InputEvent::CursorMoved(pos) => io.add_mouse_pos_event(pos.map(|v| v as f32)),
            InputEvent::Button { button, pressed } => io.add_mouse_button_event(to_imgui(button), pressed),
            InputEvent::Scroll(lines) => io.add_mouse_wheel_event([0.0, lines as f32]),
            InputEvent::Key { .. } => {}
        }
    }

    /// `build` 中构建控件，返回本帧的 draw data
    pub fn frame(&mut self, delta_time: Duration, build: impl FnOnce(&imgui::Ui)) -> &DrawData {
        // imgui 断言 delta time 为正
        self.ctx.io_mut().update_delta_time(delta_time.max(Duration::from_micros(1)));
        build(self.ctx.new_frame());
        self.ctx.render()
    }

    /// 光标在 UI 上，相机不响应鼠标
    #[inline]
    pub fn wants_mouse(&self) -> bool {
        self.ctx.io().want_capture_mouse
    }

    #[inline]
    pub fn wants_keyboard(&self) -> bool {
        self.ctx.io().want_capture_keyboard
    }
}

fn to_imgui(button: MouseButton) -> imgui::MouseButton {
    match button {
        MouseButton::Left => imgui::MouseButton::Left,
        MouseButton::Right => imgui::MouseButton::Right,
        MouseButton::Middle => imgui::MouseButton::Middle,
    }
}
