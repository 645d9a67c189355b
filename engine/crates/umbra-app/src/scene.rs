//! 窗口层看到的唯一入口
//!
//! 每帧的调用顺序：`update_input` -> `draw_scene` -> `draw_menu` -> `end_frame`。
//! 菜单中的修改在 `draw_menu` 结束时写回，下一帧生效。

use std::{ffi::CStr, time::Instant};

use anyhow::Context;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use umbra_crate_tools::{config::UmbraConfig, resource::UmbraPath};
use umbra_gfx::{gfx::Gfx, swapchain::surface::GfxSurface};
use umbra_gui_backend::gui_backend::GuiBackend;
use umbra_render_graph::{
    render_context::SceneRoots,
    render_graph::{FrameScene, RenderGraph},
    render_settings::RenderSettings,
};
use umbra_render_interface::frame_settings::FrameSettings;
use umbra_scene::{
    components::mesh::MeshLibrary,
    default_scene::{BuiltinShapes, DefaultScene},
    lights::Lights,
};
use umbra_shader::compiler::DxcCompiler;

use crate::{
    gui_host::GuiHost,
    menu::{self, MenuState},
    platform::{camera::Camera, input_event::InputEvent, input_state::InputState},
    sky_texture::SkyTexture,
};

pub struct Scene {
    graph: RenderGraph,

    meshes: MeshLibrary,
    shapes: BuiltinShapes,
    content: DefaultScene,
    lights: Lights,
    sky: SkyTexture,

    camera: Camera,
    settings: RenderSettings,

    gui_host: GuiHost,
    gui: GuiBackend,

    start_time: Instant,
    /// 菜单中点击了 Reset
    reload_requested: bool,
}
// InitializeScene
impl Scene {
    /// 一次性的初始化：device、描述符表、frame slot、shader、场景图
    pub fn initialize(
        raw_display_handle: RawDisplayHandle,
        raw_window_handle: RawWindowHandle,
        window_extent: vk::Extent2D,
        hidpi_factor: f64,
        config: &UmbraConfig,
    ) -> anyhow::Result<Self> {
        let _span = tracy_client::span!("Scene::initialize");

        // 追加 window system 需要的 extension
        let extra_instance_ext = ash_window::enumerate_required_extensions(raw_display_handle)
            .context("query surface extensions")?
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(*ext) })
            .collect::<Vec<_>>();
        Gfx::init(&config.window.title, &extra_instance_ext).context("init gfx")?;

        let surface = GfxSurface::new(raw_display_handle, raw_window_handle)?;
        let frame_settings = FrameSettings {
            frame_extent: window_extent,
            ..FrameSettings::from_config(config)
        };
        let settings = RenderSettings::from_config(config);
        let compiler = DxcCompiler::new(config.shader.dxc_path.clone());
        let mut graph = RenderGraph::new(surface, frame_settings, compiler, config.render.vsync, &settings)
            .context("create render graph")?;

        let link_ctx = graph.program_link_context()?;
        let mut gui = GuiBackend::new(graph.compiler(), &link_ctx).context("create gui backend")?;
        let mut gui_host = GuiHost::new(hidpi_factor, [window_extent.width as f32, window_extent.height as f32]);
        gui.register_font(graph.tables_mut(), gui_host.init_font())?;

        let mut meshes = MeshLibrary::new();
        let shapes = BuiltinShapes::upload(&mut meshes).context("upload builtin shapes")?;
        let mut content = DefaultScene::build(&shapes);

        let sky = SkyTexture::load(graph.tables_mut(), &UmbraPath::resources_path("sky.hdr"))?;
        let sky_node = content.graph.node_mut(content.sky);
        sky_node.texture = Some(sky.bindless_index());
        sky_node.material.diffuse = glam::Vec3::ONE;

        let lights = Lights::new(&mut rand::thread_rng());
        log::info!("scene initialized with {} lights", lights.count());

        Ok(Self {
            graph,
            meshes,
            shapes,
            content,
            lights,
            sky,
            camera: Camera::default(),
            settings,
            gui_host,
            gui,
            start_time: Instant::now(),
            reload_requested: false,
        })
    }
}
// 输入
impl Scene {
    /// UI 需要的窗口事件；相机使用的输入通过 [`Self::update_input`] 传入
    pub fn handle_gui_event(&mut self, event: &InputEvent) {
        self.gui_host.handle_event(event);
    }

    pub fn update_input(&mut self, input: &InputState) {
        let delta_time_s = self.graph.frame_counter().delta_time();
        self.camera.update(input, delta_time_s, self.gui_host.wants_mouse(), self.gui_host.wants_keyboard());
    }

    pub fn resize(&mut self, extent: vk::Extent2D) {
        self.graph.resize(extent);
    }
}
// 帧生命周期
impl Scene {
    /// 录制并提交一帧的所有 pass
    pub fn draw_scene(&mut self) -> anyhow::Result<()> {
        if std::mem::take(&mut self.reload_requested) {
            self.load_shaders()?;
        }

        self.content.graph.update_animation(self.start_time.elapsed().as_secs_f32());

        let extent = self.graph.frame_extent();
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let frame = FrameScene {
            scene: &self.content.graph,
            roots: SceneRoots {
                root: self.content.root,
                central: self.content.central,
                light_marker: self.content.light_marker,
                fullscreen_quad: self.shapes.quad,
            },
            meshes: &self.meshes,
            lights: &self.lights,
            camera: self.camera.matrices(aspect),
            settings: &self.settings,
        };
        self.graph.draw_scene(&frame).context("draw scene")?;
        Ok(())
    }

    /// 构建菜单并绘制在本帧的呈现图像上
    pub fn draw_menu(&mut self) -> anyhow::Result<()> {
        let mut state = self.menu_state();
        let delta_time = std::time::Duration::from_secs_f32(self.graph.frame_counter().delta_time());
        let bindless_set = self.graph.bindless_set()?;

        let draw_data = self.gui_host.frame(delta_time, |ui| menu::build(ui, &mut state));
        let gui = &mut self.gui;
        self.graph
            .draw_menu(|cmd, extent, frame_label| gui.draw(cmd, bindless_set, extent, frame_label, draw_data))
            .context("draw menu")?;

        self.apply_menu_state(&state);
        Ok(())
    }

    /// 呈现并进入下一帧
    pub fn end_frame(&mut self) -> anyhow::Result<()> {
        self.graph.end_frame().context("end frame")?;
        Ok(())
    }

    /// 等待所有 in-flight 的帧，然后重新编译所有 program，包括 UI
    pub fn load_shaders(&mut self) -> anyhow::Result<()> {
        let _span = tracy_client::span!("Scene::load_shaders");
        self.graph.load_shaders().context("reload render graph programs")?;
        let link_ctx = self.graph.program_link_context()?;
        self.gui.reload(self.graph.compiler(), &link_ctx).context("reload gui program")?;
        log::info!("shaders reloaded");
        Ok(())
    }
}
// 菜单
impl Scene {
    fn menu_state(&self) -> MenuState {
        let graph = &self.content.graph;
        let frame_counter = self.graph.frame_counter();
        MenuState {
            spheres_visible: graph.node(self.content.spheres).visible,
            podium_visible: graph.node(self.content.podium).visible,
            frame_time_ms: frame_counter.avg_frame_time_ms(),
            fps: frame_counter.avg_fps(),
            light: self.lights.shadow,
            teapot: graph.node(self.content.teapot).material,
            podium_position: self.content.podium_position(),
            ..MenuState::from_settings(&self.settings)
        }
    }

    fn apply_menu_state(&mut self, state: &MenuState) {
        state.apply_to_settings(&mut self.settings);
        self.lights.shadow = state.light;

        let content = &mut self.content;
        content.graph.node_mut(content.spheres).visible = state.spheres_visible;
        content.graph.node_mut(content.podium).visible = state.podium_visible;
        content.graph.node_mut(content.teapot).material = state.teapot;
        if state.podium_position != content.podium_position() {
            content.set_podium_position(state.podium_position);
        }

        if state.reload_shaders {
            log::info!("shader reload requested");
            self.reload_requested = true;
        }
    }
}
// getters
impl Scene {
    #[inline]
    pub fn frame_extent(&self) -> vk::Extent2D {
        self.graph.frame_extent()
    }
}
// destroy
impl Scene {
    /// 等待 GPU 空闲之后释放所有资源，最后销毁 device
    pub fn destroy(self) {
        let _span = tracy_client::span!("Scene::destroy");
        let Self {
            mut graph, meshes, sky, gui, ..
        } = self;
        if let Err(e) = graph.drain() {
            log::error!("GPU did not drain before teardown: {e}");
        }

        gui.destroy();
        sky.destroy();
        meshes.destroy();
        graph.destroy();

        Gfx::destroy();
        log::info!("scene destroyed");
    }
}
