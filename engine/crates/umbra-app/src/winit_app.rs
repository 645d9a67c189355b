use anyhow::Context;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use umbra_crate_tools::{config::UmbraConfig, init_log::init_log, resource::UmbraPath};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    platform::{input_event::InputEvent, input_state::InputState},
    scene::Scene,
};

/// 窗口创建之后才存在的部分
struct Running {
    scene: Scene,
    window: Window,
}
impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &UmbraConfig) -> anyhow::Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height));
        let window = event_loop.create_window(attributes).context("create window")?;

        let scene = Scene::initialize(
            window.display_handle()?.as_raw(),
            window.window_handle()?.as_raw(),
            to_extent(window.inner_size()),
            window.scale_factor(),
            config,
        )?;
        Ok(Self { scene, window })
    }

    /// 输入 -> DrawScene -> DrawMenu -> EndFrame
    fn frame(&mut self, input: &InputState) -> anyhow::Result<()> {
        let _span = tracy_client::span!("frame");
        self.scene.update_input(input);
        self.scene.draw_scene()?;
        self.scene.draw_menu()?;
        self.scene.end_frame()?;
        Ok(())
    }

    /// surface 属于 scene，必须先于窗口释放
    fn stop(self) {
        let Self { scene, window } = self;
        scene.destroy();
        drop(window);
    }
}

fn to_extent(size: PhysicalSize<u32>) -> vk::Extent2D {
    vk::Extent2D {
        width: size.width,
        height: size.height,
    }
}

/// winit 事件循环的宿主
pub struct WinitApp {
    config: UmbraConfig,
    input: InputState,
    running: Option<Running>,

    /// 回调里不能返回错误，先存下来，退出循环后交给 `run` 的调用方
    error: Option<anyhow::Error>,
}
impl WinitApp {
    pub fn run() -> anyhow::Result<()> {
        init_log();
        std::panic::set_hook(Box::new(|info| log::error!("panic: {info}")));
        tracy_client::Client::start();

        let config = UmbraConfig::load_or_default(UmbraPath::config_path())?;
        let event_loop = EventLoop::new().context("create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = Self {
            config,
            input: InputState::default(),
            running: None,
            error: None,
        };
        event_loop.run_app(&mut app).context("run event loop")?;

        if let Some(running) = app.running.take() {
            running.stop();
        }
        app.error.map_or(Ok(()), Err)
    }

    fn abort(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}
impl ApplicationHandler for WinitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match Running::start(event_loop, &self.config) {
            Ok(running) => self.running = Some(running),
            Err(e) => self.abort(event_loop, e.context("initialize scene")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(input) = InputEvent::from_winit(&event) {
            if input.is_quit() {
                event_loop.exit();
                return;
            }
            self.input.handle_event(&input);
            if let Some(running) = self.running.as_mut() {
                running.scene.handle_gui_event(&input);
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(running) = self.running.as_mut() {
                    running.scene.resize(to_extent(size));
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(running) = self.running.as_mut() else {
                    return;
                };
                let result = running.frame(&self.input);
                self.input.next_frame();
                if let Err(e) = result {
                    self.abort(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}
