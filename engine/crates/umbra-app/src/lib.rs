//! Umbra 的窗口程序
//!
//! [`scene::Scene`] 对外提供 InitializeScene / DrawScene / DrawMenu / EndFrame / LoadShaders，
//! [`winit_app::WinitApp`] 负责窗口与事件循环。

pub mod gui_host;
pub mod menu;
pub mod platform;
pub mod scene;
pub mod sky_texture;
pub mod winit_app;
