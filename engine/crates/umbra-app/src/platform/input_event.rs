//! 窗口事件中程序关心的部分

use winit::{
    event::{MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}
impl MouseButton {
    fn from_winit(button: winit::event::MouseButton) -> Option<Self> {
        match button {
            winit::event::MouseButton::Left => Some(Self::Left),
            winit::event::MouseButton::Right => Some(Self::Right),
            winit::event::MouseButton::Middle => Some(Self::Middle),
            _ => None,
        }
    }
}

/// 相机移动和退出用到的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    Escape,
}
impl Key {
    fn from_winit(code: KeyCode) -> Option<Self> {
        Some(match code {
            KeyCode::KeyW => Self::W,
            KeyCode::KeyA => Self::A,
            KeyCode::KeyS => Self::S,
            KeyCode::KeyD => Self::D,
            KeyCode::KeyQ => Self::Q,
            KeyCode::Escape => Self::Escape,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        key: Key,
        pressed: bool,
        /// 按住不放时系统产生的重复事件
        repeat: bool,
    },
    Button {
        button: MouseButton,
        pressed: bool,
    },
    /// 物理像素
    CursorMoved([f64; 2]),
    /// 垂直方向的行数，向上为正
    Scroll(f64),
    Resized {
        width: u32,
        height: u32,
    },
}
impl InputEvent {
    /// 触控板的像素滚动按这个比例折算成行
    const PIXELS_PER_LINE: f64 = 100.0;

    /// 其余事件返回 None
    pub fn from_winit(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return None;
                };
                Some(Self::Key {
                    key: Key::from_winit(code)?,
                    pressed: event.state.is_pressed(),
                    repeat: event.repeat,
                })
            }
            WindowEvent::MouseInput { state, button, .. } => Some(Self::Button {
                button: MouseButton::from_winit(*button)?,
                pressed: state.is_pressed(),
            }),
            WindowEvent::CursorMoved { position, .. } => Some(Self::CursorMoved([position.x, position.y])),
            WindowEvent::MouseWheel { delta, .. } => Some(Self::Scroll(match delta {
                MouseScrollDelta::LineDelta(_, lines) => *lines as f64,
                MouseScrollDelta::PixelDelta(pixels) => pixels.y / Self::PIXELS_PER_LINE,
            })),
            WindowEvent::Resized(size) => Some(Self::Resized {
                width: size.width,
                height: size.height,
            }),
            _ => None,
        }
    }

    /// Escape 或 Q 按下
    pub fn is_quit(&self) -> bool {
        matches!(
            self,
            Self::Key {
                key: Key::Escape | Key::Q,
                pressed: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_keys_are_mapped() {
        assert_eq!(Key::from_winit(KeyCode::KeyW), Some(Key::W));
        assert_eq!(Key::from_winit(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(Key::from_winit(KeyCode::KeyE), None);
    }

    #[test]
    fn resize_and_close_events() {
        let resized = WindowEvent::Resized(winit::dpi::PhysicalSize::new(800, 600));
        assert_eq!(InputEvent::from_winit(&resized), Some(InputEvent::Resized { width: 800, height: 600 }));
        assert_eq!(InputEvent::from_winit(&WindowEvent::CloseRequested), None);
    }

    #[test]
    fn escape_and_q_quit_on_press_only() {
        let key = |key, pressed| InputEvent::Key {
            key,
            pressed,
            repeat: false,
        };
        assert!(key(Key::Escape, true).is_quit());
        assert!(key(Key::Q, true).is_quit());
        assert!(!key(Key::Q, false).is_quit());
        assert!(!key(Key::W, true).is_quit());
    }
}
