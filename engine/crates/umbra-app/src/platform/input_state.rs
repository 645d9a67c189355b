use std::collections::HashSet;

use glam::DVec2;

use crate::platform::input_event::{InputEvent, Key, MouseButton};

/// 由窗口事件累积出的输入状态，每帧交给相机
#[derive(Default, Clone, Debug)]
pub struct InputState {
    cursor: DVec2,
    /// 上一帧结束时的光标位置
    last_cursor: DVec2,
    /// 本帧累计的滚动行数
    scroll: f64,
    keys: HashSet<Key>,
    buttons: HashSet<MouseButton>,
}
impl InputState {
    pub fn handle_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Key {
                key,
                pressed,
                repeat: false,
            } => Self::set(&mut self.keys, key, pressed),
            InputEvent::Key { repeat: true, .. } => {}
            InputEvent::Button { button, pressed } => Self::set(&mut self.buttons, button, pressed),
            InputEvent::CursorMoved(pos) => self.cursor = DVec2::from(pos),
            InputEvent::Scroll(lines) => self.scroll += lines,
            InputEvent::Resized { .. } => {}
        }
    }

    /// 帧末调用，清空本帧的增量
    pub fn next_frame(&mut self) {
        self.last_cursor = self.cursor;
        self.scroll = 0.0;
    }

    fn set<T: Eq + std::hash::Hash>(set: &mut HashSet<T>, item: T, pressed: bool) {
        if pressed {
            set.insert(item);
        } else {
            set.remove(&item);
        }
    }
}
// getters
impl InputState {
    #[inline]
    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    #[inline]
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// 本帧光标的移动量，单位像素
    #[inline]
    pub fn cursor_delta(&self) -> DVec2 {
        self.cursor - self.last_cursor
    }

    #[inline]
    pub fn scroll(&self) -> f64 {
        self.scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, pressed: bool, repeat: bool) -> InputEvent {
        InputEvent::Key { key, pressed, repeat }
    }

    #[test]
    fn repeat_events_are_ignored() {
        let mut input = InputState::default();
        input.handle_event(&key(Key::W, true, false));
        assert!(input.is_key_down(Key::W));

        input.handle_event(&key(Key::W, false, false));
        input.handle_event(&key(Key::W, true, true));
        assert!(!input.is_key_down(Key::W));
        assert!(!input.is_key_down(Key::A));
    }

    #[test]
    fn cursor_and_scroll_reset_each_frame() {
        let mut input = InputState::default();
        input.handle_event(&InputEvent::CursorMoved([10.0, 20.0]));
        input.handle_event(&InputEvent::Scroll(1.0));
        input.handle_event(&InputEvent::Scroll(0.5));
        assert_eq!(input.cursor_delta(), DVec2::new(10.0, 20.0));
        assert_eq!(input.scroll(), 1.5);

        input.next_frame();
        assert_eq!(input.cursor_delta(), DVec2::ZERO);
        assert_eq!(input.scroll(), 0.0);
    }

    #[test]
    fn buttons_are_tracked_separately() {
        let mut input = InputState::default();
        let button = |button, pressed| InputEvent::Button { button, pressed };
        input.handle_event(&button(MouseButton::Left, true));
        assert!(input.is_button_down(MouseButton::Left) && !input.is_button_down(MouseButton::Right));

        input.handle_event(&button(MouseButton::Right, true));
        input.handle_event(&button(MouseButton::Left, false));
        assert!(!input.is_button_down(MouseButton::Left) && input.is_button_down(MouseButton::Right));
    }
}
