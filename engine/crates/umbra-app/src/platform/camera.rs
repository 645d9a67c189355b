use glam::{Mat4, Quat, Vec3};
use umbra_render_graph::render_context::CameraMatrices;
use umbra_scene::projection;

use crate::platform::{
    input_event::{Key, MouseButton},
    input_state::InputState,
};

/// 自由相机：WASD 平移，左键拖动旋转，右键拖动平移，滚轮沿 z 轴推拉
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,

    forward: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Camera {
    /// 世界的上方向
    const WORLD_UP: Vec3 = Vec3::Y;

    pub const FOV_Y_DEG: f32 = 60.0;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 5000.0;

    /// 每秒移动的距离
    pub const MOVE_SPEED: f32 = 10.0;
    /// 左键拖动时每个像素旋转的角度
    const DEG_PER_PIXEL: f32 = 1.0 / 6.0;
    /// 右键拖动时每个像素平移的距离
    const UNITS_PER_PIXEL: f32 = 1.0 / 40.0;
    /// 滚轮每一格对 z 坐标取的幂
    const SCROLL_EXPONENT: f32 = 1.02;

    /// forward 和世界 up 的夹角不能小于这个值，否则 right 无法确定
    const MAX_FORWARD_Y: f32 = 0.999;

    pub fn new(position: Vec3, forward: Vec3) -> Self {
        let mut camera = Self {
            position,
            forward: forward.normalize(),
            right: Vec3::X,
            up: Vec3::Y,
        };
        camera.update_basis();
        camera
    }

    fn update_basis(&mut self) {
        self.right = self.forward.cross(Self::WORLD_UP).normalize();
        self.up = self.right.cross(self.forward).normalize();
    }
}
impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 8.0, 8.0), Vec3::new(0.0, -0.75, -0.66))
    }
}
// 移动与旋转
impl Camera {
    /// 朝相机看向的方向进行移动
    pub fn move_forward(&mut self, length: f32) {
        self.position += self.forward * length;
    }

    pub fn move_right(&mut self, length: f32) {
        self.position += self.right * length;
    }

    /// 先绕 right 轴俯仰，再绕 up 轴偏航；向右、向下拖动时视线随之向右、向下
    pub fn rotate(&mut self, dx_pixels: f32, dy_pixels: f32) {
        let pitch = Quat::from_axis_angle(self.right, (-dy_pixels * Self::DEG_PER_PIXEL).to_radians());
        let pitched = (pitch * self.forward).normalize();
        if pitched.y.abs() < Self::MAX_FORWARD_Y {
            self.forward = pitched;
            self.update_basis();
        }

        let yaw = Quat::from_axis_angle(self.up, (-dx_pixels * Self::DEG_PER_PIXEL).to_radians());
        self.forward = (yaw * self.forward).normalize();
        self.update_basis();
    }

    /// 在世界的 xy 平面中平移，拖动方向和画面移动方向相反
    pub fn pan(&mut self, dx_pixels: f32, dy_pixels: f32) {
        self.position.x += dx_pixels * Self::UNITS_PER_PIXEL;
        self.position.y -= dy_pixels * Self::UNITS_PER_PIXEL;
    }

    /// 向上滚动时 z 坐标向 1 收缩，向下滚动时向外扩张
    pub fn scroll(&mut self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        let exponent = if delta > 0.0 { 1.0 / Self::SCROLL_EXPONENT } else { Self::SCROLL_EXPONENT };
        let z = self.position.z;
        self.position.z = z.signum() * z.abs().powf(exponent);
    }

    /// 根据本帧的输入更新相机
    ///
    /// UI 占用鼠标或者键盘时，对应的输入不会影响相机
    pub fn update(&mut self, input: &InputState, delta_time_s: f32, mouse_captured: bool, keyboard_captured: bool) {
        if !keyboard_captured {
            let dist = delta_time_s * Self::MOVE_SPEED;
            let axis = |pos: Key, neg: Key| input.is_key_down(pos) as i32 - input.is_key_down(neg) as i32;
            self.move_forward(axis(Key::W, Key::S) as f32 * dist);
            self.move_right(axis(Key::D, Key::A) as f32 * dist);
        }

        if mouse_captured {
            return;
        }
        let delta = input.cursor_delta().as_vec2();
        if input.is_button_down(MouseButton::Left) {
            self.rotate(delta.x, delta.y);
        }
        if input.is_button_down(MouseButton::Right) {
            self.pan(delta.x, delta.y);
        }
        self.scroll(input.scroll() as f32);
    }
}
// getters
impl Camera {
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn proj_matrix(&self, aspect: f32) -> Mat4 {
        projection::perspective(Self::FOV_Y_DEG.to_radians(), aspect, Self::NEAR, Self::FAR)
    }

    pub fn matrices(&self, aspect: f32) -> CameraMatrices {
        CameraMatrices {
            view: self.view_matrix(),
            proj: self.proj_matrix(aspect),
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::input_event::InputEvent;

    fn pressed(key: Key) -> InputState {
        let mut input = InputState::default();
        input.handle_event(&InputEvent::Key {
            key,
            pressed: true,
            repeat: false,
        });
        input
    }

    fn dragged(dx: f64, dy: f64, left: bool) -> InputState {
        let mut input = InputState::default();
        let button = if left { MouseButton::Left } else { MouseButton::Right };
        input.handle_event(&InputEvent::Button { button, pressed: true });
        input.handle_event(&InputEvent::CursorMoved([dx, dy]));
        input
    }

    #[test]
    fn starts_above_the_podium_looking_down() {
        let camera = Camera::default();
        assert_eq!(camera.position, Vec3::new(0.0, 8.0, 8.0));
        assert!((camera.forward().length() - 1.0).abs() < 1e-5);
        assert!(camera.forward().y < 0.0 && camera.forward().z < 0.0);
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-5));

        // 相机位置在 view space 中是原点，视线指向 -z
        let view = camera.view_matrix();
        assert!(view.transform_point3(camera.position).abs_diff_eq(Vec3::ZERO, 1e-4));
        let ahead = view.transform_point3(camera.position + camera.forward());
        assert!(ahead.abs_diff_eq(Vec3::NEG_Z, 1e-4));
    }

    #[test]
    fn w_moves_along_forward_at_fixed_speed() {
        let mut camera = Camera::default();
        let start = camera.position;
        camera.update(&pressed(Key::W), 1.0, false, false);
        assert!((camera.position - start).abs_diff_eq(camera.forward() * Camera::MOVE_SPEED, 1e-4));

        // UI 占用键盘时不移动
        let moved = camera.position;
        camera.update(&pressed(Key::D), 1.0, false, true);
        assert_eq!(camera.position, moved);
    }

    #[test]
    fn left_drag_rotates_a_sixth_degree_per_pixel() {
        let mut camera = Camera::default();
        let before = camera.forward();
        camera.update(&dragged(60.0, 0.0, true), 0.0, false, false);

        let angle = before.angle_between(camera.forward()).to_degrees();
        assert!((angle - 10.0).abs() < 1e-2);
        // 向右拖动，视线转向 +x
        assert!(camera.forward().x > 0.0);
        assert_eq!(camera.position, Vec3::new(0.0, 8.0, 8.0));
    }

    #[test]
    fn pitch_stops_before_looking_straight_down() {
        let mut camera = Camera::default();
        camera.rotate(0.0, 10_000.0);
        assert!(camera.forward().y.abs() < Camera::MAX_FORWARD_Y);
        assert!(camera.right().is_finite());
    }

    #[test]
    fn right_drag_pans_in_world_xy() {
        let mut camera = Camera::default();
        let forward = camera.forward();
        camera.update(&dragged(40.0, 80.0, false), 0.0, false, false);
        assert!(camera.position.abs_diff_eq(Vec3::new(1.0, 6.0, 8.0), 1e-5));
        assert_eq!(camera.forward(), forward);

        // UI 占用鼠标时忽略拖动
        camera.update(&dragged(40.0, 80.0, false), 0.0, true, false);
        assert!(camera.position.abs_diff_eq(Vec3::new(1.0, 6.0, 8.0), 1e-5));
    }

    #[test]
    fn scroll_pulls_z_towards_one() {
        let mut camera = Camera::default();
        camera.scroll(1.0);
        assert!((camera.position.z - 8f32.powf(1.0 / 1.02)).abs() < 1e-5);
        camera.scroll(-1.0);
        assert!((camera.position.z - 8.0).abs() < 1e-4);

        camera.position.z = -8.0;
        camera.scroll(1.0);
        assert!(camera.position.z < 0.0 && camera.position.z > -8.0);
    }

    #[test]
    fn projection_uses_sixty_degree_fov() {
        let camera = Camera::default();
        let proj = camera.proj_matrix(1.0);
        // 视锥上边缘的点落在 NDC 的 y = -1（Vulkan 中 y 向下）
        let half = (Camera::FOV_Y_DEG / 2.0).to_radians();
        let top = proj * Vec3::new(0.0, half.tan(), -1.0).extend(1.0);
        assert!((top.y / top.w + 1.0).abs() < 1e-4);
    }
}
