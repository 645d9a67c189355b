use glam::Mat4;

/// 右手系透视投影，输出 Vulkan 的裁剪空间：深度 [0, 1]，y 轴向下
///
/// 翻转 y 之后，右手系中逆时针的三角形在 framebuffer 中仍然是逆时针
pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::perspective_rh(fov_y_radians, aspect, near, far);
    proj.y_axis.y = -proj.y_axis.y;
    proj
}

/// 点经过 view-projection 之后是否落在 [-1, 1]² 之内，不考虑深度
pub fn is_on_screen(view_proj: Mat4, point: glam::Vec3) -> bool {
    let clip = view_proj * point.extend(1.0);
    if clip.w <= 0.0 {
        return false;
    }
    (clip.x / clip.w).abs() < 1.0 && (clip.y / clip.w).abs() < 1.0
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4Swizzles};

    use super::*;

    #[test]
    fn depth_range_and_y_flip() {
        let proj = perspective(60f32.to_radians(), 16.0 / 9.0, 0.1, 5000.0);

        let near = proj * Vec3::new(0.0, 0.0, -0.1).extend(1.0);
        let far = proj * Vec3::new(0.0, 0.0, -5000.0).extend(1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);

        // 相机上方的点在 Vulkan 的 NDC 中 y 为负
        let up = proj * Vec3::new(0.0, 1.0, -5.0).extend(1.0);
        assert!(up.y / up.w < 0.0);
    }

    #[test]
    fn points_behind_the_camera_are_off_screen() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let view_proj = perspective(60f32.to_radians(), 1.0, 0.1, 100.0) * view;
        assert!(is_on_screen(view_proj, Vec3::new(0.0, 0.0, -10.0)));
        assert!(!is_on_screen(view_proj, Vec3::new(0.0, 0.0, 10.0)));
        assert!(!is_on_screen(view_proj, Vec3::new(100.0, 0.0, -10.0)));
        assert_eq!((view_proj * Vec3::ZERO.extend(1.0)).xyz().x, 0.0);
    }
}
