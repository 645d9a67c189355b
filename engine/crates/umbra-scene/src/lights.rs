//! 光源
//!
//! 第 0 个光源投射阴影，其余是不投射阴影的点光源，一起以 StructuredBuffer 的形式交给 lighting pass。

use glam::{Mat4, Vec3};
use rand::Rng;
use umbra_render_interface::gpu_data::LightData;

use crate::projection;

/// 投射阴影的光源，菜单中可以修改
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowLight {
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
    pub shadow_min: f32,
    pub shadow_max: f32,
}
impl Default for ShadowLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, -9.0),
            near: 0.1,
            far: 10000.0,
            shadow_min: -24.0,
            shadow_max: 24.0,
        }
    }
}
impl ShadowLight {
    /// 90 度视角，正方形的 shadow map
    const FOV_Y: f32 = std::f32::consts::FRAC_PI_2;
    const RANGE: f32 = 1000.0;

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    pub fn proj(&self) -> Mat4 {
        projection::perspective(Self::FOV_Y, 1.0, self.near, self.far)
    }

    /// 阴影深度的范围根据光源到原点的距离向外扩展
    pub fn to_gpu(&self) -> LightData {
        let dist = self.position.length();
        LightData {
            shadow_view: self.view(),
            shadow_proj: self.proj(),
            light_pos: self.position,
            shadow_min: self.shadow_min - dist,
            light_color: Vec3::ONE,
            shadow_max: self.shadow_max + dist,
            use_shadows: 1,
            range: Self::RANGE,
            _padding: [0.0; 2],
        }
    }
}

/// 场景中所有的光源
pub struct Lights {
    pub shadow: ShadowLight,
    points: Vec<LightData>,
}
impl Lights {
    pub const POINT_LIGHT_COUNT: usize = 1024;
    const POINT_LIGHT_RANGE: f32 = 20.0;

    /// 点光源按 `((2i) % 64 - 32, 0, (2i) / 32 - 32)` 排列，颜色随机
    pub fn new(rng: &mut impl Rng) -> Self {
        let points = (0..Self::POINT_LIGHT_COUNT as i32)
            .map(|i| {
                let pos = Vec3::new(((i * 2) % 64 - 32) as f32, 0.0, ((i * 2) / 32 - 32) as f32);
                let color = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
                LightData::point(pos, color, Self::POINT_LIGHT_RANGE)
            })
            .collect();
        Self {
            shadow: ShadowLight::default(),
            points,
        }
    }

    /// 上传给 GPU 的数组，第 0 个是阴影光源
    pub fn to_gpu(&self) -> Vec<LightData> {
        std::iter::once(self.shadow.to_gpu()).chain(self.points.iter().copied()).collect()
    }

    /// 所有光源的位置，用于绘制光源标记
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        std::iter::once(self.shadow.position).chain(self.points.iter().map(|l| l.light_pos))
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.points.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn point_lights_follow_the_grid() {
        let lights = Lights::new(&mut StdRng::seed_from_u64(7));
        let gpu = lights.to_gpu();
        assert_eq!(gpu.len(), 1025);
        assert_eq!(lights.count(), 1025);

        assert_eq!(gpu[1].light_pos, Vec3::new(-32.0, 0.0, -32.0));
        assert_eq!(gpu[2].light_pos, Vec3::new(-30.0, 0.0, -32.0));
        // i = 32: x 回到 -32，z 前进 2
        assert_eq!(gpu[33].light_pos, Vec3::new(-32.0, 0.0, -30.0));
        assert_eq!(gpu[1024].light_pos, Vec3::new(30.0, 0.0, 31.0));

        for l in &gpu[1..] {
            assert_eq!((l.use_shadows, l.range), (0, 20.0));
            assert!(l.light_color.min_element() >= 0.0 && l.light_color.max_element() <= 1.0);
        }
    }

    #[test]
    fn shadow_range_grows_with_distance() {
        let light = ShadowLight::default();
        let gpu = light.to_gpu();
        let dist = Vec3::new(0.0, 2.0, -9.0).length();
        assert_eq!(gpu.use_shadows, 1);
        assert!((gpu.shadow_min - (-24.0 - dist)).abs() < 1e-5);
        assert!((gpu.shadow_max - (24.0 + dist)).abs() < 1e-5);

        // 光源看向原点
        let origin = gpu.shadow_proj * gpu.shadow_view * Vec3::ZERO.extend(1.0);
        assert!((origin.x / origin.w).abs() < 1e-5 && (origin.y / origin.w).abs() < 1e-5);
    }
}
