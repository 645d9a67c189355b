use glam::Vec3;

/// CPU 侧的材质数据：漫反射、高光以及粗糙度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub roughness: f32,
}
impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec3::splat(0.5),
            specular: Vec3::ZERO,
            roughness: 1.0,
        }
    }
}
impl Material {
    pub const fn new(diffuse: Vec3, specular: Vec3, roughness: f32) -> Self {
        Self {
            diffuse,
            specular,
            roughness,
        }
    }

    /// 不反射任何光，用于天空球以及分组节点
    pub const BLACK: Self = Self::new(Vec3::ZERO, Vec3::ZERO, 0.0);

    /// 光源位置上的小球
    pub const EMISSIVE_MARKER: Self = Self::new(Vec3::ONE, Vec3::ZERO, 1.0);

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Vec3 {
        Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}
