use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;
use umbra_gfx::resources::vertex::Vertex3D;

use crate::shapes::Shape;

/// 坐标系：RightHand, X-Right, Y-Up
///
/// 以原点为中心、半径为 1 的 UV 球。纬线 `tessellation` 段，经线 `2 * tessellation` 段，
/// 经度 0 位于 +Z，纬度从南极 (-Y) 开始。
///
/// `inside_out` 的球法线朝内，三角形从内侧看为逆时针，用作天空球
pub struct Sphere {
    pub tessellation: u32,
    pub inside_out: bool,
}
impl Sphere {
    pub fn new(tessellation: u32) -> Self {
        Self {
            tessellation: tessellation.max(3),
            inside_out: false,
        }
    }

    pub fn inverted(tessellation: u32) -> Self {
        Self {
            inside_out: true,
            ..Self::new(tessellation)
        }
    }

    #[inline]
    fn segments(&self) -> (u32, u32) {
        (self.tessellation, self.tessellation * 2)
    }
}
impl Shape for Sphere {
    fn name(&self) -> &str {
        if self.inside_out { "inverted-sphere" } else { "sphere" }
    }

    fn vertices(&self) -> Vec<Vertex3D> {
        let (vertical, horizontal) = self.segments();
        let mut vertices = Vec::with_capacity(((vertical + 1) * (horizontal + 1)) as usize);

        for i in 0..=vertical {
            let v = 1.0 - i as f32 / vertical as f32;
            let latitude = i as f32 * PI / vertical as f32 - FRAC_PI_2;
            let (dy, dxz) = latitude.sin_cos();

            for j in 0..=horizontal {
                let u = j as f32 / horizontal as f32;
                let longitude = j as f32 * TAU / horizontal as f32;
                let (dx, dz) = longitude.sin_cos();

                let normal = Vec3::new(dx * dxz, dy, dz * dxz);
                let (normal_out, u) = if self.inside_out { (-normal, 1.0 - u) } else { (normal, u) };
                vertices.push(Vertex3D::new(normal.to_array(), normal_out.to_array(), [u, v]));
            }
        }
        vertices
    }

    fn indices(&self) -> Vec<u32> {
        let (vertical, horizontal) = self.segments();
        let stride = horizontal + 1;
        let mut indices = Vec::with_capacity((vertical * horizontal * 6) as usize);

        for i in 0..vertical {
            for j in 0..horizontal {
                let a = i * stride + j;
                let b = i * stride + j + 1;
                let c = (i + 1) * stride + j;
                let d = (i + 1) * stride + j + 1;

                // 从外侧看 ABC, BDC 为逆时针
                let quad = [a, b, c, b, d, c];
                if self.inside_out {
                    indices.extend(quad.chunks(3).flat_map(|t| [t[0], t[2], t[1]]));
                } else {
                    indices.extend(quad);
                }
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::test_utils::assert_ccw_facing_normals;

    #[test]
    fn sphere_normals_are_unit_and_radial() {
        let sphere = Sphere::new(32);
        let vertices = sphere.vertices();
        assert_eq!(vertices.len(), 33 * 65);
        assert_eq!(sphere.indices().len(), 32 * 64 * 6);

        for v in &vertices {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(p.abs_diff_eq(n, 1e-6));
        }
        assert_ccw_facing_normals(&sphere);
    }

    #[test]
    fn inverted_sphere_faces_inward() {
        let sky = Sphere::inverted(16);
        assert_ccw_facing_normals(&sky);
        for v in sky.vertices() {
            let p = Vec3::from(v.position);
            assert!(p.abs_diff_eq(-Vec3::from(v.normal), 1e-6));
        }
    }

    #[test]
    fn tessellation_is_clamped() {
        let s = Sphere::new(0);
        assert_eq!(s.tessellation, 3);
        assert!(s.indices().iter().all(|i| (*i as usize) < s.vertices().len()));
    }
}
