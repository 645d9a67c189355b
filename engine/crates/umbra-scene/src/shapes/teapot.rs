use glam::Vec3;
use umbra_gfx::resources::vertex::Vertex3D;

use crate::shapes::Shape;

/// Utah teapot：32 片双三次 Bézier 曲面，每片细分为 `tessellation * tessellation` 个四边形
///
/// 控制点数据以 Z 为高度，生成时转换到 Y-Up，并缩放到高约 1.05、以原点为中心
pub struct Teapot {
    pub tessellation: u32,
}
impl Teapot {
    const HEIGHT: f32 = 3.15;
    const SCALE: f32 = 1.0 / 3.0;

    pub fn new(tessellation: u32) -> Self {
        Self {
            tessellation: tessellation.max(1),
        }
    }

    /// Z-Up 转到 Y-Up，是一个旋转，不改变三角形的朝向
    #[inline]
    fn to_y_up(p: Vec3) -> Vec3 {
        Vec3::new(p.x, p.z, -p.y)
    }

    fn control_points(patch: &[u16; 16]) -> [[Vec3; 4]; 4] {
        std::array::from_fn(|row| {
            std::array::from_fn(|col| Vec3::from(CONTROL_POINTS[patch[row * 4 + col] as usize - 1]))
        })
    }
}

fn bernstein(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * s * s * t, 3.0 * s * t * t, t * t * t]
}

fn bernstein_derivative(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [-3.0 * s * s, 3.0 * s * (s - 2.0 * t), 3.0 * t * (2.0 * s - t), 3.0 * t * t]
}

fn weighted(cp: &[[Vec3; 4]; 4], wu: [f32; 4], wv: [f32; 4]) -> Vec3 {
    let mut sum = Vec3::ZERO;
    for (row, u) in cp.iter().zip(wu) {
        for (point, v) in row.iter().zip(wv) {
            sum += *point * (u * v);
        }
    }
    sum
}

impl Shape for Teapot {
    fn name(&self) -> &str {
        "teapot"
    }

    fn vertices(&self) -> Vec<Vertex3D> {
        let n = self.tessellation;
        let mut vertices = Vec::with_capacity(PATCHES.len() * ((n + 1) * (n + 1)) as usize);

        for patch in &PATCHES {
            let cp = Self::control_points(patch);
            for i in 0..=n {
                let u = i as f32 / n as f32;
                let (bu, du) = (bernstein(u), bernstein_derivative(u));
                for j in 0..=n {
                    let v = j as f32 / n as f32;
                    let (bv, dv) = (bernstein(v), bernstein_derivative(v));

                    let position = weighted(&cp, bu, bv);
                    let tangent_u = weighted(&cp, du, bv);
                    let tangent_v = weighted(&cp, bu, dv);

                    // 盖顶和壶底的一整行控制点重合，切线退化，法线取竖直方向
                    let normal = tangent_v.cross(tangent_u);
                    let normal = if normal.length() > 1e-4 {
                        normal.normalize()
                    } else {
                        Vec3::Z * (position.z - Self::HEIGHT / 2.0).signum()
                    };

                    let position = (position - Vec3::Z * (Self::HEIGHT / 2.0)) * Self::SCALE;
                    vertices.push(Vertex3D::new(
                        Self::to_y_up(position).to_array(),
                        Self::to_y_up(normal).to_array(),
                        [u, v],
                    ));
                }
            }
        }
        vertices
    }

    fn indices(&self) -> Vec<u32> {
        let n = self.tessellation;
        let stride = n + 1;
        let mut indices = Vec::with_capacity(PATCHES.len() * (n * n * 6) as usize);

        for p in 0..PATCHES.len() as u32 {
            let base = p * stride * stride;
            for i in 1..=n {
                for j in 1..=n {
                    let a = base + (i - 1) * stride + (j - 1);
                    let b = base + (i - 1) * stride + j;
                    let c = base + i * stride + j;
                    let d = base + i * stride + (j - 1);
                    indices.extend([a, b, c, a, c, d]);
                }
            }
        }
        indices
    }
}

/// 每片曲面 4x4 个控制点，序号从 1 开始
#[rustfmt::skip]
const PATCHES: [[u16; 16]; 32] = [
    [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
    [4, 17, 18, 19, 8, 20, 21, 22, 12, 23, 24, 25, 16, 26, 27, 28],
    [19, 29, 30, 31, 22, 32, 33, 34, 25, 35, 36, 37, 28, 38, 39, 40],
    [31, 41, 42, 1, 34, 43, 44, 5, 37, 45, 46, 9, 40, 47, 48, 13],
    [13, 14, 15, 16, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60],
    [16, 26, 27, 28, 52, 61, 62, 63, 56, 64, 65, 66, 60, 67, 68, 69],
    [28, 38, 39, 40, 63, 70, 71, 72, 66, 73, 74, 75, 69, 76, 77, 78],
    [40, 47, 48, 13, 72, 79, 80, 49, 75, 81, 82, 53, 78, 83, 84, 57],
    [57, 58, 59, 60, 85, 86, 87, 88, 89, 90, 91, 92, 93, 94, 95, 96],
    [60, 67, 68, 69, 88, 97, 98, 99, 92, 100, 101, 102, 96, 103, 104, 105],
    [69, 76, 77, 78, 99, 106, 107, 108, 102, 109, 110, 111, 105, 112, 113, 114],
    [78, 83, 84, 57, 108, 115, 116, 85, 111, 117, 118, 89, 114, 119, 120, 93],
    [121, 122, 123, 124, 125, 126, 127, 128, 129, 130, 131, 132, 133, 134, 135, 136],
    [124, 137, 138, 121, 128, 139, 140, 125, 132, 141, 142, 129, 136, 143, 144, 133],
    [133, 134, 135, 136, 145, 146, 147, 148, 149, 150, 151, 152, 69, 153, 154, 155],
    [136, 143, 144, 133, 148, 156, 157, 145, 152, 158, 159, 149, 155, 160, 161, 69],
    [162, 163, 164, 165, 166, 167, 168, 169, 170, 171, 172, 173, 174, 175, 176, 177],
    [165, 178, 179, 162, 169, 180, 181, 166, 173, 182, 183, 170, 177, 184, 185, 174],
    [174, 175, 176, 177, 186, 187, 188, 189, 190, 191, 192, 193, 194, 195, 196, 197],
    [177, 184, 185, 174, 189, 198, 199, 186, 193, 200, 201, 190, 197, 202, 203, 194],
    [204, 204, 204, 204, 207, 208, 209, 210, 211, 211, 211, 211, 212, 213, 214, 215],
    [204, 204, 204, 204, 210, 217, 218, 219, 211, 211, 211, 211, 215, 220, 221, 222],
    [204, 204, 204, 204, 219, 224, 225, 226, 211, 211, 211, 211, 222, 227, 228, 229],
    [204, 204, 204, 204, 226, 230, 231, 207, 211, 211, 211, 211, 229, 232, 233, 212],
    [212, 213, 214, 215, 234, 235, 236, 237, 238, 239, 240, 241, 242, 243, 244, 245],
    [215, 220, 221, 222, 237, 246, 247, 248, 241, 249, 250, 251, 245, 252, 253, 254],
    [222, 227, 228, 229, 248, 255, 256, 257, 251, 258, 259, 260, 254, 261, 262, 263],
    [229, 232, 233, 212, 257, 264, 265, 234, 260, 266, 267, 238, 263, 268, 269, 242],
    [270, 270, 270, 270, 279, 280, 281, 282, 275, 276, 277, 278, 271, 272, 273, 274],
    [270, 270, 270, 270, 282, 289, 290, 291, 278, 286, 287, 288, 274, 283, 284, 285],
    [270, 270, 270, 270, 291, 298, 299, 300, 288, 295, 296, 297, 285, 292, 293, 294],
    [270, 270, 270, 270, 300, 305, 306, 279, 297, 303, 304, 275, 294, 301, 302, 271],
];

#[rustfmt::skip]
const CONTROL_POINTS: [[f32; 3]; 306] = [
    [1.4, 0.0, 2.4], [1.4, -0.784, 2.4], [0.784, -1.4, 2.4], [0.0, -1.4, 2.4], [1.3375, 0.0, 2.53125],
    [1.3375, -0.749, 2.53125], [0.749, -1.3375, 2.53125], [0.0, -1.3375, 2.53125], [1.4375, 0.0, 2.53125],
    [1.4375, -0.805, 2.53125], [0.805, -1.4375, 2.53125], [0.0, -1.4375, 2.53125], [1.5, 0.0, 2.4], [1.5, -0.84, 2.4],
    [0.84, -1.5, 2.4], [0.0, -1.5, 2.4], [-0.784, -1.4, 2.4], [-1.4, -0.784, 2.4], [-1.4, 0.0, 2.4],
    [-0.749, -1.3375, 2.53125], [-1.3375, -0.749, 2.53125], [-1.3375, 0.0, 2.53125], [-0.805, -1.4375, 2.53125],
    [-1.4375, -0.805, 2.53125], [-1.4375, 0.0, 2.53125], [-0.84, -1.5, 2.4], [-1.5, -0.84, 2.4], [-1.5, 0.0, 2.4],
    [-1.4, 0.784, 2.4], [-0.784, 1.4, 2.4], [0.0, 1.4, 2.4], [-1.3375, 0.749, 2.53125], [-0.749, 1.3375, 2.53125],
    [0.0, 1.3375, 2.53125], [-1.4375, 0.805, 2.53125], [-0.805, 1.4375, 2.53125], [0.0, 1.4375, 2.53125],
    [-1.5, 0.84, 2.4], [-0.84, 1.5, 2.4], [0.0, 1.5, 2.4], [0.784, 1.4, 2.4], [1.4, 0.784, 2.4],
    [0.749, 1.3375, 2.53125], [1.3375, 0.749, 2.53125], [0.805, 1.4375, 2.53125], [1.4375, 0.805, 2.53125],
    [0.84, 1.5, 2.4], [1.5, 0.84, 2.4], [1.75, 0.0, 1.875], [1.75, -0.98, 1.875], [0.98, -1.75, 1.875],
    [0.0, -1.75, 1.875], [2.0, 0.0, 1.35], [2.0, -1.12, 1.35], [1.12, -2.0, 1.35], [0.0, -2.0, 1.35], [2.0, 0.0, 0.9],
    [2.0, -1.12, 0.9], [1.12, -2.0, 0.9], [0.0, -2.0, 0.9], [-0.98, -1.75, 1.875], [-1.75, -0.98, 1.875],
    [-1.75, 0.0, 1.875], [-1.12, -2.0, 1.35], [-2.0, -1.12, 1.35], [-2.0, 0.0, 1.35], [-1.12, -2.0, 0.9],
    [-2.0, -1.12, 0.9], [-2.0, 0.0, 0.9], [-1.75, 0.98, 1.875], [-0.98, 1.75, 1.875], [0.0, 1.75, 1.875],
    [-2.0, 1.12, 1.35], [-1.12, 2.0, 1.35], [0.0, 2.0, 1.35], [-2.0, 1.12, 0.9], [-1.12, 2.0, 0.9], [0.0, 2.0, 0.9],
    [0.98, 1.75, 1.875], [1.75, 0.98, 1.875], [1.12, 2.0, 1.35], [2.0, 1.12, 1.35], [1.12, 2.0, 0.9],
    [2.0, 1.12, 0.9], [2.0, 0.0, 0.45], [2.0, -1.12, 0.45], [1.12, -2.0, 0.45], [0.0, -2.0, 0.45], [1.5, 0.0, 0.225],
    [1.5, -0.84, 0.225], [0.84, -1.5, 0.225], [0.0, -1.5, 0.225], [1.5, 0.0, 0.15], [1.5, -0.84, 0.15],
    [0.84, -1.5, 0.15], [0.0, -1.5, 0.15], [-1.12, -2.0, 0.45], [-2.0, -1.12, 0.45], [-2.0, 0.0, 0.45],
    [-0.84, -1.5, 0.225], [-1.5, -0.84, 0.225], [-1.5, 0.0, 0.225], [-0.84, -1.5, 0.15], [-1.5, -0.84, 0.15],
    [-1.5, 0.0, 0.15], [-2.0, 1.12, 0.45], [-1.12, 2.0, 0.45], [0.0, 2.0, 0.45], [-1.5, 0.84, 0.225],
    [-0.84, 1.5, 0.225], [0.0, 1.5, 0.225], [-1.5, 0.84, 0.15], [-0.84, 1.5, 0.15], [0.0, 1.5, 0.15],
    [1.12, 2.0, 0.45], [2.0, 1.12, 0.45], [0.84, 1.5, 0.225], [1.5, 0.84, 0.225], [0.84, 1.5, 0.15],
    [1.5, 0.84, 0.15], [-1.6, 0.0, 2.025], [-1.6, -0.3, 2.025], [-1.5, -0.3, 2.25], [-1.5, 0.0, 2.25],
    [-2.3, 0.0, 2.025], [-2.3, -0.3, 2.025], [-2.5, -0.3, 2.25], [-2.5, 0.0, 2.25], [-2.7, 0.0, 2.025],
    [-2.7, -0.3, 2.025], [-3.0, -0.3, 2.25], [-3.0, 0.0, 2.25], [-2.7, 0.0, 1.8], [-2.7, -0.3, 1.8],
    [-3.0, -0.3, 1.8], [-3.0, 0.0, 1.8], [-1.5, 0.3, 2.25], [-1.6, 0.3, 2.025], [-2.5, 0.3, 2.25], [-2.3, 0.3, 2.025],
    [-3.0, 0.3, 2.25], [-2.7, 0.3, 2.025], [-3.0, 0.3, 1.8], [-2.7, 0.3, 1.8], [-2.7, 0.0, 1.575],
    [-2.7, -0.3, 1.575], [-3.0, -0.3, 1.35], [-3.0, 0.0, 1.35], [-2.5, 0.0, 1.125], [-2.5, -0.3, 1.125],
    [-2.65, -0.3, 0.9375], [-2.65, 0.0, 0.9375], [-2.0, -0.3, 0.9], [-1.9, -0.3, 0.6], [-1.9, 0.0, 0.6],
    [-3.0, 0.3, 1.35], [-2.7, 0.3, 1.575], [-2.65, 0.3, 0.9375], [-2.5, 0.3, 1.125], [-1.9, 0.3, 0.6],
    [-2.0, 0.3, 0.9], [1.7, 0.0, 1.425], [1.7, -0.66, 1.425], [1.7, -0.66, 0.6], [1.7, 0.0, 0.6], [2.6, 0.0, 1.425],
    [2.6, -0.66, 1.425], [3.1, -0.66, 0.825], [3.1, 0.0, 0.825], [2.3, 0.0, 2.1], [2.3, -0.25, 2.1],
    [2.4, -0.25, 2.025], [2.4, 0.0, 2.025], [2.7, 0.0, 2.4], [2.7, -0.25, 2.4], [3.3, -0.25, 2.4], [3.3, 0.0, 2.4],
    [1.7, 0.66, 0.6], [1.7, 0.66, 1.425], [3.1, 0.66, 0.825], [2.6, 0.66, 1.425], [2.4, 0.25, 2.025],
    [2.3, 0.25, 2.1], [3.3, 0.25, 2.4], [2.7, 0.25, 2.4], [2.8, 0.0, 2.475], [2.8, -0.25, 2.475],
    [3.525, -0.25, 2.49375], [3.525, 0.0, 2.49375], [2.9, 0.0, 2.475], [2.9, -0.15, 2.475], [3.45, -0.15, 2.5125],
    [3.45, 0.0, 2.5125], [2.8, 0.0, 2.4], [2.8, -0.15, 2.4], [3.2, -0.15, 2.4], [3.2, 0.0, 2.4],
    [3.525, 0.25, 2.49375], [2.8, 0.25, 2.475], [3.45, 0.15, 2.5125], [2.9, 0.15, 2.475], [3.2, 0.15, 2.4],
    [2.8, 0.15, 2.4], [0.0, 0.0, 3.15], [0.0, -0.002, 3.15], [0.002, 0.0, 3.15], [0.8, 0.0, 3.15], [0.8, -0.45, 3.15],
    [0.45, -0.8, 3.15], [0.0, -0.8, 3.15], [0.0, 0.0, 2.85], [0.2, 0.0, 2.7], [0.2, -0.112, 2.7], [0.112, -0.2, 2.7],
    [0.0, -0.2, 2.7], [-0.002, 0.0, 3.15], [-0.45, -0.8, 3.15], [-0.8, -0.45, 3.15], [-0.8, 0.0, 3.15],
    [-0.112, -0.2, 2.7], [-0.2, -0.112, 2.7], [-0.2, 0.0, 2.7], [0.0, 0.002, 3.15], [-0.8, 0.45, 3.15],
    [-0.45, 0.8, 3.15], [0.0, 0.8, 3.15], [-0.2, 0.112, 2.7], [-0.112, 0.2, 2.7], [0.0, 0.2, 2.7], [0.45, 0.8, 3.15],
    [0.8, 0.45, 3.15], [0.112, 0.2, 2.7], [0.2, 0.112, 2.7], [0.4, 0.0, 2.55], [0.4, -0.224, 2.55],
    [0.224, -0.4, 2.55], [0.0, -0.4, 2.55], [1.3, 0.0, 2.55], [1.3, -0.728, 2.55], [0.728, -1.3, 2.55],
    [0.0, -1.3, 2.55], [1.3, 0.0, 2.4], [1.3, -0.728, 2.4], [0.728, -1.3, 2.4], [0.0, -1.3, 2.4],
    [-0.224, -0.4, 2.55], [-0.4, -0.224, 2.55], [-0.4, 0.0, 2.55], [-0.728, -1.3, 2.55], [-1.3, -0.728, 2.55],
    [-1.3, 0.0, 2.55], [-0.728, -1.3, 2.4], [-1.3, -0.728, 2.4], [-1.3, 0.0, 2.4], [-0.4, 0.224, 2.55],
    [-0.224, 0.4, 2.55], [0.0, 0.4, 2.55], [-1.3, 0.728, 2.55], [-0.728, 1.3, 2.55], [0.0, 1.3, 2.55],
    [-1.3, 0.728, 2.4], [-0.728, 1.3, 2.4], [0.0, 1.3, 2.4], [0.224, 0.4, 2.55], [0.4, 0.224, 2.55],
    [0.728, 1.3, 2.55], [1.3, 0.728, 2.55], [0.728, 1.3, 2.4], [1.3, 0.728, 2.4], [0.0, 0.0, 0.0], [1.5, 0.0, 0.15],
    [1.5, 0.84, 0.15], [0.84, 1.5, 0.15], [0.0, 1.5, 0.15], [1.5, 0.0, 0.075], [1.5, 0.84, 0.075], [0.84, 1.5, 0.075],
    [0.0, 1.5, 0.075], [1.425, 0.0, 0.0], [1.425, 0.798, 0.0], [0.798, 1.425, 0.0], [0.0, 1.425, 0.0],
    [-0.84, 1.5, 0.15], [-1.5, 0.84, 0.15], [-1.5, 0.0, 0.15], [-0.84, 1.5, 0.075], [-1.5, 0.84, 0.075],
    [-1.5, 0.0, 0.075], [-0.798, 1.425, 0.0], [-1.425, 0.798, 0.0], [-1.425, 0.0, 0.0], [-1.5, -0.84, 0.15],
    [-0.84, -1.5, 0.15], [0.0, -1.5, 0.15], [-1.5, -0.84, 0.075], [-0.84, -1.5, 0.075], [0.0, -1.5, 0.075],
    [-1.425, -0.798, 0.0], [-0.798, -1.425, 0.0], [0.0, -1.425, 0.0], [0.84, -1.5, 0.15], [1.5, -0.84, 0.15],
    [0.84, -1.5, 0.075], [1.5, -0.84, 0.075], [0.798, -1.425, 0.0], [1.425, -0.798, 0.0],
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::test_utils::assert_ccw_facing_normals;

    #[test]
    fn teapot_patches_are_outward_and_unit() {
        let teapot = Teapot::new(6);
        let vertices = teapot.vertices();
        assert_eq!(vertices.len(), 32 * 7 * 7);
        assert_eq!(teapot.indices().len(), 32 * 6 * 6 * 6);
        assert!(vertices.iter().all(|v| (Vec3::from(v.normal).length() - 1.0).abs() < 1e-4));
        assert_ccw_facing_normals(&teapot);
    }

    #[test]
    fn teapot_is_centered_and_upright() {
        let vertices = Teapot::new(4).vertices();
        let ys = vertices.iter().map(|v| v.position[1]);
        let (min_y, max_y) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
        assert!((max_y - 0.525).abs() < 1e-4, "{max_y}");
        assert!((min_y + 0.525).abs() < 1e-4, "{min_y}");
        assert!(vertices.iter().all(|v| v.position.iter().all(|c| c.abs() < 1.2)));

        // 盖顶的法线朝上，壶底朝下
        let top = vertices.iter().find(|v| (v.position[1] - max_y).abs() < 1e-5).unwrap();
        let bottom = vertices.iter().find(|v| (v.position[1] - min_y).abs() < 1e-5).unwrap();
        assert!(top.normal[1] > 0.9);
        assert!(bottom.normal[1] < -0.9);
    }
}
