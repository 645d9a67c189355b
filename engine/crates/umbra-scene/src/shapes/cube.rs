use glam::Vec3;
use umbra_gfx::resources::vertex::Vertex3D;

use crate::shapes::Shape;

/// 坐标系：RightHand, X-Right, Y-Up
///
/// 以原点为中心、边长为 `size` 的立方体，每个面 4 个顶点，法线不共享
///
/// 每个面从外侧看（以 +Z 面为例）：
///
/// ```text
///        s1^
///          |
///    C-----------B
///     |    |    |
/// ----|----+----|----> -s2
///     |    |    |
///    D-----------A
///          |
/// ```
///
/// 其中 `s1 = (n.y, n.z, n.x)`，`s2 = n × s1`，三角形绕序 CCW: ABC, ACD
pub struct Cube {
    pub size: f32,
}
impl Default for Cube {
    fn default() -> Self {
        Self { size: 1.0 }
    }
}
impl Cube {
    const FACE_NORMALS: [Vec3; 6] = [
        Vec3::Z,
        Vec3::NEG_Z,
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
    ];
    const FACE_UVS: [[f32; 2]; 4] = [[1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [0.0, 1.0]];
    const FACE_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];
}
impl Shape for Cube {
    fn name(&self) -> &str {
        "cube"
    }

    fn vertices(&self) -> Vec<Vertex3D> {
        let half = self.size * 0.5;
        Self::FACE_NORMALS
            .iter()
            .flat_map(|&n| {
                let s1 = Vec3::new(n.y, n.z, n.x);
                let s2 = n.cross(s1);
                let corners = [n - s1 - s2, n + s1 - s2, n + s1 + s2, n - s1 + s2];
                corners
                    .into_iter()
                    .zip(Self::FACE_UVS)
                    .map(move |(c, uv)| Vertex3D::new((c * half).to_array(), n.to_array(), uv))
            })
            .collect()
    }

    fn indices(&self) -> Vec<u32> {
        (0..Self::FACE_NORMALS.len() as u32)
            .flat_map(|face| Self::FACE_INDICES.map(|i| face * 4 + i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::test_utils::assert_ccw_facing_normals;

    #[test]
    fn cube_is_closed_and_outward() {
        let cube = Cube::default();
        assert_eq!(cube.vertices().len(), 24);
        assert_eq!(cube.indices().len(), 36);
        assert_ccw_facing_normals(&cube);

        for v in cube.vertices() {
            assert!(v.position.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
        }
    }
}
