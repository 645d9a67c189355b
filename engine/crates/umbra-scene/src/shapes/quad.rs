use umbra_gfx::resources::vertex::Vertex3D;

use crate::shapes::Shape;

/// z = 0 平面上覆盖 [-1, 1]² 的四边形，法线 +Z
///
/// 直接当作 NDC 中的全屏四边形使用，uv 的 v 轴向下
pub struct Quad;
impl Quad {
    /// 逆时针：左下、右下、右上、左上
    const CORNERS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
}
impl Shape for Quad {
    fn name(&self) -> &str {
        "quad"
    }

    fn vertices(&self) -> Vec<Vertex3D> {
        Self::CORNERS
            .iter()
            .map(|&[x, y]| Vertex3D::new([x, y, 0.0], [0.0, 0.0, 1.0], [(x + 1.0) * 0.5, (1.0 - y) * 0.5]))
            .collect()
    }

    fn indices(&self) -> Vec<u32> {
        vec![0, 1, 2, 0, 2, 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::test_utils::assert_ccw_facing_normals;

    #[test]
    fn quad_faces_positive_z() {
        assert_ccw_facing_normals(&Quad);
        assert_eq!(Quad.indices().len(), 6);
    }

    #[test]
    fn top_left_corner_is_uv_origin() {
        let top_left = Quad.vertices()[3];
        assert_eq!(top_left.uv, [0.0, 0.0]);
    }
}
