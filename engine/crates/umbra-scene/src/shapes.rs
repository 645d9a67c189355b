//! 内置形状
//!
//! 每种形状只实现 [`Shape`]，上传为 [`crate::components::mesh::GpuMesh`] 之后具体类型就不再需要。
//!
//! 所有形状都使用右手系（X-Right, Y-Up），从外侧看三角形为逆时针。

mod cube;
mod quad;
mod sphere;
mod teapot;

pub use cube::Cube;
pub use quad::Quad;
pub use sphere::Sphere;
pub use teapot::Teapot;

use umbra_gfx::resources::vertex::Vertex3D;

/// 形状只提供几何数据，材质挂在场景节点上
pub trait Shape {
    fn name(&self) -> &str;

    fn vertices(&self) -> Vec<Vertex3D>;

    /// 三角形列表
    fn indices(&self) -> Vec<u32>;
}

#[cfg(test)]
pub(crate) mod test_utils {
    use glam::Vec3;

    use super::Shape;

    /// 每个非退化三角形的几何法线都和顶点法线同向，即从法线一侧看是逆时针
    pub fn assert_ccw_facing_normals(shape: &dyn Shape) {
        let vertices = shape.vertices();
        let indices = shape.indices();
        assert_eq!(indices.len() % 3, 0, "{}", shape.name());
        assert!(indices.iter().all(|i| (*i as usize) < vertices.len()), "{}", shape.name());

        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(vertices[i as usize].position));
            let face = (b - a).cross(c - a);
            if face.length() < 1e-6 {
                continue;
            }
            let n = Vec3::from(vertices[tri[0] as usize].normal);
            assert!(face.dot(n) > 0.0, "{}: triangle {:?} faces away from its normal", shape.name(), tri);
        }
    }
}
