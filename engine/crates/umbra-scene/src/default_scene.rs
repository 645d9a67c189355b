//! 默认场景：天空球、木质台座以及台座上旋转的物体
//!
//! ```text
//! root
//! ├── sky        (inverted sphere, scale 2000)
//! └── central
//!     ├── podium (cube, scale (24, 0.5, 24), y = -1.5)
//!     └── anim   (绕 Y 轴旋转)
//!         ├── teapot  (scale 2, y = 0.25)
//!         └── spheres (scale 16, 默认隐藏)
//!             └── 120 个小球，20 个经度 x 6 行，按色相着色
//! ```
//!
//! 光源标记 `light` 不挂在 root 下，每个可见的光源单独绘制一次。

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};
use umbra_gfx::error::GfxResult;

use crate::{
    components::{material::Material, mesh::MeshLibrary},
    scene_graph::{NodeId, SceneGraph, ShapeId},
    shapes::{Cube, Quad, Sphere, Teapot},
};

/// 构建场景需要的网格
#[derive(Debug, Clone, Copy)]
pub struct BuiltinShapes {
    pub cube: ShapeId,
    pub teapot: ShapeId,
    pub sphere: ShapeId,
    pub sky_sphere: ShapeId,
    pub quad: ShapeId,
}
impl BuiltinShapes {
    pub fn upload(library: &mut MeshLibrary) -> GfxResult<Self> {
        Ok(Self {
            cube: library.register(&Cube::default())?,
            teapot: library.register(&Teapot::new(12))?,
            sphere: library.register(&Sphere::new(32))?,
            sky_sphere: library.register(&Sphere::inverted(16))?,
            quad: library.register(&Quad)?,
        })
    }
}

pub struct DefaultScene {
    pub graph: SceneGraph,

    pub root: NodeId,
    /// shadow pass 只绘制这棵子树
    pub central: NodeId,
    pub anim: NodeId,
    pub sky: NodeId,
    pub podium: NodeId,
    pub teapot: NodeId,
    pub spheres: NodeId,
    pub light_marker: NodeId,
}
impl DefaultScene {
    pub fn build(shapes: &BuiltinShapes) -> Self {
        let mut graph = SceneGraph::new();

        let root = graph.add_group("root");
        let central = graph.add_group("central");
        let anim = graph.add_group("anim");

        let teapot = graph.add_object("teapot", shapes.teapot, Material::new(Vec3::ONE, Vec3::splat(0.5), 0.1));
        let podium =
            graph.add_object("podium", shapes.cube, Material::new(Material::rgb8(87, 51, 35), Vec3::splat(0.01), 1.0));
        let sky = graph.add_object("sky", shapes.sky_sphere, Material::BLACK);
        let spheres = Self::sphere_of_spheres(&mut graph, shapes.sphere);
        graph.node_mut(spheres).visible = false;

        let light_marker = graph.add_object("light", shapes.sphere, Material::EMISSIVE_MARKER);

        graph.add_child(root, sky, Mat4::from_scale(Vec3::splat(2000.0)));
        graph.add_child(root, central, Mat4::IDENTITY);
        graph.add_child(central, podium, Self::podium_transform(Vec3::new(0.0, -1.5, 0.0)));
        graph.add_child(central, anim, Mat4::IDENTITY);
        graph.add_child(
            anim,
            teapot,
            Mat4::from_translation(Vec3::new(0.0, 0.25, 0.0)) * Mat4::from_scale(Vec3::splat(2.0)),
        );
        graph.add_child(anim, spheres, Mat4::from_scale(Vec3::splat(16.0)));
        graph.set_animated(anim);

        log::info!("default scene built with {} nodes", graph.len());
        Self {
            graph,
            root,
            central,
            anim,
            sky,
            podium,
            teapot,
            spheres,
            light_marker,
        }
    }

    /// 单位半球面上的一圈圈小球，经度每 18 度一列，纬度从 0.075 开始每 15 度一行
    ///
    /// 色相随经度变化，越靠近顶部饱和度越低
    fn sphere_of_spheres(graph: &mut SceneGraph, sphere: ShapeId) -> NodeId {
        const COLUMNS: u32 = 20;
        const ROWS: u32 = 6;
        const SCALE: f32 = 0.075;
        const FIRST_ROW: f32 = 0.075;
        const ROW_STEP: f32 = FRAC_PI_2 / ROWS as f32;

        let group = graph.add_group("spheres");
        for column in 0..COLUMNS {
            let angle = (column * 360 / COLUMNS) as f32;
            for row in 0..ROWS {
                let latitude = FIRST_ROW + row as f32 * ROW_STEP;
                let color = hsv_to_rgb(angle / 360.0, 1.0 - latitude / FRAC_PI_2, 1.0);
                let ball = graph.add_object(
                    format!("sphere-{column}-{row}"),
                    sphere,
                    Material::new(color, Vec3::ONE, 0.1),
                );

                let (s, c) = latitude.sin_cos();
                let instance = Mat4::from_rotation_z(angle.to_radians())
                    * Mat4::from_translation(Vec3::new(c, 0.0, s))
                    * Mat4::from_scale(Vec3::splat(SCALE * c));
                graph.add_child(group, ball, instance);
            }
        }
        group
    }

    #[inline]
    fn podium_transform(position: Vec3) -> Mat4 {
        Mat4::from_translation(position) * Mat4::from_scale(Vec3::new(24.0, 0.5, 24.0))
    }

    /// 移动台座，菜单中调用
    pub fn set_podium_position(&mut self, position: Vec3) {
        let central = self.central;
        let podium = self.podium;
        if let Some(child) = self.graph.child_instance_mut(central, podium) {
            *child = Self::podium_transform(position);
        }
    }

    pub fn podium_position(&self) -> Vec3 {
        self.graph
            .node(self.central)
            .children()
            .iter()
            .find(|(id, _)| *id == self.podium)
            .map(|(_, tr)| tr.w_axis.truncate())
            .unwrap_or_default()
    }
}

/// `h`, `s`, `v` 都在 [0, 1] 内
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    if s == 0.0 {
        return Vec3::splat(v);
    }
    let sector = h * 6.0;
    let i = sector as u32 % 6;
    let f = sector - sector.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::DrawItem;

    fn shapes() -> BuiltinShapes {
        BuiltinShapes {
            cube: ShapeId(0),
            teapot: ShapeId(4),
            sphere: ShapeId(1),
            sky_sphere: ShapeId(2),
            quad: ShapeId(3),
        }
    }

    fn draws(scene: &DefaultScene, root: NodeId) -> Vec<DrawItem> {
        let mut items = vec![];
        scene
            .graph
            .draw(root, Mat4::IDENTITY, &mut |item: &DrawItem| {
                items.push(*item);
                Ok(())
            })
            .unwrap();
        items
    }

    #[test]
    fn root_draws_sky_podium_and_teapot() {
        let scene = DefaultScene::build(&shapes());
        let names: Vec<_> = draws(&scene, scene.root).iter().map(|i| scene.graph.node(i.node).name.clone()).collect();
        assert_eq!(names, vec!["sky", "podium", "teapot"]);

        // shadow pass 不绘制天空球
        let shadow: Vec<_> = draws(&scene, scene.central).iter().map(|i| i.node).collect();
        assert_eq!(shadow, vec![scene.podium, scene.teapot]);
    }

    #[test]
    fn spheres_toggle_and_animation() {
        let mut scene = DefaultScene::build(&shapes());
        scene.graph.node_mut(scene.spheres).visible = true;
        assert_eq!(draws(&scene, scene.root).len(), 3 + 120);

        scene.graph.update_animation(9.0);
        let teapot = draws(&scene, scene.central).into_iter().find(|i| i.node == scene.teapot).unwrap();
        // 动画在子节点的局部空间中先作用
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.25, 0.0))
            * Mat4::from_scale(Vec3::splat(2.0))
            * Mat4::from_rotation_y(90f32.to_radians());
        assert!(teapot.model.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn spheres_form_a_tinted_hemisphere() {
        let scene = DefaultScene::build(&shapes());
        let group = scene.graph.node(scene.spheres);
        assert!(group.shape.is_none());
        assert_eq!(group.children().len(), 120);

        let balls: Vec<_> = group.children().iter().map(|(id, tr)| (scene.graph.node(*id), *tr)).collect();
        for (ball, instance) in &balls {
            assert_eq!(ball.shape, Some(ShapeId(1)));
            let (scale, _, center) = instance.to_scale_rotation_translation();
            // 球心在单位半球面上，越靠近顶部越小
            assert!((center.length() - 1.0).abs() < 1e-5);
            assert!(center.z > 0.0);
            let c = center.truncate().length();
            assert!((scale.x - 0.075 * c).abs() < 1e-5);
        }

        for (i, (a, _)) in balls.iter().enumerate() {
            for (b, _) in &balls[i + 1..] {
                assert!(!a.material.diffuse.abs_diff_eq(b.material.diffuse, 1e-3), "{} vs {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn hsv_primaries() {
        assert!(hsv_to_rgb(0.0, 1.0, 1.0).abs_diff_eq(Vec3::X, 1e-6));
        assert!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0).abs_diff_eq(Vec3::Z, 1e-5));
        assert_eq!(hsv_to_rgb(0.4, 0.0, 0.7), Vec3::splat(0.7));
    }

    #[test]
    fn podium_moves() {
        let mut scene = DefaultScene::build(&shapes());
        assert_eq!(scene.podium_position(), Vec3::new(0.0, -1.5, 0.0));
        scene.set_podium_position(Vec3::new(1.0, -2.0, 0.0));
        assert_eq!(scene.podium_position(), Vec3::new(1.0, -2.0, 0.0));
    }
}
