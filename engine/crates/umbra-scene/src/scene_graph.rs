//! arena 形式的场景图
//!
//! 节点存放在一个 `Vec` 中，通过 [`NodeId`] 引用；子节点列表中保存 (子节点, 实例变换)。
//! 同一个节点可以作为多个父节点的子节点出现，即实例化。
//!
//! 遍历规则：
//! - 节点自身的形状使用父节点传下来的变换绘制
//! - 子节点的变换为 `parent * instance * anim`，即节点的动画变换只作用于它的子节点
//! - `visible == false` 的节点自身和整个子树都不绘制

use glam::Mat4;
use umbra_gfx::error::GfxResult;

use crate::components::material::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// 已上传网格的句柄，参见 [`crate::components::mesh::MeshLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub usize);

pub struct SceneNode {
    pub name: String,
    /// 分组节点没有形状
    pub shape: Option<ShapeId>,
    pub anim_transform: Mat4,
    pub material: Material,
    /// bindless 表中的纹理 index
    pub texture: Option<u32>,
    pub visible: bool,
    children: Vec<(NodeId, Mat4)>,
}
impl SceneNode {
    #[inline]
    pub fn children(&self) -> &[(NodeId, Mat4)] {
        &self.children
    }
}

/// 一次绘制提交
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub shape: ShapeId,
    pub model: Mat4,
    pub material: Material,
    pub texture: Option<u32>,
}

/// 接收遍历产生的绘制
pub trait DrawSink {
    fn draw(&mut self, item: &DrawItem) -> GfxResult<()>;
}
impl<F> DrawSink for F
where
    F: FnMut(&DrawItem) -> GfxResult<()>,
{
    #[inline]
    fn draw(&mut self, item: &DrawItem) -> GfxResult<()> {
        self(item)
    }
}

#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    /// 每帧更新 `anim_transform` 的节点
    animated: Vec<NodeId>,
}
// 构建
impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分组节点
    pub fn add_group(&mut self, name: impl Into<String>) -> NodeId {
        self.push(name.into(), None, Material::BLACK)
    }

    pub fn add_object(&mut self, name: impl Into<String>, shape: ShapeId, material: Material) -> NodeId {
        self.push(name.into(), Some(shape), material)
    }

    fn push(&mut self, name: String, shape: Option<ShapeId>, material: Material) -> NodeId {
        self.nodes.push(SceneNode {
            name,
            shape,
            anim_transform: Mat4::IDENTITY,
            material,
            texture: None,
            visible: true,
            children: vec![],
        });
        NodeId(self.nodes.len() - 1)
    }

    /// 子节点不能是父节点的祖先
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, instance: Mat4) {
        debug_assert!(!self.reaches(child, parent), "adding {:?} under {:?} creates a cycle", child, parent);
        self.nodes[parent.0].children.push((child, instance));
    }

    /// `parent` 下第一个 `child` 实例的变换
    pub fn child_instance_mut(&mut self, parent: NodeId, child: NodeId) -> Option<&mut Mat4> {
        self.nodes[parent.0].children.iter_mut().find(|(id, _)| *id == child).map(|(_, tr)| tr)
    }

    pub fn set_animated(&mut self, node: NodeId) {
        if !self.animated.contains(&node) {
            self.animated.push(node);
        }
    }

    /// `from` 的子树中是否包含 `to`
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            stack.extend(self.nodes[id.0].children.iter().map(|(c, _)| *c));
        }
        false
    }
}
// 每帧
impl SceneGraph {
    /// 所有动画节点绕 Y 轴匀速旋转，每秒 10 度
    pub fn update_animation(&mut self, time_secs: f32) {
        let angle = (360.0 * time_secs / 36.0).to_radians();
        for id in &self.animated {
            self.nodes[id.0].anim_transform = Mat4::from_rotation_y(angle);
        }
    }

    /// 深度优先遍历 `root` 的子树，返回提交的绘制数量
    pub fn draw(&self, root: NodeId, parent_transform: Mat4, sink: &mut impl DrawSink) -> GfxResult<u32> {
        let node = &self.nodes[root.0];
        if !node.visible {
            return Ok(0);
        }

        let mut count = 0;
        if let Some(shape) = node.shape {
            sink.draw(&DrawItem {
                node: root,
                shape,
                model: parent_transform,
                material: node.material,
                texture: node.texture,
            })?;
            count += 1;
        }

        for (child, instance) in &node.children {
            count += self.draw(*child, parent_transform * *instance * node.anim_transform, sink)?;
        }
        Ok(count)
    }
}
// getters
impl SceneGraph {
    #[inline]
    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn record(graph: &SceneGraph, root: NodeId, transform: Mat4) -> Vec<DrawItem> {
        let mut items = vec![];
        let count = graph
            .draw(root, transform, &mut |item: &DrawItem| {
                items.push(*item);
                Ok(())
            })
            .unwrap();
        assert_eq!(count as usize, items.len());
        items
    }

    /// root -> group -> (a, b)，b 下面还有 c
    fn small_graph() -> (SceneGraph, [NodeId; 5]) {
        let mut g = SceneGraph::new();
        let root = g.add_group("root");
        let group = g.add_group("group");
        let a = g.add_object("a", ShapeId(0), Material::default());
        let b = g.add_object("b", ShapeId(1), Material::default());
        let c = g.add_object("c", ShapeId(2), Material::default());
        g.add_child(root, group, Mat4::IDENTITY);
        g.add_child(group, a, Mat4::IDENTITY);
        g.add_child(group, b, Mat4::IDENTITY);
        g.add_child(b, c, Mat4::IDENTITY);
        (g, [root, group, a, b, c])
    }

    #[test]
    fn hidden_root_draws_nothing() {
        let (mut g, [root, _, a, b, c]) = small_graph();
        assert_eq!(record(&g, root, Mat4::IDENTITY).len(), 3);

        g.node_mut(root).visible = false;
        // 子节点自己的可见性不影响结果
        for id in [a, b, c] {
            g.node_mut(id).visible = true;
        }
        assert!(record(&g, root, Mat4::IDENTITY).is_empty());
    }

    #[test]
    fn hidden_node_hides_its_subtree_only() {
        let (mut g, [root, _, a, b, _]) = small_graph();
        g.node_mut(b).visible = false;
        let items = record(&g, root, Mat4::IDENTITY);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node, a);
    }

    #[test]
    fn transforms_compose_parent_instance_anim() {
        let mut g = SceneGraph::new();
        let parent = g.add_object("parent", ShapeId(0), Material::default());
        let child = g.add_object("child", ShapeId(1), Material::default());
        let instance = Mat4::from_translation(Vec3::new(0.0, 0.25, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
        g.add_child(parent, child, instance);
        g.node_mut(parent).anim_transform = Mat4::from_rotation_y(1.0);

        let outer = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let items = record(&g, parent, outer);

        // 节点自身不受自己的动画影响
        assert_eq!(items[0].model, outer);
        assert!(items[1].model.abs_diff_eq(outer * instance * Mat4::from_rotation_y(1.0), 1e-6));
    }

    #[test]
    fn instancing_draws_shared_child_twice() {
        let mut g = SceneGraph::new();
        let root = g.add_group("root");
        let ball = g.add_object("ball", ShapeId(3), Material::default());
        g.add_child(root, ball, Mat4::from_translation(Vec3::X));
        g.add_child(root, ball, Mat4::from_translation(Vec3::NEG_X));

        let items = record(&g, root, Mat4::IDENTITY);
        let xs: Vec<f32> = items.iter().map(|i| i.model.w_axis.x).collect();
        assert_eq!(xs, vec![1.0, -1.0]);
    }

    #[test]
    fn animation_rotates_ten_degrees_per_second() {
        let (mut g, [_, group, ..]) = small_graph();
        g.set_animated(group);
        g.set_animated(group);
        g.update_animation(9.0);
        let expected = Mat4::from_rotation_y(90f32.to_radians());
        assert!(g.node(group).anim_transform.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn sink_errors_stop_traversal() {
        let (g, [root, ..]) = small_graph();
        let mut seen = 0;
        let result = g.draw(root, Mat4::IDENTITY, &mut |_: &DrawItem| {
            seen += 1;
            Err(umbra_gfx::error::GfxError::creation("transient", "full"))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }
}
