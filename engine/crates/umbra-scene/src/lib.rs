//! CPU 侧的场景
//!
//! 场景图是一个 arena，节点之间通过 [`scene_graph::NodeId`] 引用；
//! 形状在构建完成后上传为 [`components::mesh::GpuMesh`]，渲染时只通过 [`scene_graph::ShapeId`] 访问。

pub mod components;
pub mod default_scene;
pub mod lights;
pub mod projection;
pub mod scene_graph;
pub mod shapes;
