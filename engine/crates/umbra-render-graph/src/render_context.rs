use ash::vk;
use glam::{Mat4, Vec3};
use umbra_render_interface::{
    frame_settings::FrameLabel,
    gpu_data::{FrameConstants, LightData},
};
use umbra_scene::{
    components::mesh::MeshLibrary,
    lights::Lights,
    scene_graph::{NodeId, SceneGraph, ShapeId},
};

use crate::render_settings::RenderSettings;

/// 相机在本帧的矩阵
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub proj: Mat4,
    pub position: Vec3,
}
impl CameraMatrices {
    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

/// 场景中各个 pass 需要的节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneRoots {
    /// geometry pass 从这里开始遍历
    pub root: NodeId,
    /// shadow pass 只绘制这棵子树
    pub central: NodeId,
    /// 绘制在每个可见光源位置的标记
    pub light_marker: NodeId,
    /// 全屏 pass 绘制的 quad，覆盖整个 NDC
    pub fullscreen_quad: ShapeId,
}

/// 一帧渲染期间只读的输入
pub struct RenderContext<'a> {
    pub scene: &'a SceneGraph,
    pub roots: SceneRoots,
    pub meshes: &'a MeshLibrary,
    pub lights: &'a Lights,

    pub camera: CameraMatrices,
    pub settings: &'a RenderSettings,

    pub frame_label: FrameLabel,
    pub frame_id: u64,
    /// 当前 viewport，resize 之后立即更新
    pub extent: vk::Extent2D,
    pub bindless_set: vk::DescriptorSet,
}
impl RenderContext<'_> {
    /// 相机视角下的帧常量
    pub fn frame_constants(&self) -> FrameConstants {
        Self::constants(self.camera.view, self.camera.proj, self.camera.position, self.settings, self.lights.count())
    }

    /// 光源视角下的帧常量，shadow pass 使用
    pub fn shadow_constants(&self, light: &LightData) -> FrameConstants {
        Self::constants(light.shadow_view, light.shadow_proj, light.light_pos, self.settings, self.lights.count())
    }

    fn constants(view: Mat4, proj: Mat4, position: Vec3, settings: &RenderSettings, light_count: usize) -> FrameConstants {
        FrameConstants {
            world_view: view,
            world_inverse: view.inverse(),
            world_proj: proj,
            camera_pos: position,
            shader_mode: settings.shader_mode.as_i32(),
            moment_bias: settings.moment_bias,
            depth_bias: settings.depth_bias,
            light_count: light_count as u32,
            _padding: 0,
        }
    }
}
