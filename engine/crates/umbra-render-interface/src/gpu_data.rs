//! 和 shader 共享的数据布局
//!
//! 所有结构体都是 `#[repr(C)]` + `Pod`，字段顺序和填充与 HLSL 中的 cbuffer / StructuredBuffer 一致。

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// 模糊核的最大半径
pub const BLUR_MAX_WIDTH: usize = 50;
/// 2 * WIDTH + 1 个权重，每 4 个打包进一个 vec4
pub const BLUR_WEIGHT_VEC4_COUNT: usize = (2 * BLUR_MAX_WIDTH + 1).div_ceil(4);

/// 每个 draw 的常量
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectData {
    pub model: Mat4,
    /// model 的逆转置
    pub normal: Mat4,
    pub diffuse: Vec3,
    /// 非 0 表示采样 `texture_index`
    pub textured: u32,
    pub specular: Vec3,
    pub roughness: f32,
    pub texture_index: u32,
    pub _padding: [u32; 3],
}
impl ObjectData {
    pub fn new(model: Mat4, diffuse: Vec3, specular: Vec3, roughness: f32, texture_index: Option<u32>) -> Self {
        Self {
            model,
            normal: model.inverse().transpose(),
            diffuse,
            textured: texture_index.is_some() as u32,
            specular,
            roughness,
            texture_index: texture_index.unwrap_or_default(),
            _padding: [0; 3],
        }
    }
}

/// 帧常量：相机矩阵以及调试模式
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameConstants {
    pub world_view: Mat4,
    pub world_inverse: Mat4,
    pub world_proj: Mat4,
    pub camera_pos: Vec3,
    /// 参见 `ShaderMode`
    pub shader_mode: i32,
    pub moment_bias: f32,
    pub depth_bias: f32,
    pub light_count: u32,
    pub _padding: u32,
}

/// 光源，第 0 个是投射阴影的光源
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightData {
    pub shadow_view: Mat4,
    pub shadow_proj: Mat4,
    pub light_pos: Vec3,
    pub shadow_min: f32,
    pub light_color: Vec3,
    pub shadow_max: f32,
    pub use_shadows: i32,
    pub range: f32,
    pub _padding: [f32; 2],
}
impl LightData {
    /// 不投射阴影的点光源
    pub fn point(pos: Vec3, color: Vec3, range: f32) -> Self {
        Self {
            shadow_view: Mat4::IDENTITY,
            shadow_proj: Mat4::IDENTITY,
            light_pos: pos,
            shadow_min: 0.0,
            light_color: color,
            shadow_max: 0.0,
            use_shadows: 0,
            range,
            _padding: [0.0; 2],
        }
    }
}

/// 按 vec4 打包的模糊权重
pub fn pack_weights(weights: &[f32]) -> [Vec4; BLUR_WEIGHT_VEC4_COUNT] {
    debug_assert!(weights.len() <= 4 * BLUR_WEIGHT_VEC4_COUNT);
    let mut packed = [Vec4::ZERO; BLUR_WEIGHT_VEC4_COUNT];
    for (i, w) in weights.iter().enumerate() {
        packed[i / 4][i % 4] = *w;
    }
    packed
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BlurParams {
    pub weights: [Vec4; BLUR_WEIGHT_VEC4_COUNT],
    pub width: i32,
    pub _padding: [i32; 3],
}
impl BlurParams {
    pub fn new(weights: &[f32], width: usize) -> Self {
        Self {
            weights: pack_weights(weights),
            width: width as i32,
            _padding: [0; 3],
        }
    }
}

/// AO 的采样参数以及模糊权重
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct AoParams {
    pub weights: [Vec4; BLUR_WEIGHT_VEC4_COUNT],
    pub width: i32,
    /// 采样半径
    pub r: f32,
    /// 采样数
    pub n: i32,
    pub s: f32,
    pub k: f32,
    pub _padding: [f32; 3],
}

/// compute pass 的 push constants：输入输出在 bindless 表中的 index
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ComputePushConstants {
    pub src: u32,
    pub dst: u32,
}

/// AO 模糊的 push constants：除了输入输出，还需要 G-buffer 判断边缘
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct AoBlurConstants {
    pub src: u32,
    pub dst: u32,
    pub position: u32,
    pub normal: u32,
}

/// 全屏 pass 读取 G-buffer 用的 push constants
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct GBufferIndices {
    pub position: u32,
    pub normal: u32,
    pub diffuse: u32,
    pub specular: u32,
    pub shadow: u32,
    pub ao: u32,
    pub ao_enabled: u32,
    pub _padding: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_are_16_byte_multiples() {
        assert_eq!(size_of::<ObjectData>(), 176);
        assert_eq!(size_of::<FrameConstants>(), 224);
        assert_eq!(size_of::<LightData>(), 176);
        assert_eq!(size_of::<BlurParams>(), 432);
        assert_eq!(size_of::<AoParams>(), 448);
        assert_eq!(size_of::<ComputePushConstants>(), 8);
        assert_eq!(size_of::<AoBlurConstants>(), 16);
        assert_eq!(size_of::<GBufferIndices>(), 32);
    }

    #[test]
    fn weights_pack_four_per_vec4() {
        let weights: Vec<f32> = (0..101).map(|i| i as f32).collect();
        let packed = pack_weights(&weights);
        assert_eq!(BLUR_WEIGHT_VEC4_COUNT, 26);
        assert_eq!(packed[0], Vec4::new(0.0, 1.0, 2.0, 3.0));
        assert_eq!(packed[25], Vec4::new(100.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn normal_matrix_is_inverse_transpose() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let data = ObjectData::new(model, Vec3::ONE, Vec3::ZERO, 0.5, None);
        assert_eq!(data.textured, 0);
        assert!(data.normal.abs_diff_eq(Mat4::from_scale(Vec3::new(0.5, 1.0, 1.0)), 1e-6));

        let textured = ObjectData::new(model, Vec3::ONE, Vec3::ZERO, 0.5, Some(7));
        assert_eq!((textured.textured, textured.texture_index), (1, 7));
    }
}
