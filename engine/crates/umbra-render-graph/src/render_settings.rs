//! 菜单中可以调整的渲染参数

use std::ops::RangeInclusive;

use umbra_crate_tools::config::UmbraConfig;
use umbra_render_interface::gpu_data::{AoParams, BLUR_MAX_WIDTH};

use crate::blur_kernel::BlurKernel;

/// lighting pass 输出的内容，用于调试 G-buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderMode {
    #[default]
    Default,
    WorldPosition,
    Normal,
    Diffuse,
    Specular,
    AoMap,
}
impl ShaderMode {
    pub const ALL: [ShaderMode; 6] = [
        Self::Default,
        Self::WorldPosition,
        Self::Normal,
        Self::Diffuse,
        Self::Specular,
        Self::AoMap,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::WorldPosition => "WorldPosition",
            Self::Normal => "Normal",
            Self::Diffuse => "Diffuse",
            Self::Specular => "Specular",
            Self::AoMap => "AOMap",
        }
    }

    /// shader 中 `shader_mode` 的取值
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// 环境光遮蔽的采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoSettings {
    pub enabled: bool,
    /// 采样半径 R
    pub radius: f32,
    /// 采样数 n
    pub samples: i32,
    /// 强度 s
    pub scale: f32,
    /// 对比度 k
    pub contrast: f32,
}
impl Default for AoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 1.0,
            samples: 10,
            scale: 0.5,
            contrast: 1.0,
        }
    }
}
impl AoSettings {
    pub const RADIUS_RANGE: RangeInclusive<f32> = 0.1..=10.0;
    pub const SAMPLES_RANGE: RangeInclusive<i32> = 10..=20;
    pub const SCALE_RANGE: RangeInclusive<f32> = 0.01..=1.0;
    pub const CONTRAST_RANGE: RangeInclusive<f32> = 0.0..=100.0;

    /// AO 的模糊宽度固定
    pub const BLUR_WIDTH: usize = 32;

    pub fn clamp(&mut self) {
        self.radius = self.radius.clamp(*Self::RADIUS_RANGE.start(), *Self::RADIUS_RANGE.end());
        self.samples = self.samples.clamp(*Self::SAMPLES_RANGE.start(), *Self::SAMPLES_RANGE.end());
        self.scale = self.scale.clamp(*Self::SCALE_RANGE.start(), *Self::SCALE_RANGE.end());
        self.contrast = self.contrast.clamp(*Self::CONTRAST_RANGE.start(), *Self::CONTRAST_RANGE.end());
    }

    pub fn to_gpu(&self, kernel: &BlurKernel) -> AoParams {
        let blur = kernel.params();
        AoParams {
            weights: blur.weights,
            width: blur.width,
            r: self.radius,
            n: self.samples,
            s: self.scale,
            k: self.contrast,
            _padding: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub shader_mode: ShaderMode,
    pub moment_bias: f32,
    pub depth_bias: f32,
    /// shadow map 的模糊宽度，[0, BLUR_MAX_WIDTH]
    pub shadow_blur_width: usize,
    pub ao: AoSettings,
}
impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shader_mode: ShaderMode::Default,
            moment_bias: 0.003,
            depth_bias: 0.005,
            shadow_blur_width: 4,
            ao: AoSettings::default(),
        }
    }
}
impl RenderSettings {
    pub fn from_config(config: &UmbraConfig) -> Self {
        let mut settings = Self {
            shadow_blur_width: config.render.shadow_blur_width as usize,
            ao: AoSettings {
                enabled: config.render.ao_enabled,
                ..Default::default()
            },
            ..Default::default()
        };
        settings.clamp();
        settings
    }

    /// 菜单修改之后调用
    pub fn clamp(&mut self) {
        self.shadow_blur_width = self.shadow_blur_width.min(BLUR_MAX_WIDTH);
        self.ao.clamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_modes_are_indexed_in_menu_order() {
        for (i, mode) in ShaderMode::ALL.iter().enumerate() {
            assert_eq!(mode.as_i32(), i as i32);
        }
        assert_eq!(ShaderMode::AoMap.name(), "AOMap");
    }

    #[test]
    fn config_overrides_blur_and_ao() {
        let mut config = UmbraConfig::default();
        config.render.shadow_blur_width = 200;
        config.render.ao_enabled = true;

        let settings = RenderSettings::from_config(&config);
        assert_eq!(settings.shadow_blur_width, BLUR_MAX_WIDTH);
        assert!(settings.ao.enabled);
        assert_eq!(settings.moment_bias, 0.003);
        assert_eq!(settings.depth_bias, 0.005);
    }

    #[test]
    fn ao_parameters_stay_in_range() {
        let mut ao = AoSettings {
            enabled: true,
            radius: 0.0,
            samples: 64,
            scale: 2.0,
            contrast: -1.0,
        };
        ao.clamp();
        assert_eq!((ao.radius, ao.samples, ao.scale, ao.contrast), (0.1, 20, 1.0, 0.0));

        let gpu = ao.to_gpu(&BlurKernel::new(AoSettings::BLUR_WIDTH));
        assert_eq!(gpu.width, 32);
        assert_eq!(gpu.n, 20);
        assert!((gpu.weights.iter().map(|v| v.x + v.y + v.z + v.w).sum::<f32>() - 1.0).abs() < 1e-5);
    }
}
