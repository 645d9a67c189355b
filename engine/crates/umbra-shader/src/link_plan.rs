//! 链接决策
//!
//! 根据已经添加的 stage 决定构建 graphics 还是 compute pipeline，并把各个 stage 的反射结果合并为
//! 一个 pipeline layout 描述。这里不接触 device，可以单独测试。

use std::collections::BTreeMap;

use ash::vk;
use itertools::Itertools;
use umbra_gfx::error::{GfxError, GfxResult};

use crate::{
    compiler::ShaderStage,
    reflection::{BindingKind, ReflectedBinding, ShaderReflection},
};

/// set 0 是全局的 bindless 表
pub const BINDLESS_SET: u32 = 0;
/// set 1 是 push descriptor，每个 draw 直接写入 command buffer
pub const PUSH_DESCRIPTOR_SET: u32 = 1;
/// bindless 表中 binding 0/1/2 的种类
pub const BINDLESS_BINDINGS: [BindingKind; 3] =
    [BindingKind::SampledImage, BindingKind::StorageImage, BindingKind::Sampler];

/// 多个 color output 时使用的高精度格式
pub const HIGH_PRECISION_FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPlan {
    Compute,
    /// pixel stage 可以没有，用于只写 depth 的 pass
    Graphics { has_pixel: bool },
}
impl LinkPlan {
    fn fail(msg: &str) -> GfxError {
        GfxError::PipelineLinkFailure(msg.to_string())
    }

    /// `stages` 中不会有重复的 stage
    pub fn decide(stages: &[ShaderStage]) -> GfxResult<Self> {
        let has = |stage| stages.contains(&stage);
        match stages {
            [] => Err(Self::fail("No Shaders")),
            [ShaderStage::Compute] => Ok(Self::Compute),
            [ShaderStage::Vertex] => Ok(Self::Graphics { has_pixel: false }),
            [_] => Err(Self::fail("Missing Vertex Shader")),
            _ if !has(ShaderStage::Vertex) => Err(Self::fail("No Valid Vertex Shader")),
            _ if has(ShaderStage::Compute) => Err(Self::fail("Compute Shader Cannot Link With Graphics Stages")),
            _ => Ok(Self::Graphics {
                has_pixel: has(ShaderStage::Pixel),
            }),
        }
    }

    #[inline]
    pub fn bind_point(self) -> vk::PipelineBindPoint {
        match self {
            Self::Compute => vk::PipelineBindPoint::COMPUTE,
            Self::Graphics { .. } => vk::PipelineBindPoint::GRAPHICS,
        }
    }
}

/// 所有 stage 合并之后的 layout
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramLayout {
    /// set 1 的 binding，按 binding 排序
    pub push_descriptors: Vec<ReflectedBinding>,
    pub push_constant_size: u32,
    /// 所有 stage 的并集，push constant 对所有 stage 可见
    pub stages: vk::ShaderStageFlags,
}
impl ProgramLayout {
    pub fn merge(reflections: &[&ShaderReflection]) -> GfxResult<Self> {
        let mut push_descriptors: BTreeMap<u32, ReflectedBinding> = BTreeMap::new();
        let mut layout = Self::default();

        for reflection in reflections {
            layout.stages |= reflection.stage.vk_stage();
            layout.push_constant_size = layout.push_constant_size.max(reflection.push_constant_size);

            for binding in &reflection.bindings {
                match binding.set {
                    BINDLESS_SET => Self::check_bindless(binding)?,
                    PUSH_DESCRIPTOR_SET => Self::merge_push_descriptor(&mut push_descriptors, binding)?,
                    set => {
                        return Err(GfxError::PipelineLinkFailure(format!(
                            "`{}` uses set {set}, only set 0 and set 1 are available",
                            binding.name
                        )));
                    }
                }
            }
        }

        layout.push_descriptors = push_descriptors.into_values().collect_vec();
        Ok(layout)
    }

    fn check_bindless(binding: &ReflectedBinding) -> GfxResult<()> {
        let expected = BINDLESS_BINDINGS.get(binding.binding as usize);
        if expected != Some(&binding.kind) {
            return Err(GfxError::PipelineLinkFailure(format!(
                "`{}` at set 0 binding {} is {:?}, bindless table expects {:?}",
                binding.name, binding.binding, binding.kind, expected
            )));
        }
        Ok(())
    }

    fn merge_push_descriptor(
        merged: &mut BTreeMap<u32, ReflectedBinding>,
        binding: &ReflectedBinding,
    ) -> GfxResult<()> {
        if !matches!(binding.kind, BindingKind::UniformBuffer | BindingKind::StorageBuffer) || binding.count != 1 {
            return Err(GfxError::PipelineLinkFailure(format!(
                "`{}` at set 1 must be a single uniform or storage buffer",
                binding.name
            )));
        }

        match merged.get_mut(&binding.binding) {
            Some(existing) if existing.kind != binding.kind => Err(GfxError::PipelineLinkFailure(format!(
                "set 1 binding {} is `{}` ({:?}) in one stage and `{}` ({:?}) in another",
                binding.binding, existing.name, existing.kind, binding.name, binding.kind
            ))),
            Some(existing) => {
                existing.stages |= binding.stages;
                Ok(())
            }
            None => {
                merged.insert(binding.binding, binding.clone());
                Ok(())
            }
        }
    }

    /// set 1 的 layout bindings
    pub fn push_descriptor_bindings(&self) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
        self.push_descriptors
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(b.kind.descriptor_type())
                    .descriptor_count(1)
                    .stage_flags(b.stages)
            })
            .collect_vec()
    }

    pub fn push_constant_ranges(&self) -> Vec<vk::PushConstantRange> {
        if self.push_constant_size == 0 {
            return vec![];
        }
        vec![vk::PushConstantRange {
            stage_flags: self.stages,
            offset: 0,
            size: self.push_constant_size,
        }]
    }

    pub fn descriptor_type_of(&self, binding: u32) -> Option<vk::DescriptorType> {
        self.push_descriptors.iter().find(|b| b.binding == binding).map(|b| b.kind.descriptor_type())
    }
}

/// color attachment 的格式
///
/// 多于一个输出时假定为高精度 float，恰好一个时使用呈现格式；显式指定的格式优先，
/// 并且可以声明超出反射数量的 attachment
pub fn infer_color_formats(
    output_count: usize,
    overrides: &BTreeMap<usize, vk::Format>,
    present_format: vk::Format,
) -> Vec<vk::Format> {
    let inferred = if output_count > 1 { HIGH_PRECISION_FORMAT } else { present_format };
    let count = overrides.keys().next_back().map_or(output_count, |max| output_count.max(max + 1));
    (0..count).map(|i| overrides.get(&i).copied().unwrap_or(inferred)).collect_vec()
}

/// compute dispatch 的 group 数量，向上取整
pub fn dispatch_groups(extent: [u32; 3], workgroup_size: [u32; 3]) -> [u32; 3] {
    std::array::from_fn(|i| extent[i].div_ceil(workgroup_size[i].max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_error(stages: &[ShaderStage]) -> String {
        match LinkPlan::decide(stages) {
            Err(GfxError::PipelineLinkFailure(msg)) => msg,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_stages_fail_link() {
        assert_eq!(link_error(&[]), "No Shaders");
        assert_eq!(link_error(&[ShaderStage::Pixel]), "Missing Vertex Shader");
        assert_eq!(link_error(&[ShaderStage::Pixel, ShaderStage::Compute]), "No Valid Vertex Shader");
        assert_eq!(
            link_error(&[ShaderStage::Vertex, ShaderStage::Compute]),
            "Compute Shader Cannot Link With Graphics Stages"
        );
    }

    #[test]
    fn plans_for_valid_stage_sets() {
        assert_eq!(LinkPlan::decide(&[ShaderStage::Compute]).unwrap(), LinkPlan::Compute);
        assert_eq!(
            LinkPlan::decide(&[ShaderStage::Vertex]).unwrap(),
            LinkPlan::Graphics { has_pixel: false }
        );
        let plan = LinkPlan::decide(&[ShaderStage::Vertex, ShaderStage::Pixel]).unwrap();
        assert_eq!(plan, LinkPlan::Graphics { has_pixel: true });
        assert_eq!(plan.bind_point(), vk::PipelineBindPoint::GRAPHICS);
    }

    fn binding(set: u32, binding: u32, kind: BindingKind, stage: ShaderStage) -> ReflectedBinding {
        ReflectedBinding {
            name: format!("res_{set}_{binding}"),
            set,
            binding,
            kind,
            count: 1,
            stages: stage.vk_stage(),
        }
    }

    fn reflection(stage: ShaderStage, bindings: Vec<ReflectedBinding>, push: u32) -> ShaderReflection {
        ShaderReflection {
            stage,
            entry_point: "main".to_string(),
            output_count: 0,
            bindings,
            push_constant_size: push,
            workgroup_size: [1, 1, 1],
        }
    }

    #[test]
    fn stages_merge_into_one_layout() {
        let vs = reflection(
            ShaderStage::Vertex,
            vec![
                binding(1, 0, BindingKind::UniformBuffer, ShaderStage::Vertex),
                binding(1, 1, BindingKind::UniformBuffer, ShaderStage::Vertex),
            ],
            0,
        );
        let ps = reflection(
            ShaderStage::Pixel,
            vec![
                binding(0, 0, BindingKind::SampledImage, ShaderStage::Pixel),
                binding(1, 1, BindingKind::UniformBuffer, ShaderStage::Pixel),
                binding(1, 2, BindingKind::StorageBuffer, ShaderStage::Pixel),
            ],
            32,
        );

        let layout = ProgramLayout::merge(&[&vs, &ps]).unwrap();
        assert_eq!(layout.push_descriptors.len(), 3);
        assert_eq!(layout.push_descriptors[0].stages, vk::ShaderStageFlags::VERTEX);
        assert_eq!(
            layout.push_descriptors[1].stages,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
        );
        assert_eq!(layout.descriptor_type_of(2), Some(vk::DescriptorType::STORAGE_BUFFER));
        assert_eq!(layout.descriptor_type_of(5), None);

        let ranges = layout.push_constant_ranges();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].size, 32);
        assert_eq!(ranges[0].stage_flags, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn mismatched_bindings_are_link_failures() {
        let wrong_bindless = reflection(
            ShaderStage::Compute,
            vec![binding(0, 0, BindingKind::StorageImage, ShaderStage::Compute)],
            8,
        );
        assert!(matches!(ProgramLayout::merge(&[&wrong_bindless]), Err(GfxError::PipelineLinkFailure(_))));

        let vs = reflection(ShaderStage::Vertex, vec![binding(1, 0, BindingKind::UniformBuffer, ShaderStage::Vertex)], 0);
        let ps = reflection(ShaderStage::Pixel, vec![binding(1, 0, BindingKind::StorageBuffer, ShaderStage::Pixel)], 0);
        assert!(ProgramLayout::merge(&[&vs, &ps]).is_err());

        let set2 = reflection(ShaderStage::Vertex, vec![binding(2, 0, BindingKind::UniformBuffer, ShaderStage::Vertex)], 0);
        assert!(ProgramLayout::merge(&[&set2]).is_err());
    }

    #[test]
    fn color_formats_follow_output_count() {
        let present = vk::Format::B8G8R8A8_UNORM;
        let none = BTreeMap::new();
        assert_eq!(infer_color_formats(4, &none, present), vec![HIGH_PRECISION_FORMAT; 4]);
        assert_eq!(infer_color_formats(1, &none, present), vec![present]);
        assert!(infer_color_formats(0, &none, present).is_empty());

        let shadow = BTreeMap::from([(0, vk::Format::R16G16B16A16_UNORM)]);
        assert_eq!(infer_color_formats(1, &shadow, present), vec![vk::Format::R16G16B16A16_UNORM]);
        // 显式声明的 attachment 即使 shader 没有输出也保留
        assert_eq!(infer_color_formats(0, &shadow, present), vec![vk::Format::R16G16B16A16_UNORM]);
    }

    #[test]
    fn dispatch_rounds_up() {
        assert_eq!(dispatch_groups([1024, 1024, 1], [16, 16, 1]), [64, 64, 1]);
        assert_eq!(dispatch_groups([1024, 1024, 1], [128, 1, 1]), [8, 1024, 1]);
        assert_eq!(dispatch_groups([1920, 1080, 1], [16, 16, 1]), [120, 68, 1]);
    }
}
