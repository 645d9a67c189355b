//! 从编译好的 SPIR-V 中反射出 pipeline 需要的信息
//!
//! binding layout 不手写，而是直接从 shader 的产物中推导，这样 binding 总是和 shader 源码一致。

use std::path::Path;

use ash::vk;
use umbra_gfx::error::{GfxError, GfxResult};

use crate::compiler::ShaderStage;

/// descriptor 的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    SampledImage,
    StorageImage,
    Sampler,
    UniformBuffer,
    StorageBuffer,
}
impl BindingKind {
    pub fn descriptor_type(self) -> vk::DescriptorType {
        match self {
            Self::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
            Self::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
            Self::Sampler => vk::DescriptorType::SAMPLER,
            Self::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            Self::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        }
    }
}

/// shader 中声明的一个资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub kind: BindingKind,
    /// 0 表示运行时长度的数组
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

/// 单个 stage 的反射结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    pub stage: ShaderStage,
    pub entry_point: String,
    /// pixel shader 的 color output 数量
    pub output_count: usize,
    pub bindings: Vec<ReflectedBinding>,
    /// 0 表示没有 push constant
    pub push_constant_size: u32,
    pub workgroup_size: [u32; 3],
}
impl ShaderReflection {
    /// 解析 dxc 的产物；解析失败同样视为编译失败
    pub fn from_spirv(spirv: &[u8], entry_point: &str, file: &Path) -> GfxResult<Self> {
        let _span = tracy_client::span!("ShaderReflection::from_spirv");

        let options = naga::front::spv::Options {
            adjust_coordinate_space: false,
            // dxc 会声明一些 naga 不关心的 capability
            strict_capabilities: false,
            ..Default::default()
        };
        let reflection_error = |diagnostics: String| GfxError::ShaderCompileFailure {
            file: file.to_path_buf(),
            diagnostics: format!("reflection: {diagnostics}"),
        };
        let spirv = strip_extensions(spirv).map_err(reflection_error)?;
        let module =
            naga::front::spv::parse_u8_slice(&spirv, &options).map_err(|e| reflection_error(e.to_string()))?;

        Self::from_module(&module, entry_point).map_err(|diagnostics| GfxError::ShaderCompileFailure {
            file: file.to_path_buf(),
            diagnostics,
        })
    }

    /// dxc 的产物中只有一个入口，module 中的全局资源都归属于这个入口
    pub fn from_module(module: &naga::Module, entry_point: &str) -> Result<Self, String> {
        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == entry_point)
            .ok_or_else(|| format!("entry point `{entry_point}` not found"))?;

        let stage = match entry.stage {
            naga::ShaderStage::Vertex => ShaderStage::Vertex,
            naga::ShaderStage::Fragment => ShaderStage::Pixel,
            naga::ShaderStage::Compute => ShaderStage::Compute,
        };

        let output_count = match stage {
            ShaderStage::Pixel => count_color_outputs(module, entry),
            _ => 0,
        };

        let mut bindings = vec![];
        let mut push_constant_size = 0;
        for (_, global) in module.global_variables.iter() {
            let name = global.name.clone().unwrap_or_default();
            let kind = match global.space {
                naga::AddressSpace::Uniform => BindingKind::UniformBuffer,
                naga::AddressSpace::Storage { .. } => BindingKind::StorageBuffer,
                naga::AddressSpace::Handle => handle_kind(module, global.ty)?,
                naga::AddressSpace::PushConstant => {
                    push_constant_size = push_constant_size.max(module.types[global.ty].inner.size(module.to_ctx()));
                    continue;
                }
                _ => continue,
            };
            let Some(res_binding) = &global.binding else {
                return Err(format!("resource `{name}` has no binding"));
            };

            bindings.push(ReflectedBinding {
                count: array_count(module, global.ty),
                name,
                set: res_binding.group,
                binding: res_binding.binding,
                kind,
                stages: stage.vk_stage(),
            });
        }
        bindings.sort_by_key(|b| (b.set, b.binding));

        Ok(Self {
            stage,
            entry_point: entry_point.to_string(),
            output_count,
            bindings,
            push_constant_size,
            workgroup_size: entry.workgroup_size,
        })
    }
}

const SPIRV_MAGIC: u32 = 0x0723_0203;
const SPIRV_HEADER_WORDS: usize = 5;
const OP_EXTENSION: u32 = 10;

/// 去掉所有 `OpExtension`
///
/// naga 只认识少数几个 extension，遇到其他的（例如 bindless 数组带来的
/// `SPV_EXT_descriptor_indexing`）直接报错；反射只关心类型和 binding，不依赖 extension。
fn strip_extensions(spirv: &[u8]) -> Result<Vec<u8>, String> {
    if spirv.len() % 4 != 0 {
        return Err(format!("SPIR-V size {} is not a multiple of 4", spirv.len()));
    }
    let words: Vec<u32> = spirv.chunks_exact(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect();
    if words.len() < SPIRV_HEADER_WORDS || words[0] != SPIRV_MAGIC {
        return Err("not a little-endian SPIR-V module".to_string());
    }

    let mut stripped = words[..SPIRV_HEADER_WORDS].to_vec();
    let mut cursor = SPIRV_HEADER_WORDS;
    while cursor < words.len() {
        let word_count = (words[cursor] >> 16) as usize;
        if word_count == 0 || cursor + word_count > words.len() {
            return Err(format!("malformed instruction at word {cursor}"));
        }
        if words[cursor] & 0xffff != OP_EXTENSION {
            stripped.extend_from_slice(&words[cursor..cursor + word_count]);
        }
        cursor += word_count;
    }
    Ok(stripped.iter().flat_map(|w| w.to_le_bytes()).collect())
}

/// 带 location 的输出数量；返回值可能是单个值，也可能是结构体
fn count_color_outputs(module: &naga::Module, entry: &naga::EntryPoint) -> usize {
    let Some(result) = &entry.function.result else {
        return 0;
    };
    let is_location = |binding: &Option<naga::Binding>| matches!(binding, Some(naga::Binding::Location { .. }));

    match &module.types[result.ty].inner {
        naga::TypeInner::Struct { members, .. } => members.iter().filter(|m| is_location(&m.binding)).count(),
        _ => usize::from(is_location(&result.binding)),
    }
}

fn handle_kind(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Result<BindingKind, String> {
    match &module.types[ty].inner {
        naga::TypeInner::BindingArray { base, .. } => handle_kind(module, *base),
        naga::TypeInner::Image { class, .. } => Ok(match class {
            naga::ImageClass::Storage { .. } => BindingKind::StorageImage,
            _ => BindingKind::SampledImage,
        }),
        naga::TypeInner::Sampler { .. } => Ok(BindingKind::Sampler),
        other => Err(format!("unsupported resource type {other:?}")),
    }
}

fn array_count(module: &naga::Module, ty: naga::Handle<naga::Type>) -> u32 {
    match &module.types[ty].inner {
        naga::TypeInner::BindingArray { size, .. } => match size {
            naga::ArraySize::Constant(n) => n.get(),
            _ => 0,
        },
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflect(wgsl: &str, entry: &str) -> ShaderReflection {
        let module = naga::front::wgsl::parse_str(wgsl).expect("wgsl parse");
        ShaderReflection::from_module(&module, entry).unwrap()
    }

    const GBUFFER_PS: &str = r#"
        struct FrameConstants { world_view: mat4x4<f32> }
        struct ObjectData { model: mat4x4<f32> }
        @group(0) @binding(0) var textures: binding_array<texture_2d<f32>>;
        @group(0) @binding(2) var samplers: binding_array<sampler, 3>;
        @group(1) @binding(0) var<uniform> frame: FrameConstants;
        @group(1) @binding(1) var<uniform> object: ObjectData;

        struct GBuffer {
            @location(0) position: vec4<f32>,
            @location(1) normal: vec4<f32>,
            @location(2) diffuse: vec4<f32>,
            @location(3) specular: vec4<f32>,
        }

        @fragment
        fn main(@builtin(position) pos: vec4<f32>) -> GBuffer {
            var out: GBuffer;
            out.position = frame.world_view * pos;
            out.normal = object.model * pos;
            out.diffuse = textureSample(textures[0], samplers[0], vec2<f32>(0.0));
            out.specular = vec4<f32>(1.0);
            return out;
        }
    "#;

    #[test]
    fn gbuffer_pixel_shader_has_four_outputs() {
        let r = reflect(GBUFFER_PS, "main");
        assert_eq!(r.stage, ShaderStage::Pixel);
        assert_eq!(r.output_count, 4);

        let layout: Vec<_> = r.bindings.iter().map(|b| (b.set, b.binding, b.kind, b.count)).collect();
        assert_eq!(
            layout,
            vec![
                (0, 0, BindingKind::SampledImage, 0),
                (0, 2, BindingKind::Sampler, 3),
                (1, 0, BindingKind::UniformBuffer, 1),
                (1, 1, BindingKind::UniformBuffer, 1),
            ]
        );
        assert!(r.bindings.iter().all(|b| b.stages == vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn single_output_and_push_constants() {
        let r = reflect(
            r#"
            struct Indices { position: u32, normal: u32 }
            struct Light { pos: vec4<f32> }
            var<push_constant> indices: Indices;
            @group(1) @binding(1) var<storage, read> lights: array<Light>;

            @fragment
            fn lighting() -> @location(0) vec4<f32> {
                return lights[indices.position].pos;
            }
            "#,
            "lighting",
        );
        assert_eq!(r.output_count, 1);
        assert_eq!(r.push_constant_size, 8);
        assert_eq!(r.bindings.len(), 1);
        assert_eq!(r.bindings[0].kind, BindingKind::StorageBuffer);
    }

    #[test]
    fn compute_workgroup_and_storage_images() {
        let r = reflect(
            r#"
            struct Params { src: u32, dst: u32 }
            var<push_constant> params: Params;
            @group(0) @binding(1) var images: binding_array<texture_storage_2d<r32float, write> >;

            @compute @workgroup_size(128, 1, 1)
            fn blur(@builtin(global_invocation_id) id: vec3<u32>) {
                textureStore(images[params.dst], vec2<i32>(id.xy), vec4<f32>(1.0));
            }
            "#,
            "blur",
        );
        assert_eq!(r.stage, ShaderStage::Compute);
        assert_eq!(r.workgroup_size, [128, 1, 1]);
        assert_eq!(r.output_count, 0);
        assert_eq!(r.bindings[0].kind, BindingKind::StorageImage);
        assert_eq!(r.bindings[0].stages, vk::ShaderStageFlags::COMPUTE);
    }

    #[test]
    fn unknown_entry_point_is_reported() {
        let module = naga::front::wgsl::parse_str(GBUFFER_PS).unwrap();
        let err = ShaderReflection::from_module(&module, "PSMain").unwrap_err();
        assert!(err.contains("PSMain"));
    }

    fn inst(op: u32, operands: &[u32]) -> Vec<u32> {
        let mut words = vec![((operands.len() as u32 + 1) << 16) | op];
        words.extend_from_slice(operands);
        words
    }

    fn string_words(s: &str) -> Vec<u32> {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        bytes.resize(bytes.len().next_multiple_of(4), 0);
        bytes.chunks_exact(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
    }

    /// 与 dxc 对 `Texture2D textures[] : register(t0, space0)` 的输出结构相同的 compute shader
    fn bindless_compute_words() -> Vec<u32> {
        let mut words = vec![SPIRV_MAGIC, 0x0001_0300, 0, 10, 0];
        words.extend(inst(17, &[1])); // Shader
        words.extend(inst(17, &[5302])); // RuntimeDescriptorArray
        words.extend(inst(OP_EXTENSION, &string_words("SPV_EXT_descriptor_indexing")));
        words.extend(inst(14, &[0, 1]));
        words.extend(inst(15, &[&[5, 8][..], &string_words("main")[..]].concat()));
        words.extend(inst(16, &[8, 17, 8, 8, 1]));
        words.extend(inst(71, &[7, 34, 0]));
        words.extend(inst(71, &[7, 33, 0]));
        words.extend(inst(19, &[1]));
        words.extend(inst(33, &[2, 1]));
        words.extend(inst(22, &[3, 32]));
        words.extend(inst(25, &[4, 3, 1, 0, 0, 0, 1, 0]));
        words.extend(inst(29, &[5, 4]));
        words.extend(inst(32, &[6, 0, 5]));
        words.extend(inst(59, &[6, 7, 0]));
        words.extend(inst(54, &[1, 8, 0, 2]));
        words.extend(inst(248, &[9]));
        words.extend(inst(253, &[]));
        words.extend(inst(56, &[]));
        words
    }

    fn to_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn bindless_texture_array_reflects_through_extensions() {
        let spirv = to_bytes(&bindless_compute_words());

        let options = naga::front::spv::Options {
            adjust_coordinate_space: false,
            strict_capabilities: false,
            ..Default::default()
        };
        assert!(naga::front::spv::parse_u8_slice(&spirv, &options).is_err());

        let r = ShaderReflection::from_spirv(&spirv, "main", Path::new("bindless.hlsl")).unwrap();
        assert_eq!(r.stage, ShaderStage::Compute);
        assert_eq!(r.workgroup_size, [8, 8, 1]);
        assert_eq!(r.bindings.len(), 1);
        let textures = &r.bindings[0];
        assert_eq!((textures.set, textures.binding), (0, 0));
        assert_eq!(textures.kind, BindingKind::SampledImage);
        assert_eq!(textures.count, 0);
    }

    #[test]
    fn strip_extensions_drops_only_extension_words() {
        let words = bindless_compute_words();
        let stripped = strip_extensions(&to_bytes(&words)).unwrap();

        let extension_words = 1 + string_words("SPV_EXT_descriptor_indexing").len();
        assert_eq!(stripped.len(), (words.len() - extension_words) * 4);
        assert_eq!(stripped[..20], to_bytes(&words[..5])[..]);
    }

    #[test]
    fn truncated_instruction_is_rejected() {
        let mut words = bindless_compute_words();
        words.extend([(4 << 16) | 253, 0]);
        let err = ShaderReflection::from_spirv(&to_bytes(&words), "main", Path::new("broken.hlsl")).unwrap_err();
        assert!(matches!(err, GfxError::ShaderCompileFailure { .. }));

        assert!(strip_extensions(&[0u8; 6]).is_err());
    }
}
