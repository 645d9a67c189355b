use std::collections::BTreeMap;

use ash::vk;
use itertools::Itertools;
use umbra_gfx::{
    commands::command_buffer::GfxCommandBuffer,
    error::{GfxError, GfxResult},
    pipelines::{
        layout::{GfxDescriptorSetLayout, GfxPipelineLayout},
        pipeline::{GfxPipeline, GfxRasterState},
        shader_module::GfxShaderModule,
    },
    resources::vertex::GfxVertex,
};

use crate::{
    compiler::{CompiledShader, DxcCompiler, ShaderSource, ShaderStage},
    link_plan::{BINDLESS_SET, LinkPlan, PUSH_DESCRIPTOR_SET, ProgramLayout, dispatch_groups, infer_color_formats},
    pipeline_state::{BlendMode, CullMode, DepthMode, PipelineState},
    reflection::ShaderReflection,
};

/// 链接时需要的外部信息
#[derive(Debug, Clone, Copy)]
pub struct LinkContext {
    /// set 0 的全局 bindless layout
    pub bindless_layout: vk::DescriptorSetLayout,
    pub present_format: vk::Format,
    pub depth_format: vk::Format,
}

struct StageEntry {
    compiled: CompiledShader,
    reflection: ShaderReflection,
}
impl StageEntry {
    fn compile(compiler: &DxcCompiler, source: &ShaderSource) -> GfxResult<Self> {
        let compiled = compiler.compile(source)?;
        let reflection = ShaderReflection::from_spirv(&compiled.spirv, &source.entry_point, &source.path)?;
        if reflection.stage != source.stage {
            return Err(GfxError::ShaderCompileFailure {
                file: source.path.clone(),
                diagnostics: format!("entry `{}` is {:?}, expected {:?}", source.entry_point, reflection.stage, source.stage),
            });
        }
        Ok(Self { compiled, reflection })
    }
}

/// 链接完成的 pipeline，创建之后只读
pub struct LinkedProgram {
    pipeline: GfxPipeline,
    /// 在 pipeline 之后释放
    _push_descriptor_layout: Option<GfxDescriptorSetLayout>,

    plan: LinkPlan,
    layout: ProgramLayout,
    color_formats: Vec<vk::Format>,
    workgroup_size: [u32; 3],
}
impl LinkedProgram {
    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        self.plan.bind_point()
    }

    #[inline]
    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline.layout()
    }

    #[inline]
    pub fn color_formats(&self) -> &[vk::Format] {
        &self.color_formats
    }

    #[inline]
    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    pub fn push_constants<T: bytemuck::Pod>(&self, cmd: &GfxCommandBuffer, data: &T) {
        debug_assert!(size_of::<T>() as u32 <= self.layout.push_constant_size);
        cmd.push_constants(self.pipeline_layout(), self.layout.stages, bytemuck::bytes_of(data));
    }

    /// 将 buffer 写入 set 1，descriptor 类型来自反射
    pub fn push_buffers(&self, cmd: &GfxCommandBuffer, buffers: &[(u32, vk::DescriptorBufferInfo)]) -> GfxResult<()> {
        let infos = buffers.iter().map(|(_, info)| [*info]).collect_vec();
        let writes = buffers
            .iter()
            .zip(infos.iter())
            .map(|((binding, _), info)| {
                let ty = self.layout.descriptor_type_of(*binding).ok_or_else(|| {
                    GfxError::PipelineLinkFailure(format!("set 1 binding {binding} is not declared by the shader"))
                })?;
                Ok(vk::WriteDescriptorSet::default()
                    .dst_binding(*binding)
                    .descriptor_type(ty)
                    .buffer_info(info))
            })
            .collect::<GfxResult<Vec<_>>>()?;

        cmd.push_descriptor_set(self.bind_point(), self.pipeline_layout(), PUSH_DESCRIPTOR_SET, &writes);
        Ok(())
    }

    /// 按照 workgroup size 覆盖 `extent`
    pub fn dispatch(&self, cmd: &GfxCommandBuffer, extent: [u32; 3]) {
        debug_assert_eq!(self.plan, LinkPlan::Compute);
        cmd.dispatch(dispatch_groups(extent, self.workgroup_size));
    }
}

/// 由若干 stage 组成的 shader program
///
/// 添加 stage 时立即编译并反射；`link` 时构建 pipeline。重新加载时整体替换，
/// 任何一步失败都不会改变已经链接的 pipeline。
pub struct ShaderProgram {
    name: String,
    stages: BTreeMap<ShaderStage, StageEntry>,
    format_overrides: BTreeMap<usize, vk::Format>,
    state: PipelineState,
    vertex_binding: Option<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,

    linked: Option<LinkedProgram>,
}
// new & builder
impl ShaderProgram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: BTreeMap::new(),
            format_overrides: BTreeMap::new(),
            state: PipelineState::default(),
            vertex_binding: None,
            vertex_attributes: vec![],
            linked: None,
        }
    }

    /// 编译一个 stage；同一个 stage 再次添加时替换之前的
    pub fn add_shader(&mut self, compiler: &DxcCompiler, source: ShaderSource) -> GfxResult<&mut Self> {
        let entry = StageEntry::compile(compiler, &source)?;
        if let Some(prev) = self.stages.insert(source.stage, entry) {
            log::debug!("{}: replace {:?} stage {:?}", self.name, source.stage, prev.compiled.source.path);
        }
        Ok(self)
    }

    pub fn set_render_target_format(&mut self, index: usize, format: vk::Format) -> &mut Self {
        self.format_overrides.insert(index, format);
        self
    }

    pub fn set_cull_mode(&mut self, cull: CullMode) -> &mut Self {
        self.state.cull = cull;
        self
    }

    pub fn set_depth_mode(&mut self, depth: DepthMode) -> &mut Self {
        self.state.depth = depth;
        self
    }

    pub fn set_blend_mode(&mut self, blend: BlendMode) -> &mut Self {
        self.state.blend = blend;
        self
    }

    /// 不设置时没有 vertex buffer，顶点由 `SV_VertexID` 生成
    pub fn set_vertex<V: GfxVertex>(&mut self) -> &mut Self {
        self.vertex_binding = Some(V::binding());
        self.vertex_attributes = V::attributes();
        self
    }
}
// link
impl ShaderProgram {
    pub fn link(&mut self, ctx: &LinkContext) -> GfxResult<()> {
        let linked = self.build(&self.stages, ctx)?;
        self.linked = Some(linked);
        Ok(())
    }

    /// 从源码重新编译所有 stage 并重新链接
    pub fn reload(&mut self, compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<()> {
        let stages = self
            .stages
            .iter()
            .map(|(stage, entry)| Ok((*stage, StageEntry::compile(compiler, &entry.compiled.source)?)))
            .collect::<GfxResult<BTreeMap<_, _>>>()?;
        let linked = self.build(&stages, ctx)?;

        self.stages = stages;
        self.linked = Some(linked);
        Ok(())
    }

    fn build(&self, stages: &BTreeMap<ShaderStage, StageEntry>, ctx: &LinkContext) -> GfxResult<LinkedProgram> {
        let _span = tracy_client::span!("ShaderProgram::link");

        let plan = LinkPlan::decide(&stages.keys().copied().collect_vec())?;
        let layout = ProgramLayout::merge(&stages.values().map(|e| &e.reflection).collect_vec())?;

        let push_descriptor_layout = if layout.push_descriptors.is_empty() {
            None
        } else {
            Some(GfxDescriptorSetLayout::new(
                &layout.push_descriptor_bindings(),
                &[],
                vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR,
                &format!("{}-set{}", self.name, PUSH_DESCRIPTOR_SET),
            )?)
        };
        let set_layouts = std::iter::once(ctx.bindless_layout)
            .chain(push_descriptor_layout.as_ref().map(|l| l.handle()))
            .collect_vec();
        let pipeline_layout = GfxPipelineLayout::new(&set_layouts, &layout.push_constant_ranges(), &self.name)?;

        // module 只在创建 pipeline 期间需要，离开作用域时释放
        let modules = stages
            .iter()
            .map(|(stage, entry)| {
                GfxShaderModule::new(
                    &entry.compiled.spirv,
                    stage.vk_stage(),
                    &entry.compiled.source.entry_point,
                    &format!("{}-{}", self.name, stage.name()),
                )
            })
            .collect::<GfxResult<Vec<_>>>()?;

        let color_formats = match plan {
            LinkPlan::Graphics { has_pixel: true } => {
                let outputs = stages.get(&ShaderStage::Pixel).map_or(0, |e| e.reflection.output_count);
                infer_color_formats(outputs, &self.format_overrides, ctx.present_format)
            }
            _ => vec![],
        };
        let workgroup_size = stages.get(&ShaderStage::Compute).map_or([1, 1, 1], |e| e.reflection.workgroup_size);

        let pipeline = match plan {
            LinkPlan::Compute => GfxPipeline::compute(&modules[0], pipeline_layout, &self.name)?,
            LinkPlan::Graphics { .. } => {
                let (depth_compare, depth_write) = self.state.depth.vk_test();
                let raster = GfxRasterState {
                    color_formats: color_formats.clone(),
                    depth_format: self.state.depth.uses_attachment().then_some(ctx.depth_format),
                    vertex_binding: self.vertex_binding,
                    vertex_attributes: self.vertex_attributes.clone(),
                    cull_mode: self.state.cull.vk_flags(),
                    // 投影矩阵翻转了 y，逆时针为正面
                    front_face: vk::FrontFace::COUNTER_CLOCKWISE,
                    depth_compare,
                    depth_write,
                    blend: self.state.blend.vk_attachment_state(),
                };
                GfxPipeline::graphics(&modules, &raster, pipeline_layout, &self.name)?
            }
        };

        log::info!("linked {} as {:?}, color formats {:?}", self.name, plan, color_formats);
        Ok(LinkedProgram {
            pipeline,
            _push_descriptor_layout: push_descriptor_layout,
            plan,
            layout,
            color_formats,
            workgroup_size,
        })
    }
}
// use
impl ShaderProgram {
    /// 绑定 pipeline 以及 set 0，返回的 [`LinkedProgram`] 用于写入 push constant 和 set 1
    pub fn use_shader(&self, cmd: &GfxCommandBuffer, bindless_set: vk::DescriptorSet) -> GfxResult<&LinkedProgram> {
        let linked = self.linked()?;
        cmd.bind_pipeline(&linked.pipeline);
        cmd.bind_descriptor_set(linked.bind_point(), linked.pipeline_layout(), BINDLESS_SET, bindless_set);
        Ok(linked)
    }

    pub fn linked(&self) -> GfxResult<&LinkedProgram> {
        self.linked
            .as_ref()
            .ok_or_else(|| GfxError::PipelineLinkFailure(format!("program `{}` is used before link", self.name)))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> Vec<ShaderStage> {
        self.stages.keys().copied().collect_vec()
    }
}
