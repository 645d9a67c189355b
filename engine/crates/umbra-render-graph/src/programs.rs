//! 所有 pass 使用的 shader program

use umbra_gfx::{error::GfxResult, resources::vertex::Vertex3D};
use umbra_render_interface::frame_settings::RendererDefaults;
use umbra_shader::{
    compiler::{DxcCompiler, ShaderSource, ShaderStage},
    pipeline_state::{BlendMode, CullMode, DepthMode},
    shader_program::{LinkContext, ShaderProgram},
};

/// program 的名字，同时用于 pipeline 的 debug name
pub struct ProgramNames;
impl ProgramNames {
    pub const GEOMETRY: &'static str = "geometry";
    pub const SHADOW: &'static str = "shadow";
    pub const DEPTH_COPY: &'static str = "depth-copy";
    pub const BLUR_H: &'static str = "blur-h";
    pub const BLUR_V: &'static str = "blur-v";
    pub const AO: &'static str = "ao";
    pub const AO_BLUR_H: &'static str = "ao-blur-h";
    pub const AO_BLUR_V: &'static str = "ao-blur-v";
    pub const LIGHTING: &'static str = "lighting";
}

pub struct Programs {
    pub geometry: ShaderProgram,
    pub shadow: ShaderProgram,
    pub depth_copy: ShaderProgram,
    pub blur_h: ShaderProgram,
    pub blur_v: ShaderProgram,
    pub ao: ShaderProgram,
    pub ao_blur_h: ShaderProgram,
    pub ao_blur_v: ShaderProgram,
    pub lighting: ShaderProgram,
}
// new & init
impl Programs {
    /// 编译并链接所有 program，任何一个失败都整体失败
    pub fn load(compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<Self> {
        let _span = tracy_client::span!("Programs::load");

        let mut geometry = ShaderProgram::new(ProgramNames::GEOMETRY);
        geometry
            .add_shader(compiler, ShaderSource::new("geometry.hlsl", ShaderStage::Vertex, "VSMain"))?
            .add_shader(compiler, ShaderSource::new("geometry.hlsl", ShaderStage::Pixel, "PSMain"))?
            .set_vertex::<Vertex3D>();

        let mut shadow = ShaderProgram::new(ProgramNames::SHADOW);
        shadow
            .add_shader(compiler, ShaderSource::new("shadow.hlsl", ShaderStage::Vertex, "VSMain"))?
            .add_shader(compiler, ShaderSource::new("shadow.hlsl", ShaderStage::Pixel, "PSMain"))?
            .set_vertex::<Vertex3D>()
            .set_render_target_format(0, RendererDefaults::SHADOW_FORMAT);

        let mut depth_copy = ShaderProgram::new(ProgramNames::DEPTH_COPY);
        depth_copy.add_shader(compiler, ShaderSource::new("depth_copy.hlsl", ShaderStage::Compute, "CSMain"))?;

        let mut blur_h = ShaderProgram::new(ProgramNames::BLUR_H);
        blur_h.add_shader(compiler, ShaderSource::new("blur.hlsl", ShaderStage::Compute, "CSMain"))?;

        let mut blur_v = ShaderProgram::new(ProgramNames::BLUR_V);
        blur_v.add_shader(compiler, ShaderSource::new("blur.hlsl", ShaderStage::Compute, "CSMain").with_define("V"))?;

        // 全屏 pass 绘制覆盖 NDC 的 quad
        let mut ao = ShaderProgram::new(ProgramNames::AO);
        ao.add_shader(compiler, ShaderSource::new("ao.hlsl", ShaderStage::Vertex, "VSMain"))?
            .add_shader(compiler, ShaderSource::new("ao.hlsl", ShaderStage::Pixel, "PSMain"))?
            .set_vertex::<Vertex3D>()
            .set_render_target_format(0, RendererDefaults::AO_FORMAT)
            .set_cull_mode(CullMode::None)
            .set_depth_mode(DepthMode::None);

        let mut ao_blur_h = ShaderProgram::new(ProgramNames::AO_BLUR_H);
        ao_blur_h.add_shader(compiler, ShaderSource::new("ao_blur.hlsl", ShaderStage::Compute, "CSMain"))?;

        let mut ao_blur_v = ShaderProgram::new(ProgramNames::AO_BLUR_V);
        ao_blur_v
            .add_shader(compiler, ShaderSource::new("ao_blur.hlsl", ShaderStage::Compute, "CSMain").with_define("V"))?;

        // 只有一个输出，写入呈现格式
        let mut lighting = ShaderProgram::new(ProgramNames::LIGHTING);
        lighting
            .add_shader(compiler, ShaderSource::new("lighting.hlsl", ShaderStage::Vertex, "VSMain"))?
            .add_shader(compiler, ShaderSource::new("lighting.hlsl", ShaderStage::Pixel, "PSMain"))?
            .set_vertex::<Vertex3D>()
            .set_blend_mode(BlendMode::Additive)
            .set_cull_mode(CullMode::None)
            .set_depth_mode(DepthMode::None);

        let mut programs = Self {
            geometry,
            shadow,
            depth_copy,
            blur_h,
            blur_v,
            ao,
            ao_blur_h,
            ao_blur_v,
            lighting,
        };
        for program in programs.iter_mut() {
            program.link(ctx)?;
        }
        log::info!("loaded {} shader programs", programs.iter_mut().count());
        Ok(programs)
    }

    /// 从源码重新编译并链接所有 program
    ///
    /// 调用前需要等待所有 frame 完成；失败时已经重新链接的 program 保持新的 pipeline
    pub fn reload(&mut self, compiler: &DxcCompiler, ctx: &LinkContext) -> GfxResult<()> {
        let _span = tracy_client::span!("Programs::reload");
        for program in self.iter_mut() {
            log::info!("reload program `{}`", program.name());
            program.reload(compiler, ctx)?;
        }
        Ok(())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShaderProgram> {
        [
            &mut self.geometry,
            &mut self.shadow,
            &mut self.depth_copy,
            &mut self.blur_h,
            &mut self.blur_v,
            &mut self.ao,
            &mut self.ao_blur_h,
            &mut self.ao_blur_v,
            &mut self.lighting,
        ]
        .into_iter()
    }
}
