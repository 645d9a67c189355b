use ash::vk;
use umbra_gfx::{
    commands::{
        command_buffer::GfxCommandBuffer, label::LabelKind, semaphore::GfxSemaphore, submit::GfxSubmitBatch,
    },
    error::{GfxError, GfxResult},
    gfx::Gfx,
    swapchain::{render_swapchain::GfxAcquireOutcome, surface::GfxSurface},
};
use umbra_render_interface::{
    descriptor_table::DescriptorTables,
    frame_command_buffer::{FrameCommandBuffers, FrameWait, PassCategory, drain_before_teardown},
    frame_counter::FrameCounter,
    frame_settings::{FrameLabel, FrameSettings},
    transient_memory::TransientMemory,
};
use umbra_scene::{components::mesh::MeshLibrary, lights::Lights, scene_graph::SceneGraph};
use umbra_shader::{compiler::DxcCompiler, shader_program::LinkContext};

use crate::{
    blur_kernel::BlurKernel,
    frame_targets::FrameTargets,
    passes::{
        PassRenderingInfo, ao_pass::AoPass, geometry_pass::GeometryPass, lighting_pass::LightingPass,
        shadow_pass::ShadowPass,
    },
    present::RenderPresent,
    programs::Programs,
    render_context::{CameraMatrices, RenderContext, SceneRoots},
    render_settings::{AoSettings, RenderSettings},
};

/// 一帧中的 pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Shadow,
    Geometry,
    Ao,
    Lighting,
}
impl PassKind {
    /// 录制到哪一类命令缓冲，AO 复用 shadow 的命令缓冲
    pub const fn category(self) -> PassCategory {
        match self {
            Self::Shadow | Self::Ao => PassCategory::Shadow,
            Self::Geometry => PassCategory::Geometry,
            Self::Lighting => PassCategory::Lighting,
        }
    }

    /// lighting 的命令缓冲在 `EndFrame` 时才提交
    pub const fn submits_immediately(self) -> bool {
        !matches!(self, Self::Lighting)
    }
}

/// 每帧的 pass 顺序
pub struct FramePlan;
impl FramePlan {
    pub fn passes(settings: &RenderSettings) -> Vec<PassKind> {
        let mut passes = vec![PassKind::Shadow, PassKind::Geometry];
        if settings.ao.enabled {
            passes.push(PassKind::Ao);
        }
        passes.push(PassKind::Lighting);
        passes
    }
}

/// 一帧需要的场景输入，由调用方持有
pub struct FrameScene<'a> {
    pub scene: &'a SceneGraph,
    pub roots: SceneRoots,
    pub meshes: &'a MeshLibrary,
    pub lights: &'a Lights,
    pub camera: CameraMatrices,
    pub settings: &'a RenderSettings,
}

/// 延迟着色的帧编排：持有所有 GPU 资源，按 [`FramePlan`] 录制并提交每一帧
pub struct RenderGraph {
    frame_settings: FrameSettings,
    frame_counter: FrameCounter,

    tables: DescriptorTables,
    targets: FrameTargets,
    cmds: FrameCommandBuffers,
    transient: TransientMemory,

    compiler: DxcCompiler,
    programs: Programs,
    present: RenderPresent,

    shadow_kernel: BlurKernel,
    ao_kernel: BlurKernel,

    /// 每次 `EndFrame` signal 一次，退出时等待它
    idle_timeline: GfxSemaphore,
    idle_value: u64,

    /// 窗口尺寸变化或者 swapchain 过期，下一次 `DrawScene` 之前重建
    needs_rebuild: bool,
    /// 本帧已经录制了 lighting，`EndFrame` 需要提交并呈现
    frame_recorded: bool,
}
// new & init
impl RenderGraph {
    pub fn new(
        surface: GfxSurface,
        mut frame_settings: FrameSettings,
        compiler: DxcCompiler,
        vsync: bool,
        settings: &RenderSettings,
    ) -> GfxResult<Self> {
        let _span = tracy_client::span!("RenderGraph::new");

        let present = RenderPresent::new(surface, vsync, frame_settings.frame_extent)?;
        frame_settings.frame_extent = present.extent()?;
        frame_settings.color_format = present.format()?;

        let mut tables = DescriptorTables::new()?;
        let targets = FrameTargets::new(frame_settings.frame_extent, &mut tables)?;
        let cmds = FrameCommandBuffers::new(frame_settings.fence_timeout)?;
        let transient = TransientMemory::new()?;

        let link_ctx = Self::link_context(&tables, &frame_settings)?;
        let programs = Programs::load(&compiler, &link_ctx)?;

        log::info!(
            "render graph ready: {}x{} {:?}",
            frame_settings.frame_extent.width,
            frame_settings.frame_extent.height,
            frame_settings.color_format
        );
        Ok(Self {
            frame_settings,
            frame_counter: FrameCounter::new(0),
            tables,
            targets,
            cmds,
            transient,
            compiler,
            programs,
            present,
            shadow_kernel: BlurKernel::new(settings.shadow_blur_width),
            ao_kernel: BlurKernel::new(AoSettings::BLUR_WIDTH),
            idle_timeline: GfxSemaphore::new_timeline(0, "idle-timeline")?,
            idle_value: 0,
            needs_rebuild: false,
            frame_recorded: false,
        })
    }

    fn link_context(tables: &DescriptorTables, frame_settings: &FrameSettings) -> GfxResult<LinkContext> {
        let bindless_layout = tables
            .bindless
            .bindless_layout()
            .ok_or_else(|| GfxError::creation("link-context", "bindless table has no set layout"))?;
        Ok(LinkContext {
            bindless_layout,
            present_format: frame_settings.color_format,
            depth_format: frame_settings.depth_format,
        })
    }

    /// set 0，所有 program 共用
    pub fn bindless_set(&self) -> GfxResult<vk::DescriptorSet> {
        self.tables
            .bindless
            .bindless_set()
            .ok_or_else(|| GfxError::creation("bindless-set", "bindless table has no descriptor set"))
    }
}
// 帧生命周期
impl RenderGraph {
    /// 录制并提交 shadow、geometry、AO；录制 lighting，留给 UI 继续写入
    ///
    /// 窗口最小化或者 swapchain 过期时跳过本帧；suboptimal 的 image 照常绘制，下一帧之前重建
    pub fn draw_scene(&mut self, scene: &FrameScene) -> GfxResult<()> {
        let _span = tracy_client::span!("RenderGraph::draw_scene");
        self.frame_counter.tick();

        let extent = self.frame_settings.frame_extent;
        if extent.width == 0 || extent.height == 0 {
            return Ok(());
        }
        if self.needs_rebuild {
            self.rebuild()?;
        }

        let frame_label = self.frame_counter.frame_label();
        for category in PassCategory::ALL {
            self.cmds.get_mut(frame_label, category).wait()?;
        }
        self.transient.begin_frame(frame_label, self.frame_counter.frame_id());

        self.shadow_kernel.set_width(scene.settings.shadow_blur_width);

        let timeout_ns = u64::try_from(self.frame_settings.fence_timeout.as_nanos()).unwrap_or(u64::MAX);
        let acquire = self.present.acquire_image(frame_label, timeout_ns)?;
        self.needs_rebuild |= acquire.needs_rebuild();
        if !acquire.acquired() {
            log::info!("{} swapchain is out of date, skip frame", self.frame_counter.frame_name());
            return Ok(());
        }
        if acquire == GfxAcquireOutcome::Suboptimal {
            log::info!("{} swapchain is suboptimal, rebuild after present", self.frame_counter.frame_name());
        }

        let ctx = RenderContext {
            scene: scene.scene,
            roots: scene.roots,
            meshes: scene.meshes,
            lights: scene.lights,
            camera: scene.camera,
            settings: scene.settings,
            frame_label,
            frame_id: self.frame_counter.frame_id(),
            extent: self.frame_settings.frame_extent,
            bindless_set: self.bindless_set()?,
        };
        for pass in FramePlan::passes(scene.settings) {
            self.record(pass, &ctx)?;
        }
        self.frame_recorded = true;
        Ok(())
    }

    fn record(&mut self, pass: PassKind, ctx: &RenderContext) -> GfxResult<()> {
        let frame_cmd = self.cmds.get_mut(ctx.frame_label, pass.category());
        // AO 和 shadow 共用命令缓冲，需要等 shadow 的提交完成
        frame_cmd.wait()?;
        let cmd = frame_cmd.reset()?;

        match pass {
            PassKind::Shadow => {
                ShadowPass::new(&self.programs, &self.shadow_kernel).exec(cmd, ctx, &mut self.targets, &mut self.transient)?
            }
            PassKind::Geometry => {
                GeometryPass::new(&self.programs).exec(cmd, ctx, &mut self.targets, &mut self.transient)?
            }
            PassKind::Ao => {
                AoPass::new(&self.programs, &self.ao_kernel).exec(cmd, ctx, &mut self.targets, &mut self.transient)?
            }
            PassKind::Lighting => {
                LightingPass::new(&self.programs).exec(cmd, ctx, &self.targets, &mut self.transient, &mut self.present)?
            }
        }

        if pass.submits_immediately() {
            self.transient.commit()?;
            frame_cmd.execute(&[], &[])?;
        }
        Ok(())
    }

    /// 在 lighting 的结果上绘制 UI，写入同一个命令缓冲
    ///
    /// 本帧被跳过时不调用 `draw`
    pub fn draw_menu<F>(&mut self, draw: F) -> GfxResult<()>
    where
        F: FnOnce(&GfxCommandBuffer, vk::Extent2D, FrameLabel) -> GfxResult<()>,
    {
        if !self.frame_recorded {
            return Ok(());
        }
        let _span = tracy_client::span!("RenderGraph::draw_menu");

        let frame_label = self.frame_counter.frame_label();
        let extent = self.frame_settings.frame_extent;
        let cmd = self.cmds.get(frame_label, PassCategory::Lighting).cmd();

        cmd.begin_label("[ui-pass]menu", LabelKind::Pass);
        PassRenderingInfo::new(extent).load_color(self.present.current_view()?).begin(cmd);
        draw(cmd, extent, frame_label)?;
        cmd.end_rendering();
        cmd.end_label();
        Ok(())
    }

    /// 提交 lighting、呈现、推进 frame slot
    pub fn end_frame(&mut self) -> GfxResult<()> {
        let _span = tracy_client::span!("RenderGraph::end_frame");
        let frame_label = self.frame_counter.frame_label();

        if std::mem::take(&mut self.frame_recorded) {
            let frame_cmd = self.cmds.get_mut(frame_label, PassCategory::Lighting);
            self.present.end_render(frame_cmd.cmd())?;
            self.transient.commit()?;
            frame_cmd.execute(
                &[FrameWait {
                    semaphore: self.present.present_complete(frame_label),
                    stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                }],
                &[self.present.render_complete()?],
            )?;

            if self.present.present_image()? {
                log::info!("{} swapchain is suboptimal after present", self.frame_counter.frame_name());
                self.needs_rebuild = true;
            }
        }

        self.idle_value += 1;
        Gfx::get().queue().submit(&[GfxSubmitBatch::empty().signal_timeline(&self.idle_timeline, self.idle_value)])?;

        self.frame_counter.next_frame();
        tracy_client::frame_mark();
        Ok(())
    }
}
// shader & resize
impl RenderGraph {
    /// 等待所有 in-flight 的帧，然后从源码重新编译所有 program
    pub fn load_shaders(&mut self) -> GfxResult<()> {
        let _span = tracy_client::span!("RenderGraph::load_shaders");
        self.cmds.wait_all()?;
        let link_ctx = Self::link_context(&self.tables, &self.frame_settings)?;
        self.programs.reload(&self.compiler, &link_ctx)
    }

    /// 立即记录新的 viewport；target 和 swapchain 在下一次 `DrawScene` 之前重建
    pub fn resize(&mut self, extent: vk::Extent2D) {
        if extent == self.frame_settings.frame_extent {
            return;
        }
        log::info!(
            "viewport resized: {}x{} -> {}x{}",
            self.frame_settings.frame_extent.width,
            self.frame_settings.frame_extent.height,
            extent.width,
            extent.height
        );
        self.frame_settings.frame_extent = extent;
        self.needs_rebuild = true;
    }

    fn rebuild(&mut self) -> GfxResult<()> {
        let _span = tracy_client::span!("RenderGraph::rebuild");
        self.cmds.wait_all()?;

        self.present.rebuild(self.frame_settings.frame_extent)?;
        // surface 可能给出和窗口不同的尺寸
        self.frame_settings.frame_extent = self.present.extent()?;
        self.targets.rebuild(self.frame_settings.frame_extent, &mut self.tables)?;

        self.needs_rebuild = false;
        Ok(())
    }
}
// getters
impl RenderGraph {
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }

    #[inline]
    pub fn frame_extent(&self) -> vk::Extent2D {
        self.frame_settings.frame_extent
    }

    #[inline]
    pub fn tables_mut(&mut self) -> &mut DescriptorTables {
        &mut self.tables
    }

    /// 渲染流程之外的 program（例如 UI）用同一个编译器和 set 0 链接
    #[inline]
    pub fn compiler(&self) -> &DxcCompiler {
        &self.compiler
    }

    pub fn program_link_context(&self) -> GfxResult<LinkContext> {
        Self::link_context(&self.tables, &self.frame_settings)
    }
}
// destroy
impl RenderGraph {
    /// 等待所有命令缓冲以及 idle timeline，之后按依赖的逆序释放
    /// teardown 之前调用，等待所有帧、idle timeline，最后等待 device 空闲
    ///
    /// 前两步有超时；超时之后不再等待 device
    pub fn drain(&mut self) -> GfxResult<()> {
        let _span = tracy_client::span!("RenderGraph::drain");
        drain_before_teardown(
            || self.cmds.wait_all(),
            &self.idle_timeline,
            self.idle_value,
            self.frame_settings.idle_timeout,
            || Gfx::get().wait_idle(),
        )
    }

    /// 需要先 [`Self::drain`]
    pub fn destroy(self) {
        let _span = tracy_client::span!("RenderGraph::destroy");
        let Self {
            tables,
            targets,
            cmds,
            transient,
            programs,
            present,
            idle_timeline,
            ..
        } = self;
        drop(programs);
        targets.destroy();
        drop(tables);
        drop(transient);
        present.destroy();
        idle_timeline.destroy();
        cmds.destroy();
        log::info!("render graph destroyed");
    }
}

#[cfg(test)]
mod tests {
    use umbra_gfx::commands::image_state::GfxImageState;
    use umbra_render_interface::{
        frame_settings::RendererDefaults,
        render_target::{ImageStateTracker, RenderTarget},
    };

    use super::*;

    #[test]
    fn ao_is_inserted_between_geometry_and_lighting() {
        let mut settings = RenderSettings::default();
        assert_eq!(FramePlan::passes(&settings), vec![PassKind::Shadow, PassKind::Geometry, PassKind::Lighting]);

        settings.ao.enabled = true;
        let passes = FramePlan::passes(&settings);
        assert_eq!(passes, vec![PassKind::Shadow, PassKind::Geometry, PassKind::Ao, PassKind::Lighting]);

        // AO 复用 shadow 的命令缓冲，只有 lighting 延迟到 EndFrame 提交
        assert_eq!(PassKind::Ao.category(), PassCategory::Shadow);
        assert_eq!(passes.iter().filter(|p| !p.submits_immediately()).count(), 1);
    }

    #[test]
    fn resized_viewport_is_detected_on_bind() {
        let old = vk::Extent2D {
            width: 1920,
            height: 1080,
        };
        let resized = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        let mut gbuffer = ImageStateTracker::new("gbuffer-A-0", RenderTarget::REST_STATE, old);
        assert!(gbuffer.check_extent(old).is_ok());

        match gbuffer.check_extent(resized) {
            Err(GfxError::StaleRenderTarget { name, target, viewport }) => {
                assert_eq!(name, "gbuffer-A-0");
                assert_eq!(target, old);
                assert_eq!(viewport, resized);
            }
            other => panic!("expected StaleRenderTarget, got {other:?}"),
        }

        // 重建之后恢复
        gbuffer.rebuild(RenderTarget::REST_STATE, resized);
        assert!(gbuffer.check_extent(resized).is_ok());
        assert!(gbuffer.transition(RenderTarget::REST_STATE, GfxImageState::COLOR_ATTACHMENT_WRITE).is_ok());
    }

    #[test]
    fn shadow_targets_do_not_depend_on_viewport() {
        let shadow = ImageStateTracker::new(
            "shadow",
            RenderTarget::REST_STATE,
            RendererDefaults::SHADOW_EXTENT,
        );
        assert!(shadow.check_extent(RendererDefaults::SHADOW_EXTENT).is_ok());
    }
}
