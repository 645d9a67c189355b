//! Render Target
//!
//! 一张 2D 纹理，加上 write view 和 read view 两个描述符 index。
//! 创建顺序：先分配两个 index，再创建纹理，最后创建两个 view。
//!
//! 静止状态是 [`GfxImageState::SHADER_READ_ALL`]。写入前 bind、写入后 unbind，
//! 两次转换都会检查当前状态，bind 还会检查尺寸是否和 viewport 一致。

pub mod state_tracker;

use ash::vk;
use umbra_gfx::{
    commands::{barrier::GfxImageBarrier, command_buffer::GfxCommandBuffer, image_state::GfxImageState},
    error::GfxResult,
    gfx::Gfx,
    resources::{
        image::{GfxImage, VulkanFormatUtils},
        image_view::GfxImageView,
    },
};

pub use state_tracker::ImageStateTracker;

use crate::{
    descriptor_table::{DescriptorIndex, DescriptorKind, DescriptorTables, DescriptorUsage},
    frame_settings::RendererDefaults,
};

#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub name: String,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    /// 作为 color / depth attachment 写入
    pub attachment: bool,
    /// 作为 storage image 被 compute 写入
    pub storage: bool,
}
impl RenderTargetDesc {
    pub fn color(name: impl Into<String>, extent: vk::Extent2D, format: vk::Format) -> Self {
        Self {
            name: name.into(),
            extent,
            format,
            attachment: true,
            storage: false,
        }
    }

    pub fn depth(name: impl Into<String>, extent: vk::Extent2D) -> Self {
        Self::color(name, extent, RendererDefaults::DEPTH_FORMAT)
    }

    /// 只被 compute 写入
    pub fn storage(name: impl Into<String>, extent: vk::Extent2D, format: vk::Format) -> Self {
        Self {
            attachment: false,
            storage: true,
            ..Self::color(name, extent, format)
        }
    }

    #[inline]
    pub fn with_storage(mut self) -> Self {
        self.storage = true;
        self
    }

    #[inline]
    pub fn is_depth(&self) -> bool {
        VulkanFormatUtils::is_depth_format(self.format)
    }

    /// bind 之后的状态
    pub fn write_state(&self) -> GfxImageState {
        match (self.attachment, self.is_depth()) {
            (true, true) => GfxImageState::DEPTH_ATTACHMENT_READ_WRITE,
            (true, false) => GfxImageState::COLOR_ATTACHMENT_WRITE,
            (false, _) => GfxImageState::STORAGE_WRITE_COMPUTE,
        }
    }

    pub fn image_usage(&self) -> vk::ImageUsageFlags {
        let mut usage = vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_SRC;
        if self.attachment {
            usage |= if self.is_depth() {
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::ImageUsageFlags::COLOR_ATTACHMENT
            };
        }
        if self.storage {
            usage |= vk::ImageUsageFlags::STORAGE;
        }
        usage
    }

    /// write view 所在的表：只被 compute 写入的 target 直接使用 shader 可见表中的 storage 槽位
    pub fn write_table(&self) -> DescriptorKind {
        match (self.attachment, self.is_depth()) {
            (true, true) => DescriptorKind::DepthStencil,
            (true, false) => DescriptorKind::RenderTarget,
            (false, _) => DescriptorKind::ShaderVisible,
        }
    }

    fn read_usage(&self) -> DescriptorUsage {
        if self.storage { DescriptorUsage::SampledStorage } else { DescriptorUsage::Sampled }
    }
}

/// 一次状态转换需要录制的 barrier 两端，不需要 barrier 时为 None
pub type TargetTransition = Option<(GfxImageState, GfxImageState)>;

/// target 的描述和当前状态，不持有 GPU 资源
///
/// bind / unbind 的检查都在这里完成，[`RenderTarget`] 只把返回的转换录制成 barrier
#[derive(Debug, Clone)]
pub struct TargetState {
    desc: RenderTargetDesc,
    tracker: ImageStateTracker,
}
impl TargetState {
    pub fn new(desc: RenderTargetDesc) -> Self {
        let tracker = ImageStateTracker::new(desc.name.clone(), RenderTarget::REST_STATE, desc.extent);
        Self { desc, tracker }
    }

    #[inline]
    pub fn check_extent(&self, viewport: vk::Extent2D) -> GfxResult<()> {
        self.tracker.check_extent(viewport)
    }

    /// 静止状态 -> 写入状态，同时检查尺寸
    pub fn begin_write(&mut self, viewport: vk::Extent2D) -> GfxResult<TargetTransition> {
        self.tracker.check_extent(viewport)?;
        self.tracker.transition(RenderTarget::REST_STATE, self.desc.write_state())
    }

    /// 写入状态 -> 静止状态
    pub fn end_write(&mut self) -> GfxResult<TargetTransition> {
        self.tracker.transition(self.desc.write_state(), RenderTarget::REST_STATE)
    }

    /// 静止状态 -> compute 写入
    pub fn begin_storage(&mut self, viewport: vk::Extent2D) -> GfxResult<TargetTransition> {
        debug_assert!(self.desc.storage, "`{}` is not a storage target", self.desc.name);
        self.tracker.check_extent(viewport)?;
        self.tracker.transition(RenderTarget::REST_STATE, GfxImageState::STORAGE_WRITE_COMPUTE)
    }

    pub fn end_storage(&mut self) -> GfxResult<TargetTransition> {
        self.tracker.transition(GfxImageState::STORAGE_WRITE_COMPUTE, RenderTarget::REST_STATE)
    }

    fn rebuild(&mut self, extent: vk::Extent2D) {
        self.desc.extent = extent;
        self.tracker.rebuild(RenderTarget::REST_STATE, extent);
    }

    #[inline]
    pub fn desc(&self) -> &RenderTargetDesc {
        &self.desc
    }

    #[inline]
    pub fn state(&self) -> GfxImageState {
        self.tracker.state()
    }
}

pub struct RenderTarget {
    target_state: TargetState,

    image: GfxImage,
    write_view: GfxImageView,
    read_view: GfxImageView,

    write_index: DescriptorIndex,
    read_index: DescriptorIndex,
}
// new & init
impl RenderTarget {
    /// 静止状态
    pub const REST_STATE: GfxImageState = GfxImageState::SHADER_READ_ALL;

    pub fn new(desc: RenderTargetDesc, tables: &mut DescriptorTables) -> GfxResult<Self> {
        let _span = tracy_client::span!("RenderTarget::new");

        let read_index = tables.bindless.allocate()?;
        let write_index = match desc.write_table() {
            DescriptorKind::ShaderVisible => read_index,
            DescriptorKind::DepthStencil => tables.dsv.allocate()?,
            DescriptorKind::RenderTarget => tables.rtv.allocate()?,
        };

        let (image, write_view, read_view) = Self::create_resources(&desc)?;

        let render_target = Self {
            target_state: TargetState::new(desc),
            image,
            write_view,
            read_view,
            write_index,
            read_index,
        };
        render_target.register_views(tables);

        let desc = render_target.desc();
        log::info!(
            "create render target `{}` {}x{} {:?}, write {}, read {}",
            desc.name,
            desc.extent.width,
            desc.extent.height,
            desc.format,
            render_target.write_index,
            render_target.read_index
        );
        Ok(render_target)
    }

    /// 创建纹理、两个 view，并转换到静止状态
    fn create_resources(desc: &RenderTargetDesc) -> GfxResult<(GfxImage, GfxImageView, GfxImageView)> {
        let image = GfxImage::new_2d(desc.extent, desc.format, desc.image_usage(), &desc.name)?;
        let aspect = VulkanFormatUtils::aspect_of(desc.format);

        let write_view = GfxImageView::new_2d(image.handle(), desc.format, aspect, &format!("{}-write", desc.name))?;
        let read_view = GfxImageView::new_2d(image.handle(), desc.format, aspect, &format!("{}-read", desc.name))?;

        let init = GfxImageBarrier::new(image.handle(), aspect, GfxImageState::UNDEFINED, Self::REST_STATE);
        Gfx::get().submit_immediate(&format!("init-{}", desc.name), |cmd| cmd.pipeline_barrier(&[init]))?;

        Ok((image, write_view, read_view))
    }

    fn register_views(&self, tables: &mut DescriptorTables) {
        let desc = self.desc();
        match desc.write_table() {
            DescriptorKind::ShaderVisible => {}
            kind => tables.attachment_table_mut(kind == DescriptorKind::DepthStencil).create_view(
                self.write_index,
                self.write_view.handle(),
                desc.format,
                desc.extent,
                DescriptorUsage::Attachment,
            ),
        }
        tables.bindless.create_view(self.read_index, self.read_view.handle(), desc.format, desc.extent, desc.read_usage());
    }

    /// 按新的尺寸重建纹理和 view，描述符 index 保持不变
    ///
    /// 调用方需要保证 GPU 已经不再使用旧的纹理
    pub fn rebuild(&mut self, extent: vk::Extent2D, tables: &mut DescriptorTables) -> GfxResult<()> {
        let desc = self.desc();
        log::info!(
            "rebuild render target `{}`: {}x{} -> {}x{}",
            desc.name,
            desc.extent.width,
            desc.extent.height,
            extent.width,
            extent.height
        );

        let (image, write_view, read_view) = Self::create_resources(&RenderTargetDesc { extent, ..desc.clone() })?;

        std::mem::replace(&mut self.write_view, write_view).destroy();
        std::mem::replace(&mut self.read_view, read_view).destroy();
        std::mem::replace(&mut self.image, image).destroy();

        self.target_state.rebuild(extent);
        self.register_views(tables);
        Ok(())
    }

    pub fn destroy(self) {
        self.write_view.destroy();
        self.read_view.destroy();
        self.image.destroy();
    }
}
// 状态转换
impl RenderTarget {
    /// 静止状态 -> 写入状态，同时检查尺寸
    pub fn bind(&mut self, cmd: &GfxCommandBuffer, viewport: vk::Extent2D) -> GfxResult<()> {
        let transition = self.target_state.begin_write(viewport)?;
        self.record(cmd, transition);
        Ok(())
    }

    /// 写入状态 -> 静止状态
    pub fn unbind(&mut self, cmd: &GfxCommandBuffer) -> GfxResult<()> {
        let transition = self.target_state.end_write()?;
        self.record(cmd, transition);
        Ok(())
    }

    /// 静止状态 -> compute 写入
    pub fn bind_storage(&mut self, cmd: &GfxCommandBuffer, viewport: vk::Extent2D) -> GfxResult<()> {
        let transition = self.target_state.begin_storage(viewport)?;
        self.record(cmd, transition);
        Ok(())
    }

    pub fn unbind_storage(&mut self, cmd: &GfxCommandBuffer) -> GfxResult<()> {
        let transition = self.target_state.end_storage()?;
        self.record(cmd, transition);
        Ok(())
    }

    /// 录制 [`TargetState`] 返回的转换
    pub fn record(&self, cmd: &GfxCommandBuffer, transition: TargetTransition) {
        if let Some((prev, next)) = transition {
            let aspect = VulkanFormatUtils::aspect_of(self.desc().format);
            cmd.pipeline_barrier(&[GfxImageBarrier::new(self.image.handle(), aspect, prev, next)]);
        }
    }
}
// getters
impl RenderTarget {
    /// 用于 dynamic rendering 的 attachment view
    #[inline]
    pub fn attachment_view(&self) -> vk::ImageView {
        self.write_view.handle()
    }

    #[inline]
    pub fn write_index(&self) -> DescriptorIndex {
        self.write_index
    }

    /// shader 中通过这个 index 访问
    #[inline]
    pub fn read_index(&self) -> DescriptorIndex {
        self.read_index
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image.handle()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.desc().extent
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.desc().format
    }

    #[inline]
    pub fn state(&self) -> GfxImageState {
        self.target_state.state()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.desc().name
    }

    #[inline]
    pub fn desc(&self) -> &RenderTargetDesc {
        self.target_state.desc()
    }

    /// 需要和其他 target 一起检查时使用，转换结果交给 [`Self::record`]
    #[inline]
    pub fn target_state_mut(&mut self) -> &mut TargetState {
        &mut self.target_state
    }
}

#[cfg(test)]
mod tests {
    use umbra_gfx::error::GfxError;

    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1024,
        height: 1024,
    };

    #[test]
    fn gbuffer_target_usage() {
        let desc = RenderTargetDesc::color("gbuffer-0", EXTENT, RendererDefaults::GBUFFER_FORMAT);
        assert_eq!(desc.write_state(), GfxImageState::COLOR_ATTACHMENT_WRITE);
        assert_eq!(desc.write_table(), DescriptorKind::RenderTarget);
        assert!(desc.image_usage().contains(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED));
        assert!(!desc.image_usage().contains(vk::ImageUsageFlags::STORAGE));
    }

    #[test]
    fn depth_target_goes_to_dsv_table() {
        let desc = RenderTargetDesc::depth("depth-A", EXTENT);
        assert!(desc.is_depth());
        assert_eq!(desc.write_state(), GfxImageState::DEPTH_ATTACHMENT_READ_WRITE);
        assert_eq!(desc.write_table(), DescriptorKind::DepthStencil);
        assert!(desc.image_usage().contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    }

    #[test]
    fn storage_only_target_writes_through_bindless() {
        let desc = RenderTargetDesc::storage("blur-0", EXTENT, RendererDefaults::SHADOW_FORMAT);
        assert_eq!(desc.write_state(), GfxImageState::STORAGE_WRITE_COMPUTE);
        assert_eq!(desc.write_table(), DescriptorKind::ShaderVisible);
        assert_eq!(desc.read_usage(), DescriptorUsage::SampledStorage);
        assert!(!desc.image_usage().contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));

        let ao = RenderTargetDesc::color("ao-1", EXTENT, RendererDefaults::AO_FORMAT).with_storage();
        assert_eq!(ao.write_table(), DescriptorKind::RenderTarget);
        assert!(ao.image_usage().contains(vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::COLOR_ATTACHMENT));
    }

    #[test]
    fn stale_target_keeps_rest_state() {
        let mut state = TargetState::new(RenderTargetDesc::depth("depth-B", EXTENT));
        let resized = vk::Extent2D {
            width: 800,
            height: 600,
        };
        assert!(matches!(state.begin_write(resized), Err(GfxError::StaleRenderTarget { .. })));
        assert_eq!(state.state(), RenderTarget::REST_STATE);

        let bind = state.begin_write(EXTENT).unwrap();
        assert_eq!(bind, Some((RenderTarget::REST_STATE, GfxImageState::DEPTH_ATTACHMENT_READ_WRITE)));
        assert!(state.end_write().unwrap().is_some());

        state.rebuild(resized);
        assert!(state.begin_write(resized).is_ok());
    }
}
