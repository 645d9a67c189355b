//! 描述符表
//!
//! 三张表：render target view、depth view、shader 可见的 bindless 表。
//! 表在初始化时创建，容量固定，槽位只分配不回收。
//!
//! shader 可见表对应全局的 descriptor set 0：
//! - binding 0：sampled image 数组
//! - binding 1：storage image 数组
//! - binding 2：immutable samplers（linear-repeat、point-clamp、anisotropic-clamp）
//!
//! 同一个 index 在 binding 0 和 binding 1 中指向同一个 view，shader 通过 index 访问。

pub mod arena;

use ash::vk;
use itertools::Itertools;
use umbra_gfx::{
    descriptors::descriptor_pool::GfxDescriptorPool,
    error::GfxResult,
    gfx::Gfx,
    pipelines::layout::GfxDescriptorSetLayout,
    sampler::{GfxSampler, GfxSamplerDesc},
};

pub use arena::{DescriptorArena, DescriptorIndex};

use crate::frame_settings::FRAME_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    RenderTarget,
    DepthStencil,
    ShaderVisible,
}
impl DescriptorKind {
    /// 每帧 4 个 G-buffer，再加上 shadow、AO 这些共享的 target
    pub const fn capacity(self) -> u32 {
        match self {
            Self::RenderTarget => (FRAME_COUNT * 6) as u32,
            // 每帧一个场景深度，另外一个给 shadow pass
            Self::DepthStencil => (FRAME_COUNT + 1) as u32,
            Self::ShaderVisible => 1024,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::RenderTarget => "rtv",
            Self::DepthStencil => "dsv",
            Self::ShaderVisible => "bindless",
        }
    }
}

/// view 在 shader 可见表中的用法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorUsage {
    /// 作为 attachment，不写 bindless descriptor
    Attachment,
    Sampled,
    Storage,
    SampledStorage,
}
impl DescriptorUsage {
    #[inline]
    fn sampled(self) -> bool {
        matches!(self, Self::Sampled | Self::SampledStorage)
    }
    #[inline]
    fn storage(self) -> bool {
        matches!(self, Self::Storage | Self::SampledStorage)
    }
}

/// 全局 bindless set，只有 shader 可见表持有
struct BindlessSet {
    set: vk::DescriptorSet,
    layout: GfxDescriptorSetLayout,
    _samplers: Vec<GfxSampler>,
    _pool: GfxDescriptorPool,
}

pub struct DescriptorTable {
    kind: DescriptorKind,
    arena: DescriptorArena,
    /// 已经记录的 view，按 index 存放
    views: Vec<Option<vk::ImageView>>,

    bindless: Option<BindlessSet>,
}
// new & init
impl DescriptorTable {
    pub const SAMPLED_BINDING: u32 = 0;
    pub const STORAGE_BINDING: u32 = 1;
    pub const SAMPLER_BINDING: u32 = 2;

    /// shader 可见表的 0 号槽位保留给 UI 的字体纹理
    pub const UI_FONT_INDEX: DescriptorIndex = DescriptorIndex(0);

    pub fn new(kind: DescriptorKind) -> GfxResult<Self> {
        let capacity = kind.capacity();
        let mut arena = DescriptorArena::new(kind.name(), capacity);

        let bindless = match kind {
            DescriptorKind::ShaderVisible => {
                let font_index = arena.allocate()?;
                debug_assert_eq!(font_index, Self::UI_FONT_INDEX);
                Some(Self::create_bindless_set(capacity)?)
            }
            _ => None,
        };

        log::info!("create descriptor table `{}` with capacity {}", kind.name(), capacity);
        Ok(Self {
            kind,
            arena,
            views: vec![None; capacity as usize],
            bindless,
        })
    }

    fn create_bindless_set(capacity: u32) -> GfxResult<BindlessSet> {
        let samplers = [
            GfxSamplerDesc::linear_repeat(),
            GfxSamplerDesc::point_clamp(),
            GfxSamplerDesc::anisotropic_clamp(16),
        ]
        .iter()
        .enumerate()
        .map(|(i, desc)| GfxSampler::new(desc, &format!("bindless-{i}")))
        .collect::<GfxResult<Vec<_>>>()?;
        let sampler_handles = samplers.iter().map(|s| s.handle()).collect_vec();

        let bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(Self::SAMPLED_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(capacity)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(Self::STORAGE_BINDING)
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(capacity)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(Self::SAMPLER_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .immutable_samplers(&sampler_handles)
                .stage_flags(vk::ShaderStageFlags::ALL),
        ];
        let bindless_flags =
            vk::DescriptorBindingFlags::PARTIALLY_BOUND | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND;
        let binding_flags = [bindless_flags, bindless_flags, vk::DescriptorBindingFlags::empty()];

        let layout = GfxDescriptorSetLayout::new(
            &bindings,
            &binding_flags,
            vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL,
            "bindless",
        )?;

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLED_IMAGE,
                descriptor_count: capacity,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: capacity,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLER,
                descriptor_count: sampler_handles.len() as u32,
            },
        ];
        let pool = GfxDescriptorPool::new(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND, 1, &pool_sizes, "bindless")?;
        let set = pool.allocate_set(layout.handle(), "bindless")?;

        Ok(BindlessSet {
            set,
            layout,
            _samplers: samplers,
            _pool: pool,
        })
    }
}
// 分配与写入
impl DescriptorTable {
    #[inline]
    pub fn allocate(&mut self) -> GfxResult<DescriptorIndex> {
        self.arena.allocate()
    }

    /// 在 `index` 处记录 view；shader 可见表还会写入对应的 descriptor
    ///
    /// 同一个所有者重建资源时可以在原来的 index 上重新记录
    pub fn create_view(
        &mut self,
        index: DescriptorIndex,
        view: vk::ImageView,
        format: vk::Format,
        extent: vk::Extent2D,
        usage: DescriptorUsage,
    ) {
        debug_assert!(
            self.arena.is_allocated(index),
            "descriptor {} of `{}` is not allocated",
            index,
            self.kind.name()
        );

        log::trace!(
            "{}[{}] <- {:?} {}x{}",
            self.kind.name(),
            index,
            format,
            extent.width,
            extent.height
        );
        self.views[index.index()] = Some(view);

        let Some(bindless) = &self.bindless else {
            return;
        };

        let sampled_info = [vk::DescriptorImageInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
        let storage_info =
            [vk::DescriptorImageInfo::default().image_view(view).image_layout(vk::ImageLayout::GENERAL)];

        let mut writes = Vec::with_capacity(2);
        if usage.sampled() {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(bindless.set)
                    .dst_binding(Self::SAMPLED_BINDING)
                    .dst_array_element(index.0)
                    .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                    .image_info(&sampled_info),
            );
        }
        if usage.storage() {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(bindless.set)
                    .dst_binding(Self::STORAGE_BINDING)
                    .dst_array_element(index.0)
                    .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                    .image_info(&storage_info),
            );
        }
        if !writes.is_empty() {
            Gfx::get().device().update_descriptors(&writes);
        }
    }
}
// getters
impl DescriptorTable {
    /// index 处记录的 view；还没有创建 view 时返回 None
    #[inline]
    pub fn cpu_handle(&self, index: DescriptorIndex) -> Option<vk::ImageView> {
        self.views.get(index.index()).copied().flatten()
    }

    /// shader 中使用的 index
    #[inline]
    pub fn gpu_handle(&self, index: DescriptorIndex) -> u32 {
        debug_assert!(
            self.views.get(index.index()).is_some_and(Option::is_some),
            "descriptor {} of `{}` has no view",
            index,
            self.kind.name()
        );
        index.0
    }

    /// 只有 shader 可见表有 set
    #[inline]
    pub fn bindless_set(&self) -> Option<vk::DescriptorSet> {
        self.bindless.as_ref().map(|b| b.set)
    }

    #[inline]
    pub fn bindless_layout(&self) -> Option<vk::DescriptorSetLayout> {
        self.bindless.as_ref().map(|b| b.layout.handle())
    }
}

impl Drop for DescriptorTable {
    fn drop(&mut self) {
        log::debug!(
            "release descriptor table `{}`: {}/{} slots used",
            self.kind.name(),
            self.arena.allocated(),
            self.arena.capacity()
        );
    }
}

/// 三张描述符表，所有 pass 共享
pub struct DescriptorTables {
    pub rtv: DescriptorTable,
    pub dsv: DescriptorTable,
    pub bindless: DescriptorTable,
}
impl DescriptorTables {
    pub fn new() -> GfxResult<Self> {
        Ok(Self {
            rtv: DescriptorTable::new(DescriptorKind::RenderTarget)?,
            dsv: DescriptorTable::new(DescriptorKind::DepthStencil)?,
            bindless: DescriptorTable::new(DescriptorKind::ShaderVisible)?,
        })
    }

    /// attachment view 所在的表
    #[inline]
    pub fn attachment_table_mut(&mut self, depth: bool) -> &mut DescriptorTable {
        if depth { &mut self.dsv } else { &mut self.rtv }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_match_frame_layout() {
        assert_eq!(DescriptorKind::RenderTarget.capacity(), 12);
        assert_eq!(DescriptorKind::DepthStencil.capacity(), 3);
        assert_eq!(DescriptorKind::ShaderVisible.capacity(), 1024);
    }

    #[test]
    fn usage_bindings() {
        assert!(DescriptorUsage::Sampled.sampled());
        assert!(!DescriptorUsage::Sampled.storage());
        assert!(DescriptorUsage::SampledStorage.sampled() && DescriptorUsage::SampledStorage.storage());
        assert!(!DescriptorUsage::Attachment.sampled() && !DescriptorUsage::Attachment.storage());
    }

    #[test]
    fn handles_resolve_after_view_is_created() {
        use ash::vk::Handle;

        let mut rtv = DescriptorTable::new(DescriptorKind::RenderTarget).unwrap();
        let index = rtv.allocate().unwrap();
        assert_eq!(rtv.cpu_handle(index), None);

        let view = vk::ImageView::from_raw(0x42);
        let extent = vk::Extent2D { width: 64, height: 32 };
        rtv.create_view(index, view, vk::Format::R32G32B32A32_SFLOAT, extent, DescriptorUsage::Attachment);

        assert_eq!(rtv.cpu_handle(index), Some(view));
        assert_eq!(rtv.gpu_handle(index), index.0);
    }
}
