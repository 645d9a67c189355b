use ash::vk;
use umbra_gfx::error::GfxResult;
use umbra_render_interface::{
    descriptor_table::DescriptorTables,
    frame_settings::{FrameLabel, RendererDefaults},
    render_target::{RenderTarget, RenderTargetDesc},
};

/// G-buffer 中各个 target 的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GBufferSlot {
    WorldPosition = 0,
    Normal = 1,
    Diffuse = 2,
    /// rgb 为 specular，a 为 roughness
    Specular = 3,
}

/// 一个 frame slot 独占的 target
pub struct SlotTargets {
    pub gbuffer: Vec<RenderTarget>,
    pub depth: RenderTarget,
}

/// 所有 pass 使用的 render target
///
/// G-buffer 和场景深度每个 frame slot 一份；shadow、模糊、AO 的 target 在 slot 之间共享，
/// 它们之间的先后关系由 bind / unbind 的 barrier 保证。
///
/// viewport 大小的 target 在 resize 之后通过 [`FrameTargets::rebuild`] 重建，shadow 相关的 target 尺寸固定。
pub struct FrameTargets {
    pub slots: Vec<SlotTargets>,

    /// 光源视角下的矩
    pub shadow: RenderTarget,
    pub shadow_depth: RenderTarget,
    /// 模糊的中间结果，[0] 同时是最终结果
    pub shadow_blur: [RenderTarget; 2],

    /// [1] 是 AO pass 的输出以及最终结果，[0] 是模糊的中间结果
    pub ao: [RenderTarget; 2],
}
// 描述
impl FrameTargets {
    pub fn gbuffer_desc(frame_label: FrameLabel, slot: usize, extent: vk::Extent2D) -> RenderTargetDesc {
        RenderTargetDesc::color(format!("gbuffer-{frame_label}-{slot}"), extent, RendererDefaults::GBUFFER_FORMAT)
    }

    pub fn depth_desc(frame_label: FrameLabel, extent: vk::Extent2D) -> RenderTargetDesc {
        RenderTargetDesc::depth(format!("depth-{frame_label}"), extent)
    }

    pub fn shadow_descs() -> [RenderTargetDesc; 4] {
        let extent = RendererDefaults::SHADOW_EXTENT;
        let format = RendererDefaults::SHADOW_FORMAT;
        [
            RenderTargetDesc::color("shadow", extent, format),
            RenderTargetDesc::depth("shadow-depth", extent),
            RenderTargetDesc::storage("shadow-blur-0", extent, format),
            RenderTargetDesc::storage("shadow-blur-1", extent, format),
        ]
    }

    pub fn ao_descs(extent: vk::Extent2D) -> [RenderTargetDesc; 2] {
        let format = RendererDefaults::AO_FORMAT;
        [
            RenderTargetDesc::storage("ao-0", extent, format),
            RenderTargetDesc::color("ao-1", extent, format).with_storage(),
        ]
    }
}
// new & rebuild
impl FrameTargets {
    pub fn new(extent: vk::Extent2D, tables: &mut DescriptorTables) -> GfxResult<Self> {
        let _span = tracy_client::span!("FrameTargets::new");

        let slots = FrameLabel::ALL
            .iter()
            .map(|label| {
                let gbuffer = (0..RendererDefaults::GBUFFER_COUNT)
                    .map(|slot| RenderTarget::new(Self::gbuffer_desc(*label, slot, extent), tables))
                    .collect::<GfxResult<Vec<_>>>()?;
                let depth = RenderTarget::new(Self::depth_desc(*label, extent), tables)?;
                Ok(SlotTargets { gbuffer, depth })
            })
            .collect::<GfxResult<Vec<_>>>()?;

        let [shadow, shadow_depth, blur_0, blur_1] = Self::shadow_descs();
        let shadow = RenderTarget::new(shadow, tables)?;
        let shadow_depth = RenderTarget::new(shadow_depth, tables)?;
        let shadow_blur = [RenderTarget::new(blur_0, tables)?, RenderTarget::new(blur_1, tables)?];

        let [ao_0, ao_1] = Self::ao_descs(extent);
        let ao = [RenderTarget::new(ao_0, tables)?, RenderTarget::new(ao_1, tables)?];

        Ok(Self {
            slots,
            shadow,
            shadow_depth,
            shadow_blur,
            ao,
        })
    }

    /// 重建所有 viewport 大小的 target，调用前需要等待所有 frame 完成
    pub fn rebuild(&mut self, extent: vk::Extent2D, tables: &mut DescriptorTables) -> GfxResult<()> {
        let _span = tracy_client::span!("FrameTargets::rebuild");
        for slot in &mut self.slots {
            for target in &mut slot.gbuffer {
                target.rebuild(extent, tables)?;
            }
            slot.depth.rebuild(extent, tables)?;
        }
        for target in &mut self.ao {
            target.rebuild(extent, tables)?;
        }
        Ok(())
    }

    pub fn destroy(self) {
        let Self {
            slots,
            shadow,
            shadow_depth,
            shadow_blur,
            ao,
        } = self;
        for slot in slots {
            slot.gbuffer.into_iter().for_each(RenderTarget::destroy);
            slot.depth.destroy();
        }
        shadow.destroy();
        shadow_depth.destroy();
        shadow_blur.into_iter().chain(ao).for_each(RenderTarget::destroy);
    }
}
// getters
impl FrameTargets {
    #[inline]
    pub fn slot(&self, frame_label: FrameLabel) -> &SlotTargets {
        &self.slots[*frame_label]
    }

    #[inline]
    pub fn slot_mut(&mut self, frame_label: FrameLabel) -> &mut SlotTargets {
        &mut self.slots[*frame_label]
    }

    /// G-buffer 中某个 target 在 bindless 表中的 index
    #[inline]
    pub fn gbuffer_index(&self, frame_label: FrameLabel, slot: GBufferSlot) -> u32 {
        self.slot(frame_label).gbuffer[slot as usize].read_index().0
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use umbra_render_interface::descriptor_table::DescriptorKind;

    use super::*;

    const VIEWPORT: vk::Extent2D = vk::Extent2D {
        width: 1920,
        height: 1080,
    };

    /// 所有 target 的描述，顺序与 [`FrameTargets::new`] 一致
    fn all_descs(extent: vk::Extent2D) -> Vec<RenderTargetDesc> {
        FrameLabel::ALL
            .iter()
            .flat_map(|label| {
                (0..RendererDefaults::GBUFFER_COUNT)
                    .map(move |slot| FrameTargets::gbuffer_desc(*label, slot, extent))
                    .chain(std::iter::once(FrameTargets::depth_desc(*label, extent)))
            })
            .chain(FrameTargets::shadow_descs())
            .chain(FrameTargets::ao_descs(extent))
            .collect_vec()
    }

    fn count(kind: DescriptorKind) -> usize {
        all_descs(VIEWPORT).iter().filter(|d| d.write_table() == kind).count()
    }

    #[test]
    fn attachments_fit_descriptor_tables() {
        let rtv = count(DescriptorKind::RenderTarget);
        let dsv = count(DescriptorKind::DepthStencil);
        assert_eq!(rtv, 10);
        assert!(rtv as u32 <= DescriptorKind::RenderTarget.capacity());
        assert_eq!(dsv as u32, DescriptorKind::DepthStencil.capacity());
    }

    #[test]
    fn names_are_unique() {
        let descs = all_descs(VIEWPORT);
        assert_eq!(descs.iter().map(|d| d.name.as_str()).unique().count(), descs.len());
        assert_eq!(descs.len(), 2 * 5 + 4 + 2);
    }

    #[test]
    fn shadow_targets_ignore_viewport() {
        let [shadow, depth, blur_0, blur_1] = FrameTargets::shadow_descs();
        for desc in [&shadow, &depth, &blur_0, &blur_1] {
            assert_eq!(desc.extent, RendererDefaults::SHADOW_EXTENT);
        }
        assert!(depth.is_depth());
        assert!(blur_0.storage && !blur_0.attachment);

        // AO 的最终结果既是 attachment 又会被 compute 写入
        let [ao_0, ao_1] = FrameTargets::ao_descs(VIEWPORT);
        assert!(ao_0.storage && !ao_0.attachment);
        assert!(ao_1.storage && ao_1.attachment);
        assert_eq!(ao_1.extent, VIEWPORT);
    }
}
