//! Render pass and framebuffer derivation.
//!
//! The layout is a pure value computed from the negotiated formats; only
//! [`RenderTargets::create`] touches the driver.

use ash::vk;

use crate::driver::Driver;
use crate::error::{Result, VkResultExt};
use crate::teardown::{Resource, Teardown};

/// Attachment index of the colour target.
pub const COLOR_ATTACHMENT: u32 = 0;
/// Attachment index of the depth target.
pub const DEPTH_ATTACHMENT: u32 = 1;

/// Load/store behaviour and layouts of one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub format: vk::Format,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
    /// Layout during the subpass.
    pub subpass_layout: vk::ImageLayout,
}

impl AttachmentSpec {
    /// Cleared each pass, stored, handed to presentation.
    pub fn color(format: vk::Format) -> Self {
        Self {
            format,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            subpass_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }
    }

    /// Depth cleared and discarded; stencil cleared and kept.
    pub fn depth(format: vk::Format) -> Self {
        Self {
            format,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::DONT_CARE,
            stencil_load_op: vk::AttachmentLoadOp::CLEAR,
            stencil_store_op: vk::AttachmentStoreOp::STORE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            subpass_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        }
    }

    pub fn description(&self) -> vk::AttachmentDescription {
        vk::AttachmentDescription::default()
            .format(self.format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .stencil_load_op(self.stencil_load_op)
            .stencil_store_op(self.stencil_store_op)
            .initial_layout(self.initial_layout)
            .final_layout(self.final_layout)
    }
}

/// The single-subpass colour + depth layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetLayout {
    pub color: AttachmentSpec,
    pub depth: AttachmentSpec,
    pub extent: vk::Extent2D,
}

impl RenderTargetLayout {
    pub fn new(color_format: vk::Format, depth_format: vk::Format, extent: vk::Extent2D) -> Self {
        Self {
            color: AttachmentSpec::color(color_format),
            depth: AttachmentSpec::depth(depth_format),
            extent,
        }
    }

    /// Attachment descriptions in attachment-index order.
    pub fn attachments(&self) -> [vk::AttachmentDescription; 2] {
        [self.color.description(), self.depth.description()]
    }

    pub fn color_reference(&self) -> vk::AttachmentReference {
        vk::AttachmentReference {
            attachment: COLOR_ATTACHMENT,
            layout: self.color.subpass_layout,
        }
    }

    pub fn depth_reference(&self) -> vk::AttachmentReference {
        vk::AttachmentReference {
            attachment: DEPTH_ATTACHMENT,
            layout: self.depth.subpass_layout,
        }
    }

    /// External work must finish colour output before subpass 0 writes colour.
    pub fn dependency(&self) -> vk::SubpassDependency {
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
    }

    /// Create the render pass.
    pub fn create_render_pass<D: Driver + ?Sized>(&self, driver: &mut D) -> Result<vk::RenderPass> {
        let attachments = self.attachments();
        let color_refs = [self.color_reference()];
        let depth_ref = self.depth_reference();

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];
        let dependencies = [self.dependency()];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        driver
            .create_render_pass(&create_info)
            .call("vkCreateRenderPass")
    }

    /// Create a framebuffer over `[color_view, depth_view]`.
    pub fn create_framebuffer<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        render_pass: vk::RenderPass,
        color_view: vk::ImageView,
        depth_view: vk::ImageView,
    ) -> Result<vk::Framebuffer> {
        let attachments = [color_view, depth_view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(self.extent.width)
            .height(self.extent.height)
            .layers(1);

        driver
            .create_framebuffer(&create_info)
            .call("vkCreateFramebuffer")
    }
}

/// A render pass and one framebuffer per presentable image.
#[derive(Debug, Clone)]
pub struct RenderTargets {
    pub render_pass: vk::RenderPass,
    /// Indexed like the chain's images.
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl RenderTargets {
    /// Create the render pass and the framebuffers.
    pub fn create<D: Driver + ?Sized>(
        driver: &mut D,
        teardown: &mut Teardown,
        layout: &RenderTargetLayout,
        color_views: &[vk::ImageView],
        depth_view: vk::ImageView,
    ) -> Result<Self> {
        let render_pass = layout.create_render_pass(driver)?;
        teardown.push(Resource::RenderPass(render_pass));

        let framebuffers = Self::create_framebuffers(
            driver,
            teardown,
            layout,
            render_pass,
            color_views,
            depth_view,
        )?;

        Ok(Self {
            render_pass,
            framebuffers,
        })
    }

    /// Create one framebuffer per colour view against an existing pass.
    pub fn create_framebuffers<D: Driver + ?Sized>(
        driver: &mut D,
        teardown: &mut Teardown,
        layout: &RenderTargetLayout,
        render_pass: vk::RenderPass,
        color_views: &[vk::ImageView],
        depth_view: vk::ImageView,
    ) -> Result<Vec<vk::Framebuffer>> {
        let mut framebuffers = Vec::with_capacity(color_views.len());
        for &color_view in color_views {
            let framebuffer =
                layout.create_framebuffer(driver, render_pass, color_view, depth_view)?;
            teardown.push(Resource::Framebuffer(framebuffer));
            framebuffers.push(framebuffer);
        }
        Ok(framebuffers)
    }

    /// Framebuffer for chain image `image_index`.
    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> RenderTargetLayout {
        RenderTargetLayout::new(
            vk::Format::B8G8R8A8_UNORM,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Extent2D {
                width: 1600,
                height: 1200,
            },
        )
    }

    #[test]
    fn color_attachment_ends_presentable() {
        let color = layout().color;
        assert_eq!(color.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(color.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(color.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn depth_is_discarded_but_stencil_kept() {
        let depth = layout().depth;
        assert_eq!(depth.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(depth.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(depth.stencil_load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(depth.stencil_store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(
            depth.final_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn references_point_at_attachment_indices() {
        let layout = layout();
        assert_eq!(layout.color_reference().attachment, 0);
        assert_eq!(
            layout.color_reference().layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
        assert_eq!(layout.depth_reference().attachment, 1);

        let attachments = layout.attachments();
        assert_eq!(attachments[0].format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(attachments[1].format, vk::Format::D32_SFLOAT_S8_UINT);
    }

    #[test]
    fn external_dependency_guards_color_writes() {
        let dependency = layout().dependency();
        assert_eq!(dependency.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dependency.dst_subpass, 0);
        assert_eq!(
            dependency.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            dependency.dst_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
    }
}
