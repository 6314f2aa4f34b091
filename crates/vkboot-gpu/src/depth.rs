//! Depth attachment and device memory selection.

use ash::vk;

use crate::command::{execute_one_shot, CommandPool};
use crate::driver::Driver;
use crate::error::{GpuError, Result, VkResultExt};
use crate::swapchain::create_view;
use crate::teardown::{Resource, Teardown};

/// Index of the first memory type allowed by `type_bits` that has every flag
/// in `required`.
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32> {
    let count = properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count)
        .find(|&index| {
            type_bits & (1 << index) != 0
                && properties.memory_types[index as usize]
                    .property_flags
                    .contains(required)
        })
        .ok_or(GpuError::NoSuitableMemoryType {
            type_bits,
            required,
        })
}

/// Whether `format` has a stencil component.
pub fn has_stencil(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::S8_UINT
    )
}

/// Aspects a depth view or barrier covers for `format`.
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    if has_stencil(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}

/// The barrier moving a fresh depth image into attachment layout.
pub fn depth_transition_barrier(
    image: vk::Image,
    format: vk::Format,
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier::default()
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(depth_aspect(format))
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
}

/// Depth/stencil image, its memory and its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthAttachment {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

impl DepthAttachment {
    /// Create the attachment at `extent` and move it into
    /// `DEPTH_STENCIL_ATTACHMENT_OPTIMAL`.
    ///
    /// The layout transition is submitted on `queue` through `pool` and has
    /// completed before the view is created.
    pub fn create<D: Driver + ?Sized>(
        driver: &mut D,
        teardown: &mut Teardown,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        pool: &CommandPool,
        queue: vk::Queue,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = driver.create_image(&image_info).call("vkCreateImage")?;
        teardown.push(Resource::DepthImage(image));

        let requirements = driver.image_memory_requirements(image);
        let memory_type = find_memory_type(
            memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);

        let memory = driver
            .allocate_memory(&alloc_info)
            .call("vkAllocateMemory")?;
        teardown.push(Resource::DepthMemory(memory));

        driver
            .bind_image_memory(image, memory)
            .call("vkBindImageMemory")?;

        let barrier = depth_transition_barrier(image, format);
        execute_one_shot(driver, pool, queue, |cmd| {
            cmd.image_barrier(
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                &barrier,
            );
        })?;

        let view = create_view(driver, image, format, depth_aspect(format))?;
        teardown.push(Resource::DepthView(view));

        tracing::debug!(
            "Created depth attachment: {}x{} {:?}, {} bytes in memory type {memory_type}",
            extent.width,
            extent.height,
            format,
            requirements.size
        );

        Ok(Self {
            image,
            memory,
            view,
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (slot, &property_flags) in properties.memory_types.iter_mut().zip(flags) {
            slot.property_flags = property_flags;
        }
        properties
    }

    #[test]
    fn finds_first_allowed_type_with_flags() {
        let props = properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);

        assert_eq!(
            find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(),
            1
        );
        // Type 1 is excluded by the bit mask.
        assert_eq!(
            find_memory_type(&props, 0b101, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(),
            2
        );
    }

    #[test]
    fn missing_memory_type_is_an_error() {
        let props = properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);
        assert!(matches!(
            find_memory_type(&props, 0b1, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Err(GpuError::NoSuitableMemoryType { type_bits: 1, .. })
        ));
    }

    #[test]
    fn bits_beyond_type_count_are_ignored() {
        let props = properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);
        assert!(find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::empty()).is_err());
    }

    #[test]
    fn stencil_formats_get_stencil_aspect() {
        assert_eq!(
            depth_aspect(vk::Format::D32_SFLOAT_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(
            depth_aspect(vk::Format::D32_SFLOAT),
            vk::ImageAspectFlags::DEPTH
        );
    }

    #[test]
    fn transition_barrier_layouts() {
        let barrier = depth_transition_barrier(vk::Image::null(), vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.new_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.subresource_range.level_count, 1);
        assert!(barrier
            .subresource_range
            .aspect_mask
            .contains(vk::ImageAspectFlags::STENCIL));
    }
}
