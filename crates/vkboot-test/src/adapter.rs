//! Simulated adapters.

use ash::vk;

/// One simulated queue family.
#[derive(Debug, Clone, Copy)]
pub struct MockQueueFamily {
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    /// Whether the family can present to the test surface.
    pub present: bool,
}

impl MockQueueFamily {
    pub fn new(flags: vk::QueueFlags, present: bool) -> Self {
        Self {
            flags,
            queue_count: 1,
            present,
        }
    }

    /// Graphics, compute and transfer on one presentable family.
    pub fn universal() -> Self {
        Self::new(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            true,
        )
    }
}

/// A simulated physical device and what its surface reports.
///
/// The default is a single universal queue family, `VK_KHR_swapchain`, a
/// 2..8 image range, a 1x1..4096x4096 extent range, `B8G8R8A8_UNORM` in
/// sRGB and both FIFO and MAILBOX, which satisfies the default context
/// configuration.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    pub name: String,
    pub vendor_id: u32,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub queue_families: Vec<MockQueueFamily>,
    pub extensions: Vec<String>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub memory_types: Vec<vk::MemoryPropertyFlags>,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self {
            name: "Mock GPU".to_string(),
            vendor_id: 0x10DE,
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            api_version: vk::API_VERSION_1_0,
            queue_families: vec![MockQueueFamily::universal()],
            extensions: vec!["VK_KHR_swapchain".to_string()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 1600,
                    height: 1200,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            memory_types: vec![
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            ],
        }
    }
}

impl MockAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_device_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_queue_families(mut self, families: Vec<MockQueueFamily>) -> Self {
        self.queue_families = families;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_count_range(mut self, min: u32, max: u32) -> Self {
        self.capabilities.min_image_count = min;
        self.capabilities.max_image_count = max;
        self
    }

    pub fn with_extent_range(mut self, min: (u32, u32), max: (u32, u32)) -> Self {
        self.capabilities.min_image_extent = vk::Extent2D {
            width: min.0,
            height: min.1,
        };
        self.capabilities.max_image_extent = vk::Extent2D {
            width: max.0,
            height: max.1,
        };
        self
    }

    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }

    pub fn with_memory_types(mut self, types: Vec<vk::MemoryPropertyFlags>) -> Self {
        self.memory_types = types;
        self
    }

    pub(crate) fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: u32::try_from(self.memory_types.len()).unwrap_or(0),
            memory_heap_count: 1,
            ..Default::default()
        };
        properties.memory_heaps[0] = vk::MemoryHeap {
            size: 8 << 30,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };
        for (slot, &flags) in properties.memory_types.iter_mut().zip(&self.memory_types) {
            *slot = vk::MemoryType {
                property_flags: flags,
                heap_index: 0,
            };
        }
        properties
    }

    pub(crate) fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        self.queue_families
            .iter()
            .map(|family| vk::QueueFamilyProperties {
                queue_flags: family.flags,
                queue_count: family.queue_count,
                ..Default::default()
            })
            .collect()
    }
}
