//! Context configuration.

use ash::vk;

/// Default window extent.
pub const DEFAULT_EXTENT: vk::Extent2D = vk::Extent2D {
    width: 1600,
    height: 1200,
};

/// Default number of presentable images.
pub const DEFAULT_IMAGE_COUNT: u32 = 3;

/// Everything the context negotiates with the surface and device.
///
/// Every option has a default; builders override only what differs.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Application name reported to the driver.
    pub app_name: String,
    /// Window extent; must lie inside the surface's extent range.
    pub extent: vk::Extent2D,
    /// Colour attachment format and colour space; both must be reported.
    pub color_format: vk::SurfaceFormatKHR,
    /// Depth attachment format.
    pub depth_format: vk::Format,
    /// Required present mode. There is no fallback.
    pub present_mode: vk::PresentModeKHR,
    /// Presentable image count; must be strictly inside the surface's range.
    pub image_count: u32,
    /// Device extensions every candidate adapter must expose.
    pub required_extensions: Vec<String>,
    /// Install the validation layer and debug hook.
    pub validation: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "vkboot".to_string(),
            extent: DEFAULT_EXTENT,
            color_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            depth_format: vk::Format::D32_SFLOAT_S8_UINT,
            present_mode: vk::PresentModeKHR::MAILBOX,
            image_count: DEFAULT_IMAGE_COUNT,
            required_extensions: vec![swapchain_extension_name()],
            validation: cfg!(debug_assertions),
        }
    }
}

impl ContextConfig {
    /// Create a new config with the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Set the window extent.
    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.extent = vk::Extent2D { width, height };
        self
    }

    /// Set the colour format and colour space.
    pub fn with_color_format(mut self, format: vk::Format, color_space: vk::ColorSpaceKHR) -> Self {
        self.color_format = vk::SurfaceFormatKHR {
            format,
            color_space,
        };
        self
    }

    /// Set the depth format.
    pub fn with_depth_format(mut self, format: vk::Format) -> Self {
        self.depth_format = format;
        self
    }

    /// Set the required present mode.
    pub fn with_present_mode(mut self, mode: vk::PresentModeKHR) -> Self {
        self.present_mode = mode;
        self
    }

    /// Set the presentable image count.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }

    /// Replace the required device extensions.
    pub fn with_required_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable validation.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }
}

/// `VK_KHR_swapchain`.
pub fn swapchain_extension_name() -> String {
    ash::khr::swapchain::NAME.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.extent, DEFAULT_EXTENT);
        assert_eq!(config.image_count, 3);
        assert_eq!(config.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.required_extensions, vec!["VK_KHR_swapchain".to_string()]);
    }

    #[test]
    fn builder_overrides() {
        let config = ContextConfig::new("test")
            .with_extent(640, 480)
            .with_image_count(2)
            .with_present_mode(vk::PresentModeKHR::FIFO)
            .with_depth_format(vk::Format::D24_UNORM_S8_UINT)
            .with_required_extensions(["VK_KHR_swapchain", "VK_KHR_maintenance1"])
            .with_validation(false);

        assert_eq!(config.app_name, "test");
        assert_eq!(config.extent.width, 640);
        assert_eq!(config.extent.height, 480);
        assert_eq!(config.image_count, 2);
        assert_eq!(config.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(config.depth_format, vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(config.required_extensions.len(), 2);
        assert!(!config.validation);
    }
}
