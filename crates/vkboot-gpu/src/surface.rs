//! Surface capability queries.

use ash::vk;

use crate::driver::Driver;
use crate::error::{Result, VkResultExt};

/// Inclusive range reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

/// Surface capabilities query result.
#[derive(Debug, Clone)]
pub struct SurfaceCapabilities {
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Image count range. A `max` of 0 means the surface sets no upper limit.
    pub image_count: Range<u32>,
    /// Image extent range.
    pub extent: Range<vk::Extent2D>,
    /// Current surface extent; `u32::MAX` in both axes when the swapchain decides.
    pub current_extent: vk::Extent2D,
    /// Transform to apply at present time.
    pub current_transform: vk::SurfaceTransformFlagsKHR,
}

impl SurfaceCapabilities {
    /// Assemble from the raw query results.
    pub fn from_raw(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        formats: Vec<vk::SurfaceFormatKHR>,
        present_modes: Vec<vk::PresentModeKHR>,
    ) -> Self {
        Self {
            formats,
            present_modes,
            image_count: Range {
                min: capabilities.min_image_count,
                max: capabilities.max_image_count,
            },
            extent: Range {
                min: capabilities.min_image_extent,
                max: capabilities.max_image_extent,
            },
            current_extent: capabilities.current_extent,
            current_transform: capabilities.current_transform,
        }
    }

    /// At least one format and one present mode are on offer.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

impl PartialEq for SurfaceCapabilities {
    fn eq(&self, other: &Self) -> bool {
        let pairs = |formats: &[vk::SurfaceFormatKHR]| {
            formats
                .iter()
                .map(|f| (f.format, f.color_space))
                .collect::<Vec<_>>()
        };

        pairs(&self.formats) == pairs(&other.formats)
            && self.present_modes == other.present_modes
            && self.image_count == other.image_count
            && self.extent == other.extent
            && self.current_extent == other.current_extent
            && self.current_transform == other.current_transform
    }
}

impl Eq for SurfaceCapabilities {}

/// Query what `surface` supports on `adapter`.
pub fn query_surface_capabilities<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceCapabilities> {
    let capabilities = driver
        .surface_capabilities(adapter, surface)
        .call("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
    let formats = driver
        .surface_formats(adapter, surface)
        .call("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
    let present_modes = driver
        .surface_present_modes(adapter, surface)
        .call("vkGetPhysicalDeviceSurfacePresentModesKHR")?;

    Ok(SurfaceCapabilities::from_raw(
        &capabilities,
        formats,
        present_modes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_capabilities() -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 4,
            min_image_extent: vk::Extent2D {
                width: 640,
                height: 480,
            },
            max_image_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn adequacy_needs_formats_and_modes() {
        let raw = raw_capabilities();
        let full = SurfaceCapabilities::from_raw(
            &raw,
            vec![format(vk::Format::B8G8R8A8_UNORM)],
            vec![vk::PresentModeKHR::MAILBOX],
        );
        assert!(full.is_adequate());

        let no_formats =
            SurfaceCapabilities::from_raw(&raw, vec![], vec![vk::PresentModeKHR::FIFO]);
        assert!(!no_formats.is_adequate());

        let no_modes =
            SurfaceCapabilities::from_raw(&raw, vec![format(vk::Format::B8G8R8A8_UNORM)], vec![]);
        assert!(!no_modes.is_adequate());
    }

    #[test]
    fn equality_compares_format_pairs() {
        let raw = raw_capabilities();
        let a = SurfaceCapabilities::from_raw(
            &raw,
            vec![format(vk::Format::B8G8R8A8_UNORM)],
            vec![vk::PresentModeKHR::MAILBOX],
        );
        let b = a.clone();
        let c = SurfaceCapabilities::from_raw(
            &raw,
            vec![format(vk::Format::R8G8B8A8_UNORM)],
            vec![vk::PresentModeKHR::MAILBOX],
        );

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.image_count, Range { min: 2, max: 4 });
    }
}
