//! Presentation chain management.

use ash::vk;

use crate::driver::Driver;
use crate::error::{GpuError, Result, VkResultExt};
use crate::surface::{Range, SurfaceCapabilities};
use crate::teardown::{Resource, Teardown};

/// Require the exact format/colour-space pair among the surface's formats.
pub fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    desired: vk::SurfaceFormatKHR,
) -> Result<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| f.format == desired.format && f.color_space == desired.color_space)
        .copied()
        .ok_or(GpuError::SurfaceFormatUnsupported {
            format: desired.format,
            color_space: desired.color_space,
        })
}

/// Require `desired` among the surface's present modes. There is no fallback.
pub fn select_present_mode(
    available: &[vk::PresentModeKHR],
    desired: vk::PresentModeKHR,
) -> Result<vk::PresentModeKHR> {
    if available.contains(&desired) {
        Ok(desired)
    } else {
        Err(GpuError::PresentModeUnsupported(desired))
    }
}

/// Check `requested` against the surface's extent range, bounds inclusive.
pub fn validate_extent(
    range: &Range<vk::Extent2D>,
    requested: vk::Extent2D,
) -> Result<vk::Extent2D> {
    let fits = (range.min.width..=range.max.width).contains(&requested.width)
        && (range.min.height..=range.max.height).contains(&requested.height);

    if fits {
        Ok(requested)
    } else {
        Err(GpuError::ExtentOutOfRange {
            requested,
            min: range.min,
            max: range.max,
        })
    }
}

/// Check `requested` is strictly between the surface's image count bounds.
///
/// A reported maximum of 0 means no upper limit, so only the lower bound
/// applies then.
pub fn validate_image_count(range: &Range<u32>, requested: u32) -> Result<u32> {
    let above_min = requested > range.min;
    let below_max = range.max == 0 || requested < range.max;

    if above_min && below_max {
        Ok(requested)
    } else {
        Err(GpuError::ImageCountOutOfRange {
            requested,
            min: range.min,
            max: range.max,
        })
    }
}

/// Negotiated chain parameters, validated against one surface query.
#[derive(Debug, Clone, Copy)]
pub struct ChainParameters {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl ChainParameters {
    /// Apply every chain policy. The first violation is returned.
    pub fn negotiate(
        capabilities: &SurfaceCapabilities,
        color_format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        extent: vk::Extent2D,
        image_count: u32,
    ) -> Result<Self> {
        Ok(Self {
            surface_format: select_surface_format(&capabilities.formats, color_format)?,
            present_mode: select_present_mode(&capabilities.present_modes, present_mode)?,
            extent: validate_extent(&capabilities.extent, extent)?,
            image_count: validate_image_count(&capabilities.image_count, image_count)?,
            pre_transform: capabilities.current_transform,
        })
    }
}

/// Result of acquiring a chain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; `suboptimal` hints that recreation would help.
    Image { index: u32, suboptimal: bool },
    /// The chain no longer matches the surface and must be recreated.
    OutOfDate,
}

/// The presentable image chain and one colour view per image.
#[derive(Debug, Clone)]
pub struct PresentationChain {
    pub swapchain: vk::SwapchainKHR,
    /// Driver-owned images; destroyed with the swapchain.
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
}

impl PresentationChain {
    /// Create the swapchain and one colour view per image.
    ///
    /// Each handle is handed to `teardown` as soon as it exists, so a failure
    /// part way leaves nothing untracked.
    pub fn create<D: Driver + ?Sized>(
        driver: &mut D,
        teardown: &mut Teardown,
        surface: vk::SurfaceKHR,
        params: &ChainParameters,
    ) -> Result<Self> {
        let swapchain = Self::create_swapchain(driver, surface, params)?;
        teardown.push(Resource::Swapchain(swapchain));

        let images = Self::images(driver, swapchain, params.image_count)?;

        let format = params.surface_format.format;
        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            let view = create_color_view(driver, image, format)?;
            teardown.push(Resource::ColorView(view));
            image_views.push(view);
        }

        tracing::info!(
            "Created swapchain: {}x{}, {} images, {:?}, {:?}",
            params.extent.width,
            params.extent.height,
            images.len(),
            format,
            params.present_mode
        );

        Ok(Self {
            swapchain,
            images,
            image_views,
            format,
            extent: params.extent,
            present_mode: params.present_mode,
        })
    }

    /// Create the swapchain from negotiated parameters.
    ///
    /// Images and views are fetched separately so each step's handles can be
    /// registered for teardown as soon as they exist.
    pub fn create_swapchain<D: Driver + ?Sized>(
        driver: &mut D,
        surface: vk::SurfaceKHR,
        params: &ChainParameters,
    ) -> Result<vk::SwapchainKHR> {
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(params.image_count)
            .image_format(params.surface_format.format)
            .image_color_space(params.surface_format.color_space)
            .image_extent(params.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(params.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(params.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        driver
            .create_swapchain(&create_info)
            .call("vkCreateSwapchainKHR")
    }

    /// Fetch the chain's images and check the driver honoured the count.
    pub fn images<D: Driver + ?Sized>(
        driver: &D,
        swapchain: vk::SwapchainKHR,
        expected: u32,
    ) -> Result<Vec<vk::Image>> {
        let images = driver
            .swapchain_images(swapchain)
            .call("vkGetSwapchainImagesKHR")?;

        let actual = u32::try_from(images.len()).unwrap_or(u32::MAX);
        if actual != expected {
            return Err(GpuError::ImageCountMismatch { expected, actual });
        }

        Ok(images)
    }

    /// Number of images in the chain.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the chain has no images.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Acquire the next image, signalling `image_available`.
    pub fn acquire<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        image_available: vk::Semaphore,
    ) -> Result<AcquireOutcome> {
        match driver.acquire_next_image(self.swapchain, image_available) {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Image { index, suboptimal }),
            // No image was acquired; the caller must recreate the chain.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(e).call("vkAcquireNextImageKHR"),
        }
    }

    /// Present `image_index` once `render_finished` is signalled.
    ///
    /// Returns `true` when the chain should be recreated.
    pub fn present<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        queue: vk::Queue,
        image_index: u32,
        render_finished: vk::Semaphore,
    ) -> Result<bool> {
        match driver.queue_present(queue, self.swapchain, image_index, render_finished) {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(e).call("vkQueuePresentKHR"),
        }
    }
}

/// Create an identity-swizzled 2-D view of one mip level and layer.
pub fn create_view<D: Driver + ?Sized>(
    driver: &mut D,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    driver
        .create_image_view(&view_info)
        .call("vkCreateImageView")
}

/// Create a colour view of one chain image.
pub fn create_color_view<D: Driver + ?Sized>(
    driver: &mut D,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    create_view(driver, image, format, vk::ImageAspectFlags::COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BGRA_SRGB: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn format_requires_both_format_and_color_space() {
        let available = [BGRA_SRGB];
        assert!(select_surface_format(&available, BGRA_SRGB).is_ok());

        // Same colour space, different format.
        let desired = vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        assert!(matches!(
            select_surface_format(&available, desired),
            Err(GpuError::SurfaceFormatUnsupported { .. })
        ));

        // Same format, different colour space.
        let desired = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
        };
        assert!(select_surface_format(&available, desired).is_err());
    }

    #[test]
    fn format_search_scans_whole_list() {
        let available = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            BGRA_SRGB,
        ];
        let chosen = select_surface_format(&available, BGRA_SRGB).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn present_mode_has_no_fallback() {
        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert!(matches!(
            select_present_mode(&available, vk::PresentModeKHR::MAILBOX),
            Err(GpuError::PresentModeUnsupported(vk::PresentModeKHR::MAILBOX))
        ));

        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            select_present_mode(&available, vk::PresentModeKHR::MAILBOX).unwrap(),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn extent_bounds_are_inclusive() {
        let range = Range {
            min: extent(640, 480),
            max: extent(1920, 1080),
        };

        assert!(validate_extent(&range, extent(640, 480)).is_ok());
        assert!(validate_extent(&range, extent(1920, 1080)).is_ok());
        assert!(validate_extent(&range, extent(640, 1080)).is_ok());
        assert!(validate_extent(&range, extent(1280, 720)).is_ok());

        assert!(validate_extent(&range, extent(639, 480)).is_err());
        assert!(validate_extent(&range, extent(640, 479)).is_err());
        assert!(validate_extent(&range, extent(1921, 1080)).is_err());
        assert!(matches!(
            validate_extent(&range, extent(1600, 1200)),
            Err(GpuError::ExtentOutOfRange { .. })
        ));
    }

    #[test]
    fn image_count_bounds_are_strict() {
        let range = Range { min: 2, max: 4 };
        assert_eq!(validate_image_count(&range, 3).unwrap(), 3);
        assert!(validate_image_count(&range, 2).is_err());
        assert!(validate_image_count(&range, 4).is_err());
        assert!(validate_image_count(&range, 1).is_err());
        assert!(validate_image_count(&range, 5).is_err());

        // max == 3 rejects a request of 3.
        let range = Range { min: 2, max: 3 };
        assert!(matches!(
            validate_image_count(&range, 3),
            Err(GpuError::ImageCountOutOfRange {
                requested: 3,
                min: 2,
                max: 3
            })
        ));
    }

    #[test]
    fn unbounded_image_count_only_checks_minimum() {
        let range = Range { min: 2, max: 0 };
        assert!(validate_image_count(&range, 3).is_ok());
        assert!(validate_image_count(&range, 16).is_ok());
        assert!(validate_image_count(&range, 2).is_err());
    }
}
