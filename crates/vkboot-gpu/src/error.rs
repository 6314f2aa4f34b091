//! GPU error types.

use std::panic::Location;

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
///
/// Every variant is fatal for the context that produced it: there is no
/// partially usable state after a failed setup step.
#[derive(Error, Debug)]
pub enum GpuError {
    /// A driver call returned a non-success status.
    #[error(
        "{call} failed with {result} ({result:?} = {code}) at {location}",
        code = .result.as_raw()
    )]
    Driver {
        call: &'static str,
        result: vk::Result,
        location: &'static Location<'static>,
    },

    /// The Vulkan loader could not be loaded.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// The instance lacks something the platform needs.
    #[error("Missing instance support: {0}")]
    MissingInstanceSupport(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// No adapter passed every suitability check.
    #[error("No suitable GPU found")]
    NoSuitableAdapter,

    /// Logical device creation failed.
    #[error("Device creation failed: {0} ({code})", code = .0.as_raw())]
    DeviceCreation(vk::Result),

    /// No memory type matches the resource's type bits and property flags.
    #[error("No memory type in bits {type_bits:#b} has {required:?}")]
    NoSuitableMemoryType {
        type_bits: u32,
        required: vk::MemoryPropertyFlags,
    },

    /// The surface does not report the requested format/colour space pair.
    #[error("Surface format {format:?} / {color_space:?} not supported")]
    SurfaceFormatUnsupported {
        format: vk::Format,
        color_space: vk::ColorSpaceKHR,
    },

    /// The surface does not offer the requested present mode.
    #[error("Present mode {0:?} not supported")]
    PresentModeUnsupported(vk::PresentModeKHR),

    /// Requested extent lies outside the surface's extent range.
    #[error(
        "Extent {}x{} outside surface range {}x{}..={}x{}",
        .requested.width, .requested.height, .min.width, .min.height, .max.width, .max.height
    )]
    ExtentOutOfRange {
        requested: vk::Extent2D,
        min: vk::Extent2D,
        max: vk::Extent2D,
    },

    /// Requested image count is not strictly inside the surface's range.
    #[error("Image count {requested} not strictly between {min} and {max}")]
    ImageCountOutOfRange { requested: u32, min: u32, max: u32 },

    /// The driver returned a different number of chain images than requested.
    #[error("Swapchain returned {actual} images, expected {expected}")]
    ImageCountMismatch { expected: u32, actual: u32 },

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Attaches the API call name and call site to a raw driver status.
pub trait VkResultExt<T> {
    /// Convert a driver status into a [`GpuError::Driver`] naming `call`.
    fn call(self, call: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    #[track_caller]
    fn call(self, call: &'static str) -> Result<T> {
        let location = Location::caller();
        self.map_err(|result| GpuError::Driver {
            call,
            result,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_names_call_and_site() {
        let result: std::result::Result<(), vk::Result> =
            Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        let err = result.call("vkCreateImage").unwrap_err();

        let message = err.to_string();
        assert!(message.contains("vkCreateImage"));
        assert!(message.contains(file!()));
        assert!(message.contains(&vk::Result::ERROR_OUT_OF_DEVICE_MEMORY.as_raw().to_string()));
    }

    #[test]
    fn success_passes_through() {
        let result: std::result::Result<u32, vk::Result> = Ok(7);
        assert_eq!(result.call("vkNothing").unwrap(), 7);
    }
}
