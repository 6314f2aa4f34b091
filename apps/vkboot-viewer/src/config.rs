//! Viewer configuration file.
//!
//! ```toml
//! [window]
//! title = "vkboot"
//! width = 1600
//! height = 1200
//! position = [1200, 200]
//!
//! [presentation]
//! present_mode = "mailbox"   # fifo, fifo_relaxed, mailbox, immediate
//! image_count = 3
//! color_format = "b8g8r8a8_unorm"
//! depth_format = "d32_sfloat_s8_uint"
//!
//! [debug]
//! validation = true
//! log_filter = "info"
//! ```
//!
//! Every key is optional. Unknown mode or format names are rejected.

use std::path::Path;

use anyhow::Context;
use ash::vk;
use serde::{Deserialize, Serialize};
use vkboot_gpu::ContextConfig;
use vkboot_platform::PlatformConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub window: WindowSection,
    pub presentation: PresentationSection,
    pub debug: DebugSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Outer position; omit to let the OS place the window.
    pub position: Option<[i32; 2]>,
}

impl Default for WindowSection {
    fn default() -> Self {
        let platform = PlatformConfig::default();
        Self {
            title: platform.title,
            width: platform.width,
            height: platform.height,
            position: platform.position.map(|(x, y)| [x, y]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresentationSection {
    pub present_mode: PresentMode,
    pub image_count: u32,
    pub color_format: ColorFormat,
    pub depth_format: DepthFormat,
}

impl Default for PresentationSection {
    fn default() -> Self {
        Self {
            present_mode: PresentMode::Mailbox,
            image_count: vkboot_gpu::config::DEFAULT_IMAGE_COUNT,
            color_format: ColorFormat::B8g8r8a8Unorm,
            depth_format: DepthFormat::D32SfloatS8Uint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugSection {
    pub validation: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for DebugSection {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentMode {
    Fifo,
    FifoRelaxed,
    Mailbox,
    Immediate,
}

impl From<PresentMode> for vk::PresentModeKHR {
    fn from(mode: PresentMode) -> Self {
        match mode {
            PresentMode::Fifo => Self::FIFO,
            PresentMode::FifoRelaxed => Self::FIFO_RELAXED,
            PresentMode::Mailbox => Self::MAILBOX,
            PresentMode::Immediate => Self::IMMEDIATE,
        }
    }
}

/// Colour formats paired with the sRGB non-linear colour space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    B8g8r8a8Unorm,
    B8g8r8a8Srgb,
    R8g8b8a8Unorm,
    R8g8b8a8Srgb,
}

impl From<ColorFormat> for vk::Format {
    fn from(format: ColorFormat) -> Self {
        match format {
            ColorFormat::B8g8r8a8Unorm => Self::B8G8R8A8_UNORM,
            ColorFormat::B8g8r8a8Srgb => Self::B8G8R8A8_SRGB,
            ColorFormat::R8g8b8a8Unorm => Self::R8G8B8A8_UNORM,
            ColorFormat::R8g8b8a8Srgb => Self::R8G8B8A8_SRGB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    D32SfloatS8Uint,
    D24UnormS8Uint,
    D32Sfloat,
    D16Unorm,
}

impl From<DepthFormat> for vk::Format {
    fn from(format: DepthFormat) -> Self {
        match format {
            DepthFormat::D32SfloatS8Uint => Self::D32_SFLOAT_S8_UINT,
            DepthFormat::D24UnormS8Uint => Self::D24_UNORM_S8_UINT,
            DepthFormat::D32Sfloat => Self::D32_SFLOAT,
            DepthFormat::D16Unorm => Self::D16_UNORM,
        }
    }
}

impl ViewerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Invalid viewer configuration")
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In {}", path.display()))
    }

    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig::new(&self.window.title)
            .with_size(self.window.width, self.window.height)
            .with_position(self.window.position.map(|[x, y]| (x, y)))
    }

    pub fn context_config(&self) -> ContextConfig {
        let presentation = &self.presentation;
        ContextConfig::new(&self.window.title)
            .with_extent(self.window.width, self.window.height)
            .with_color_format(
                presentation.color_format.into(),
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )
            .with_depth_format(presentation.depth_format.into())
            .with_present_mode(presentation.present_mode.into())
            .with_image_count(presentation.image_count)
            .with_validation(self.debug.validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config, ViewerConfig::default());

        let context = config.context_config();
        assert_eq!(context.extent, vk::Extent2D { width: 1600, height: 1200 });
        assert_eq!(context.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(context.image_count, 3);
        assert_eq!(context.depth_format, vk::Format::D32_SFLOAT_S8_UINT);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ViewerConfig::from_toml(
            r#"
            [window]
            title = "demo"
            width = 800
            height = 600

            [presentation]
            present_mode = "fifo"
            image_count = 4
            color_format = "r8g8b8a8_srgb"

            [debug]
            validation = false
            "#,
        )
        .unwrap();

        let context = config.context_config();
        assert_eq!(context.app_name, "demo");
        assert_eq!(context.extent, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(context.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(context.image_count, 4);
        assert_eq!(context.color_format.format, vk::Format::R8G8B8A8_SRGB);
        assert!(!context.validation);

        let platform = config.platform_config();
        assert_eq!((platform.width, platform.height), (800, 600));
        assert_eq!(platform.position, Some((1200, 200)));
    }

    #[test]
    fn unknown_present_mode_is_rejected() {
        let err =
            ViewerConfig::from_toml("[presentation]\npresent_mode = \"vsync\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("vsync"), "{err:#}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ViewerConfig::from_toml("[window]\nfullscreen = true\n").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ViewerConfig::load(Path::new("/nonexistent/vkboot.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vkboot.toml"));
    }
}
