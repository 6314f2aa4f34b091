//! Platform layer for vkboot.
//!
//! Provides fixed-size native window creation via winit.

use std::sync::Arc;

use thiserror::Error;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Outer position in physical pixels; `None` leaves placement to the OS.
    pub position: Option<(i32, i32)>,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "vkboot".to_string(),
            width: 1600,
            height: 1200,
            position: Some((1200, 200)),
            resizable: false,
        }
    }
}

impl PlatformConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the window position.
    pub fn with_position(mut self, position: Option<(i32, i32)>) -> Self {
        self.position = position;
        self
    }

    /// Window attributes for this configuration.
    pub fn window_attributes(&self) -> WindowAttributes {
        let attributes = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(self.width, self.height))
            .with_resizable(self.resizable);

        match self.position {
            Some((x, y)) => attributes.with_position(PhysicalPosition::new(x, y)),
            None => attributes,
        }
    }
}

/// Create the application window.
///
/// The renderer's attachments are sized once, so the window is created
/// non-resizable unless the config says otherwise.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Arc<Window>> {
    let window = event_loop
        .create_window(config.window_attributes())
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    let size = window.inner_size();
    tracing::info!(
        "Created window \"{}\" ({}x{})",
        config.title,
        size.width,
        size.height
    );
    if size.width != config.width || size.height != config.height {
        tracing::warn!(
            "Window manager resized window to {}x{} (requested {}x{})",
            size.width,
            size.height,
            config.width,
            config.height
        );
    }

    Ok(Arc::new(window))
}

#[cfg(test)]
mod tests {
    use winit::dpi::{Position, Size};

    use super::*;

    #[test]
    fn defaults_are_fixed_size() {
        let config = PlatformConfig::default();
        assert_eq!((config.width, config.height), (1600, 1200));
        assert_eq!(config.position, Some((1200, 200)));
        assert!(!config.resizable);
    }

    #[test]
    fn attributes_follow_config() {
        let config = PlatformConfig::new("test").with_size(640, 480);
        let attributes = config.window_attributes();

        assert_eq!(attributes.title, "test");
        assert!(!attributes.resizable);
        assert_eq!(
            attributes.inner_size,
            Some(Size::Physical(PhysicalSize::new(640, 480)))
        );
        assert_eq!(
            attributes.position,
            Some(Position::Physical(PhysicalPosition::new(1200, 200)))
        );
    }

    #[test]
    fn position_can_be_left_to_the_os() {
        let attributes = PlatformConfig::default()
            .with_position(None)
            .window_attributes();
        assert_eq!(attributes.position, None);
    }
}
