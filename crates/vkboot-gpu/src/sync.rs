//! Synchronization primitives.

use ash::vk;

use crate::driver::Driver;
use crate::error::{Result, VkResultExt};

/// Create an unsignalled binary semaphore.
pub fn create_semaphore<D: Driver + ?Sized>(driver: &mut D) -> Result<vk::Semaphore> {
    driver.create_semaphore().call("vkCreateSemaphore")
}

/// The two semaphores gating one frame.
///
/// `image_available` is signalled by acquire and waited on before colour
/// output; `render_finished` is signalled by the graphics submission and
/// waited on by present. Both are reused every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
}

impl FrameSync {
    /// The pipeline stage that waits on `image_available`.
    pub const WAIT_STAGE: vk::PipelineStageFlags = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
}
