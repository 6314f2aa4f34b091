//! The seam between the lifecycle manager and the graphics driver.
//!
//! Every Vulkan call the context makes goes through [`Driver`]. The API owns
//! no lifetimes of its own, so the trait is deliberately flat: handles come
//! back from `create_*` calls and must be handed to the matching `destroy_*`
//! call exactly once. [`crate::teardown::Teardown`] is the only caller of the
//! destroy half.
//!
//! Handles passed into any method must have been produced by the same driver
//! instance. Implementations may treat foreign handles as undefined behaviour.

use std::ffi::CStr;

use ash::prelude::VkResult;
use ash::vk;

use crate::command::SubmitBatch;

/// Static properties of an adapter, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProperties {
    /// Device name.
    pub name: String,
    /// PCI vendor id.
    pub vendor_id: u32,
    /// Discrete, integrated, virtual, CPU...
    pub device_type: vk::PhysicalDeviceType,
    /// Highest supported Vulkan version.
    pub api_version: u32,
}

/// Driver calls used by the lifecycle manager.
///
/// The instance is considered created when the driver value exists; the
/// window/display binding is held by the driver until [`Driver::release_window`].
pub trait Driver {
    // Adapter queries. Read-only and repeatable.

    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>>;

    fn adapter_properties(&self, adapter: vk::PhysicalDevice) -> AdapterProperties;

    fn queue_family_properties(&self, adapter: vk::PhysicalDevice)
        -> Vec<vk::QueueFamilyProperties>;

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<String>>;

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    fn memory_properties(&self, adapter: vk::PhysicalDevice)
        -> vk::PhysicalDeviceMemoryProperties;

    // Instance-level objects.

    /// Install the validation hook.
    fn create_debug_messenger(&mut self) -> VkResult<vk::DebugUtilsMessengerEXT>;

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);

    /// Create a drawable surface for the bound window.
    fn create_surface(&mut self) -> VkResult<vk::SurfaceKHR>;

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);

    /// Drop the window/display binding.
    fn release_window(&mut self);

    /// Destroy the instance. The driver is unusable afterwards.
    fn destroy_instance(&mut self);

    // Logical device.

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        queues: &[vk::DeviceQueueCreateInfo<'_>],
        extensions: &[&CStr],
    ) -> VkResult<()>;

    /// Queue 0 of `queue_family` on the logical device.
    fn device_queue(&self, queue_family: u32) -> vk::Queue;

    fn device_wait_idle(&self) -> VkResult<()>;

    fn destroy_device(&mut self);

    // Presentation chain.

    fn create_swapchain(
        &mut self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR>;

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;

    /// Acquire the next image, signalling `semaphore`. Blocks without timeout.
    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)>;

    /// Present `image_index` once `wait` is signalled.
    fn queue_present(
        &mut self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool>;

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    // Images and memory.

    fn create_image(&mut self, info: &vk::ImageCreateInfo<'_>) -> VkResult<vk::Image>;

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;

    fn allocate_memory(&mut self, info: &vk::MemoryAllocateInfo<'_>)
        -> VkResult<vk::DeviceMemory>;

    fn bind_image_memory(&mut self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()>;

    fn create_image_view(&mut self, info: &vk::ImageViewCreateInfo<'_>)
        -> VkResult<vk::ImageView>;

    fn destroy_image_view(&mut self, view: vk::ImageView);

    fn destroy_image(&mut self, image: vk::Image);

    fn free_memory(&mut self, memory: vk::DeviceMemory);

    // Commands.

    fn create_command_pool(
        &mut self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool>;

    fn destroy_command_pool(&mut self, pool: vk::CommandPool);

    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer>;

    fn free_command_buffer(&mut self, pool: vk::CommandPool, command_buffer: vk::CommandBuffer);

    fn begin_command_buffer(
        &mut self,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()>;

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> VkResult<()>;

    fn cmd_image_barrier(
        &mut self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    );

    fn queue_submit(&mut self, queue: vk::Queue, batch: &SubmitBatch<'_>) -> VkResult<()>;

    fn queue_wait_idle(&mut self, queue: vk::Queue) -> VkResult<()>;

    // Synchronization.

    fn create_semaphore(&mut self) -> VkResult<vk::Semaphore>;

    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore);

    // Render targets.

    fn create_render_pass(&mut self, info: &vk::RenderPassCreateInfo<'_>)
        -> VkResult<vk::RenderPass>;

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass);

    fn create_framebuffer(
        &mut self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer>;

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer);
}
