//! [`Driver`] over a real Vulkan loader.

use std::ffi::{c_char, c_void, CStr, CString};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::command::SubmitBatch;
use crate::config::ContextConfig;
use crate::driver::{AdapterProperties, Driver};
use crate::error::{GpuError, Result, VkResultExt};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// A window a surface can be created for.
pub trait WindowTarget: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T: HasWindowHandle + HasDisplayHandle + Send + Sync> WindowTarget for T {}

/// Instance creation options.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub app_name: String,
    /// Enable the Khronos validation layer and the debug messenger extension.
    pub validation: bool,
}

impl From<&ContextConfig> for InstanceConfig {
    fn from(config: &ContextConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            validation: config.validation,
        }
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    // SAFETY: the loader passes valid callback data for the duration of the
    // call; p_message may still be null.
    let message = unsafe {
        p_callback_data
            .as_ref()
            .filter(|data| !data.p_message.is_null())
            .map_or_else(
                || "<no message>".into(),
                |data| CStr::from_ptr(data.p_message).to_string_lossy(),
            )
    };

    let kind = message_kind(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        // SAFETY: user data is the counter owned by the driver, which outlives
        // the messenger.
        if let Some(errors) = unsafe { p_user_data.cast::<AtomicU32>().as_ref() } {
            errors.fetch_add(1, Ordering::Relaxed);
        }
        tracing::error!(target: "vkboot::validation", "[{kind}] {message}");
    } else {
        // The messenger subscribes to ERROR and WARNING only.
        tracing::warn!(target: "vkboot::validation", "[{kind}] {message}");
    }

    vk::FALSE
}

/// Label for a message's type flags; the most specific set bit wins.
fn message_kind(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL) {
        "general"
    } else {
        "other"
    }
}

/// Pick the validation layer if the loader offers it.
///
/// # Safety
/// `entry` must be a loaded Vulkan entry point.
unsafe fn validation_layers(entry: &ash::Entry, requested: bool) -> Result<Vec<&'static CStr>> {
    if !requested {
        return Ok(Vec::new());
    }

    let available = entry
        .enumerate_instance_layer_properties()
        .call("vkEnumerateInstanceLayerProperties")?;
    let found = available
        .iter()
        .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));

    if found {
        Ok(vec![VALIDATION_LAYER])
    } else {
        tracing::warn!(
            "Validation layer {} not available",
            VALIDATION_LAYER.to_string_lossy()
        );
        Ok(Vec::new())
    }
}

/// Vulkan loader, instance and (once created) logical device.
pub struct AshDriver {
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    window: Option<Arc<dyn WindowTarget>>,
    device: Option<ash::Device>,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
    validation_errors: Arc<AtomicU32>,
    instance_destroyed: bool,
}

impl AshDriver {
    /// Load the Vulkan loader and create an instance able to present to `window`.
    pub fn new(config: &InstanceConfig, window: Arc<dyn WindowTarget>) -> Result<Self> {
        // SAFETY: loading the system loader has no preconditions beyond the
        // library being a conforming Vulkan loader.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let mut extensions: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(display.as_raw())
                .map_err(|e| GpuError::MissingInstanceSupport(format!("surface extensions: {e}")))?
                .to_vec();
        if config.validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }
        #[cfg(target_os = "macos")]
        extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());

        // SAFETY: entry was loaded above.
        let layers = unsafe { validation_layers(&entry, config.validation) }?;
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let app_name = CString::new(config.app_name.as_str())
            .map_err(|e| GpuError::InvalidState(format!("Application name contains NUL: {e}")))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"vkboot")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        // SAFETY: every pointer in create_info outlives the call.
        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| match e {
                vk::Result::ERROR_EXTENSION_NOT_PRESENT | vk::Result::ERROR_LAYER_NOT_PRESENT => {
                    GpuError::MissingInstanceSupport(format!("instance creation: {e}"))
                }
                e => GpuError::Driver {
                    call: "vkCreateInstance",
                    result: e,
                    location: std::panic::Location::caller(),
                },
            })?;

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let debug_utils = config
            .validation
            .then(|| ash::ext::debug_utils::Instance::new(&entry, &instance));

        tracing::info!(
            "Vulkan instance created (validation: {})",
            !layers.is_empty()
        );

        Ok(Self {
            entry,
            instance,
            surface_loader,
            debug_utils,
            window: Some(window),
            device: None,
            swapchain_loader: None,
            validation_errors: Arc::new(AtomicU32::new(0)),
            instance_destroyed: false,
        })
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the logical device, once created.
    pub fn device(&self) -> Option<&ash::Device> {
        self.device.as_ref()
    }

    /// Number of error-severity validation messages seen so far.
    pub fn validation_error_count(&self) -> u32 {
        self.validation_errors.load(Ordering::Relaxed)
    }

    fn live_device(&self) -> VkResult<&ash::Device> {
        self.device.as_ref().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn live_swapchain_loader(&self) -> VkResult<&ash::khr::swapchain::Device> {
        self.swapchain_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

impl Driver for AshDriver {
    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        // SAFETY: the instance is live until destroy_instance.
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn adapter_properties(&self, adapter: vk::PhysicalDevice) -> AdapterProperties {
        // SAFETY: adapter came from enumerate_adapters on this instance.
        let properties = unsafe { self.instance.get_physical_device_properties(adapter) };
        let name = properties
            .device_name_as_c_str()
            .map_or_else(|_| "<unnamed>".to_string(), |n| n.to_string_lossy().into_owned());

        AdapterProperties {
            name,
            vendor_id: properties.vendor_id,
            device_type: properties.device_type,
            api_version: properties.api_version,
        }
    }

    fn queue_family_properties(
        &self,
        adapter: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        // SAFETY: adapter belongs to this instance.
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(adapter)
        }
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        // SAFETY: adapter and surface belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(adapter, queue_family, surface)
        }
    }

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        // SAFETY: adapter belongs to this instance.
        let extensions = unsafe { self.instance.enumerate_device_extension_properties(adapter) }?;
        Ok(extensions
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        // SAFETY: adapter and surface belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(adapter, surface)
        }
    }

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        // SAFETY: adapter and surface belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(adapter, surface)
        }
    }

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        // SAFETY: adapter and surface belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(adapter, surface)
        }
    }

    fn memory_properties(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceMemoryProperties {
        // SAFETY: adapter belongs to this instance.
        unsafe { self.instance.get_physical_device_memory_properties(adapter) }
    }

    fn create_debug_messenger(&mut self) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let debug_utils = self
            .debug_utils
            .as_ref()
            .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback))
            .user_data(Arc::as_ptr(&self.validation_errors).cast_mut().cast());

        // SAFETY: the counter behind user_data lives as long as self.
        unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(debug_utils) = &self.debug_utils {
            // SAFETY: messenger was created by this loader and is destroyed once.
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn create_surface(&mut self) -> VkResult<vk::SurfaceKHR> {
        let window = self
            .window
            .as_ref()
            .ok_or(vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR)?;

        let handles = window.display_handle().and_then(|display| {
            window
                .window_handle()
                .map(|handle| (display.as_raw(), handle.as_raw()))
        });
        let (display, handle) = handles.map_err(|e| {
            tracing::error!("Window handles unavailable: {e}");
            vk::Result::ERROR_INITIALIZATION_FAILED
        })?;

        // SAFETY: the window is kept alive until release_window, which the
        // teardown order places after destroy_surface.
        unsafe { ash_window::create_surface(&self.entry, &self.instance, display, handle, None) }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        // SAFETY: no swapchain references the surface at this stage.
        unsafe { self.surface_loader.destroy_surface(surface, None) };
    }

    fn release_window(&mut self) {
        self.window = None;
    }

    fn destroy_instance(&mut self) {
        if self.instance_destroyed {
            return;
        }
        // SAFETY: every child object has been destroyed by now.
        unsafe { self.instance.destroy_instance(None) };
        self.instance_destroyed = true;
    }

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        queues: &[vk::DeviceQueueCreateInfo<'_>],
        extensions: &[&CStr],
    ) -> VkResult<()> {
        let extension_names: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let features = vk::PhysicalDeviceFeatures::default();
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(queues)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        // SAFETY: adapter belongs to this instance; create_info outlives the call.
        let device = unsafe { self.instance.create_device(adapter, &create_info, None) }?;
        self.swapchain_loader = Some(ash::khr::swapchain::Device::new(&self.instance, &device));
        self.device = Some(device);
        Ok(())
    }

    fn device_queue(&self, queue_family: u32) -> vk::Queue {
        match &self.device {
            // SAFETY: one queue was requested for every family the context uses.
            Some(device) => unsafe { device.get_device_queue(queue_family, 0) },
            None => vk::Queue::null(),
        }
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        // SAFETY: the device is live while Some.
        unsafe { self.live_device()?.device_wait_idle() }
    }

    fn destroy_device(&mut self) {
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            // SAFETY: all device children are destroyed before this stage.
            unsafe { device.destroy_device(None) };
        }
    }

    fn create_swapchain(
        &mut self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        // SAFETY: info references a live surface of this instance.
        unsafe { self.live_swapchain_loader()?.create_swapchain(info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        // SAFETY: swapchain was created by this loader.
        unsafe { self.live_swapchain_loader()?.get_swapchain_images(swapchain) }
    }

    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        // SAFETY: swapchain and semaphore belong to this device.
        unsafe {
            self.live_swapchain_loader()?.acquire_next_image(
                swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
    }

    fn queue_present(
        &mut self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        // SAFETY: queue, swapchain and semaphore belong to this device.
        unsafe { self.live_swapchain_loader()?.queue_present(queue, &present_info) }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Some(loader) = &self.swapchain_loader {
            // SAFETY: the chain's views are destroyed before this stage.
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image(&mut self, info: &vk::ImageCreateInfo<'_>) -> VkResult<vk::Image> {
        // SAFETY: info is a valid create-info.
        unsafe { self.live_device()?.create_image(info, None) }
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        match &self.device {
            // SAFETY: image belongs to this device.
            Some(device) => unsafe { device.get_image_memory_requirements(image) },
            None => vk::MemoryRequirements::default(),
        }
    }

    fn allocate_memory(
        &mut self,
        info: &vk::MemoryAllocateInfo<'_>,
    ) -> VkResult<vk::DeviceMemory> {
        // SAFETY: the memory type index came from this adapter's properties.
        unsafe { self.live_device()?.allocate_memory(info, None) }
    }

    fn bind_image_memory(&mut self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()> {
        // SAFETY: memory was sized for image; each image is bound once.
        unsafe { self.live_device()?.bind_image_memory(image, memory, 0) }
    }

    fn create_image_view(
        &mut self,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        // SAFETY: info references an image of this device.
        unsafe { self.live_device()?.create_image_view(info, None) }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Some(device) = &self.device {
            // SAFETY: framebuffers using the view are destroyed before this stage.
            unsafe { device.destroy_image_view(view, None) };
        }
    }

    fn destroy_image(&mut self, image: vk::Image) {
        if let Some(device) = &self.device {
            // SAFETY: the image's views are destroyed before this stage.
            unsafe { device.destroy_image(image, None) };
        }
    }

    fn free_memory(&mut self, memory: vk::DeviceMemory) {
        if let Some(device) = &self.device {
            // SAFETY: the bound image is destroyed before this stage.
            unsafe { device.free_memory(memory, None) };
        }
    }

    fn create_command_pool(
        &mut self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool> {
        // SAFETY: info names a queue family of this device.
        unsafe { self.live_device()?.create_command_pool(info, None) }
    }

    fn destroy_command_pool(&mut self, pool: vk::CommandPool) {
        if let Some(device) = &self.device {
            // SAFETY: the device is idle before teardown.
            unsafe { device.destroy_command_pool(pool, None) };
        }
    }

    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        // SAFETY: pool belongs to this device.
        let buffers = unsafe { self.live_device()?.allocate_command_buffers(&alloc_info) }?;
        buffers
            .into_iter()
            .next()
            .ok_or(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
    }

    fn free_command_buffer(&mut self, pool: vk::CommandPool, command_buffer: vk::CommandBuffer) {
        if let Some(device) = &self.device {
            // SAFETY: the buffer is not pending execution.
            unsafe { device.free_command_buffers(pool, &[command_buffer]) };
        }
    }

    fn begin_command_buffer(
        &mut self,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
        // SAFETY: the buffer is in the initial state.
        unsafe {
            self.live_device()?
                .begin_command_buffer(command_buffer, &begin_info)
        }
    }

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        // SAFETY: the buffer is recording.
        unsafe { self.live_device()?.end_command_buffer(command_buffer) }
    }

    fn cmd_image_barrier(
        &mut self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    ) {
        if let Some(device) = &self.device {
            // SAFETY: the buffer is recording.
            unsafe {
                device.cmd_pipeline_barrier(
                    command_buffer,
                    src_stage,
                    dst_stage,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    std::slice::from_ref(barrier),
                );
            }
        }
    }

    fn queue_submit(&mut self, queue: vk::Queue, batch: &SubmitBatch<'_>) -> VkResult<()> {
        let submit_info = batch.to_vk();
        // SAFETY: every handle in the batch belongs to this device.
        unsafe {
            self.live_device()?.queue_submit(
                queue,
                std::slice::from_ref(&submit_info),
                vk::Fence::null(),
            )
        }
    }

    fn queue_wait_idle(&mut self, queue: vk::Queue) -> VkResult<()> {
        // SAFETY: queue belongs to this device.
        unsafe { self.live_device()?.queue_wait_idle(queue) }
    }

    fn create_semaphore(&mut self) -> VkResult<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::default();
        // SAFETY: trivially valid create-info.
        unsafe { self.live_device()?.create_semaphore(&create_info, None) }
    }

    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore) {
        if let Some(device) = &self.device {
            // SAFETY: the device is idle before teardown.
            unsafe { device.destroy_semaphore(semaphore, None) };
        }
    }

    fn create_render_pass(
        &mut self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        // SAFETY: info and everything it points at outlive the call.
        unsafe { self.live_device()?.create_render_pass(info, None) }
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        if let Some(device) = &self.device {
            // SAFETY: framebuffers using the pass are destroyed before this stage.
            unsafe { device.destroy_render_pass(render_pass, None) };
        }
    }

    fn create_framebuffer(
        &mut self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        // SAFETY: info references a live render pass and views.
        unsafe { self.live_device()?.create_framebuffer(info, None) }
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        if let Some(device) = &self.device {
            // SAFETY: the device is idle before teardown.
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
    }
}

impl Drop for AshDriver {
    fn drop(&mut self) {
        if self.instance_destroyed {
            return;
        }
        tracing::warn!("Vulkan driver dropped without teardown; destroying device and instance");
        self.destroy_device();
        self.window = None;
        self.destroy_instance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_message_types_keep_their_label() {
        use vk::DebugUtilsMessageTypeFlagsEXT as Type;

        assert_eq!(message_kind(Type::VALIDATION | Type::PERFORMANCE), "validation");
        assert_eq!(message_kind(Type::GENERAL | Type::PERFORMANCE), "performance");
        assert_eq!(message_kind(Type::GENERAL), "general");
        assert_eq!(message_kind(Type::empty()), "other");
    }
}
