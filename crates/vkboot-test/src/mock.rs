//! In-memory [`Driver`] that records every call.

use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use vkboot_gpu::{AdapterProperties, Driver, SubmitBatch};

use crate::adapter::MockAdapter;
use crate::journal::{Event, Journal, ObjectKind, SwapchainInfo};

const ADAPTER_BASE: u64 = 0x10;
const QUEUE_BASE: u64 = 0x100;
const HANDLE_BASE: u64 = 0x1000;

struct Shared {
    journal: Journal,
    adapters: Vec<MockAdapter>,
    failures: HashMap<&'static str, vk::Result>,
    extra_images: u32,
    next_handle: u64,
    device_adapter: Option<usize>,
    device_families: Vec<u32>,
    image_extents: HashMap<u64, vk::Extent2D>,
    memory_types: HashMap<u64, u32>,
    acquire_count: u32,
}

impl Shared {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn fail(&self, call: &str) -> VkResult<()> {
        self.failures.get(call).map_or(Ok(()), |&result| Err(result))
    }

    fn adapter(&mut self, adapter: vk::PhysicalDevice) -> Option<&MockAdapter> {
        let index = adapter
            .as_raw()
            .checked_sub(ADAPTER_BASE)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < self.adapters.len());
        match index {
            Some(i) => self.adapters.get(i),
            None => {
                self.journal
                    .report(format!("Unknown physical device {:#x}", adapter.as_raw()));
                None
            }
        }
    }

    fn device_adapter(&self) -> Option<&MockAdapter> {
        self.device_adapter.and_then(|i| self.adapters.get(i))
    }

    fn expect_live(&mut self, call: &str, kind: ObjectKind, raw: u64) {
        if self.journal.live().get(&raw) != Some(&kind) {
            self.journal
                .report(format!("{call} given dead or foreign {kind} {raw:#x}"));
        }
    }

    fn is_chain_image(&self, image: u64) -> bool {
        self.journal
            .live()
            .iter()
            .filter(|&(_, &kind)| kind == ObjectKind::Swapchain)
            .filter_map(|(&chain, _)| self.journal.chain_images(chain))
            .any(|images| images.contains(&image))
    }
}

/// Simulated Vulkan driver.
///
/// The instance counts as created and the window as bound from construction.
/// Use [`MockDriver::handle`] before handing the driver to a context to keep
/// access to the journal and the failure switches.
pub struct MockDriver {
    shared: Arc<Mutex<Shared>>,
}

/// Shared access to a [`MockDriver`]'s journal and knobs.
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockDriver {
    /// A driver exposing `adapters` in the given enumeration order.
    pub fn new(adapters: Vec<MockAdapter>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                journal: Journal::new(),
                adapters,
                failures: HashMap::new(),
                extra_images: 0,
                next_handle: HANDLE_BASE,
                device_adapter: None,
                device_families: Vec::new(),
                image_extents: HashMap::new(),
                memory_types: HashMap::new(),
                acquire_count: 0,
            })),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Physical device handle of the adapter at `index`.
    pub fn adapter_handle(index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(ADAPTER_BASE + index as u64)
    }

    /// Queue handle the mock hands out for `family`.
    pub fn queue_handle(family: u32) -> vk::Queue {
        vk::Queue::from_raw(QUEUE_BASE + u64::from(family))
    }
}

impl MockHandle {
    /// Lock the journal. Drop the guard before calling into the driver again.
    pub fn journal(&self) -> MappedMutexGuard<'_, Journal> {
        MutexGuard::map(self.shared.lock(), |shared| &mut shared.journal)
    }

    pub fn messages(&self) -> Vec<String> {
        self.journal().messages().to_vec()
    }

    pub fn events(&self) -> Vec<Event> {
        self.journal().events().to_vec()
    }

    /// Make every later `call` return `result`.
    pub fn fail_on(&self, call: &'static str, result: vk::Result) {
        self.shared.lock().failures.insert(call, result);
    }

    pub fn clear_failures(&self) {
        self.shared.lock().failures.clear();
    }

    /// Return `extra` more chain images than requested.
    pub fn set_extra_images(&self, extra: u32) {
        self.shared.lock().extra_images = extra;
    }

    /// Change what adapter `index` reports from now on.
    pub fn update_adapter(&self, index: usize, f: impl FnOnce(&mut MockAdapter)) {
        if let Some(adapter) = self.shared.lock().adapters.get_mut(index) {
            f(adapter);
        }
    }
}

impl Driver for MockDriver {
    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        let mut s = self.shared.lock();
        s.journal.require_instance("vkEnumeratePhysicalDevices");
        s.fail("vkEnumeratePhysicalDevices")?;
        Ok((0..s.adapters.len()).map(Self::adapter_handle).collect())
    }

    fn adapter_properties(&self, adapter: vk::PhysicalDevice) -> AdapterProperties {
        let mut s = self.shared.lock();
        s.adapter(adapter)
            .map(|a| AdapterProperties {
                name: a.name.clone(),
                vendor_id: a.vendor_id,
                device_type: a.device_type,
                api_version: a.api_version,
            })
            .unwrap_or_else(|| AdapterProperties {
                name: String::new(),
                vendor_id: 0,
                device_type: vk::PhysicalDeviceType::OTHER,
                api_version: 0,
            })
    }

    fn queue_family_properties(
        &self,
        adapter: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        let mut s = self.shared.lock();
        s.adapter(adapter)
            .map(MockAdapter::queue_family_properties)
            .unwrap_or_default()
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let mut s = self.shared.lock();
        s.fail("vkGetPhysicalDeviceSurfaceSupportKHR")?;
        s.expect_live(
            "vkGetPhysicalDeviceSurfaceSupportKHR",
            ObjectKind::Surface,
            surface.as_raw(),
        );
        Ok(s.adapter(adapter)
            .and_then(|a| a.queue_families.get(queue_family as usize))
            .is_some_and(|family| family.present))
    }

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<String>> {
        let mut s = self.shared.lock();
        s.fail("vkEnumerateDeviceExtensionProperties")?;
        Ok(s.adapter(adapter)
            .map(|a| a.extensions.clone())
            .unwrap_or_default())
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let mut s = self.shared.lock();
        s.fail("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        s.expect_live(
            "vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
            ObjectKind::Surface,
            surface.as_raw(),
        );
        s.adapter(adapter)
            .map(|a| a.capabilities)
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let mut s = self.shared.lock();
        s.fail("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        s.expect_live(
            "vkGetPhysicalDeviceSurfaceFormatsKHR",
            ObjectKind::Surface,
            surface.as_raw(),
        );
        Ok(s.adapter(adapter).map(|a| a.formats.clone()).unwrap_or_default())
    }

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        let mut s = self.shared.lock();
        s.fail("vkGetPhysicalDeviceSurfacePresentModesKHR")?;
        s.expect_live(
            "vkGetPhysicalDeviceSurfacePresentModesKHR",
            ObjectKind::Surface,
            surface.as_raw(),
        );
        Ok(s.adapter(adapter)
            .map(|a| a.present_modes.clone())
            .unwrap_or_default())
    }

    fn memory_properties(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceMemoryProperties {
        let mut s = self.shared.lock();
        s.adapter(adapter)
            .map(MockAdapter::memory_properties)
            .unwrap_or_default()
    }

    fn create_debug_messenger(&mut self) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let mut s = self.shared.lock();
        s.journal.require_instance("vkCreateDebugUtilsMessengerEXT");
        s.fail("vkCreateDebugUtilsMessengerEXT")?;
        let raw = s.next();
        s.journal.created(ObjectKind::DebugMessenger, raw);
        Ok(vk::DebugUtilsMessengerEXT::from_raw(raw))
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        let mut s = self.shared.lock();
        s.journal.require_instance("vkDestroyDebugUtilsMessengerEXT");
        s.journal
            .destroyed(ObjectKind::DebugMessenger, messenger.as_raw());
    }

    fn create_surface(&mut self) -> VkResult<vk::SurfaceKHR> {
        let mut s = self.shared.lock();
        s.journal.require_instance("vkCreateSurfaceKHR");
        if !s.journal.window_bound() {
            s.journal.report("Surface created without a window");
            return Err(vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR);
        }
        s.fail("vkCreateSurfaceKHR")?;
        let raw = s.next();
        s.journal.created(ObjectKind::Surface, raw);
        Ok(vk::SurfaceKHR::from_raw(raw))
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        let mut s = self.shared.lock();
        s.journal.require_instance("vkDestroySurfaceKHR");
        s.journal.check_destroy_surface(surface.as_raw());
        s.journal.destroyed(ObjectKind::Surface, surface.as_raw());
    }

    fn release_window(&mut self) {
        let mut s = self.shared.lock();
        if !s.journal.window_bound {
            s.journal.report("Window released twice");
        }
        s.journal.check_release_window();
        s.journal.window_bound = false;
        s.journal.record(Event::WindowReleased);
    }

    fn destroy_instance(&mut self) {
        let mut s = self.shared.lock();
        if !s.journal.instance_alive {
            s.journal.report("Instance destroyed twice");
        }
        s.journal.check_destroy_instance();
        s.journal.instance_alive = false;
        s.journal.record(Event::InstanceDestroyed);
    }

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        queues: &[vk::DeviceQueueCreateInfo<'_>],
        extensions: &[&CStr],
    ) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_instance("vkCreateDevice");
        s.fail("vkCreateDevice")?;
        if s.journal.device_alive {
            s.journal.report("Second logical device created");
        }

        let supported = s.adapter(adapter).map(|a| a.extensions.clone()).unwrap_or_default();
        let extensions: Vec<String> = extensions
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        if extensions.iter().any(|e| !supported.contains(e)) {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        }

        let families: Vec<u32> = queues.iter().map(|q| q.queue_family_index).collect();
        for (i, family) in families.iter().enumerate() {
            if families[..i].contains(family) {
                s.journal
                    .report(format!("Queue family {family} requested more than once"));
            }
        }
        if queues.iter().any(|q| q.queue_count == 0) {
            s.journal.report("Queue create info with zero queues");
        }

        let index = adapter
            .as_raw()
            .checked_sub(ADAPTER_BASE)
            .and_then(|i| usize::try_from(i).ok());
        s.device_adapter = index;
        s.device_families.clone_from(&families);
        s.journal.device_alive = true;
        s.journal.record(Event::DeviceCreated {
            adapter: adapter.as_raw(),
            queue_families: families,
            extensions,
        });
        Ok(())
    }

    fn device_queue(&self, queue_family: u32) -> vk::Queue {
        let mut s = self.shared.lock();
        s.journal.require_device("vkGetDeviceQueue");
        if !s.device_families.contains(&queue_family) {
            s.journal
                .report(format!("Queue family {queue_family} was not requested"));
        }
        Self::queue_handle(queue_family)
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDeviceWaitIdle");
        s.fail("vkDeviceWaitIdle")?;
        s.journal.device_idle();
        Ok(())
    }

    fn destroy_device(&mut self) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroyDevice");
        s.journal.check_destroy_device();
        s.journal.device_alive = false;
        s.device_families.clear();
        s.journal.record(Event::DeviceDestroyed);
    }

    fn create_swapchain(
        &mut self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateSwapchainKHR");
        s.fail("vkCreateSwapchainKHR")?;
        s.expect_live("vkCreateSwapchainKHR", ObjectKind::Surface, info.surface.as_raw());

        let raw = s.next();
        let count = info.min_image_count + s.extra_images;
        let images: Vec<u64> = (0..count).map(|_| s.next()).collect();
        s.journal.chain_created(
            SwapchainInfo {
                swapchain: raw,
                surface: info.surface.as_raw(),
                min_image_count: info.min_image_count,
                format: info.image_format,
                color_space: info.image_color_space,
                extent: info.image_extent,
                usage: info.image_usage,
                sharing_mode: info.image_sharing_mode,
                pre_transform: info.pre_transform,
                composite_alpha: info.composite_alpha,
                present_mode: info.present_mode,
                clipped: info.clipped == vk::TRUE,
            },
            images,
        );
        Ok(vk::SwapchainKHR::from_raw(raw))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let mut s = self.shared.lock();
        s.fail("vkGetSwapchainImagesKHR")?;
        let images = s.journal.chain_images(swapchain.as_raw()).map(<[u64]>::to_vec);
        match images {
            Some(images) => Ok(images.into_iter().map(vk::Image::from_raw).collect()),
            None => {
                s.journal
                    .report(format!("Unknown swapchain {:#x}", swapchain.as_raw()));
                Err(vk::Result::ERROR_UNKNOWN)
            }
        }
    }

    fn acquire_next_image(
        &mut self,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkAcquireNextImageKHR");
        s.fail("vkAcquireNextImageKHR")?;
        s.expect_live("vkAcquireNextImageKHR", ObjectKind::Swapchain, swapchain.as_raw());
        s.expect_live("vkAcquireNextImageKHR", ObjectKind::Semaphore, semaphore.as_raw());

        let count = s
            .journal
            .chain_images(swapchain.as_raw())
            .map_or(1, |images| images.len().max(1));
        let index = s.acquire_count % u32::try_from(count).unwrap_or(1);
        s.acquire_count += 1;
        s.journal.record(Event::Acquired {
            swapchain: swapchain.as_raw(),
            semaphore: semaphore.as_raw(),
            index,
        });
        Ok((index, false))
    }

    fn queue_present(
        &mut self,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkQueuePresentKHR");
        s.fail("vkQueuePresentKHR")?;
        s.expect_live("vkQueuePresentKHR", ObjectKind::Swapchain, swapchain.as_raw());
        s.journal.record(Event::Presented {
            queue: queue.as_raw(),
            swapchain: swapchain.as_raw(),
            index: image_index,
            wait: wait.as_raw(),
        });
        Ok(false)
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroySwapchainKHR");
        s.journal.check_destroy_swapchain(swapchain.as_raw());
        s.journal.destroyed(ObjectKind::Swapchain, swapchain.as_raw());
    }

    fn create_image(&mut self, info: &vk::ImageCreateInfo<'_>) -> VkResult<vk::Image> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateImage");
        s.fail("vkCreateImage")?;
        let raw = s.next();
        s.image_extents.insert(
            raw,
            vk::Extent2D {
                width: info.extent.width,
                height: info.extent.height,
            },
        );
        s.journal.created(ObjectKind::Image, raw);
        Ok(vk::Image::from_raw(raw))
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        let mut s = self.shared.lock();
        s.journal.require_device("vkGetImageMemoryRequirements");
        s.expect_live("vkGetImageMemoryRequirements", ObjectKind::Image, image.as_raw());
        let extent = s.image_extents.get(&image.as_raw()).copied().unwrap_or_default();
        let type_count = s.device_adapter().map_or(0, |a| a.memory_types.len());
        vk::MemoryRequirements {
            size: u64::from(extent.width) * u64::from(extent.height) * 8,
            alignment: 256,
            memory_type_bits: (1u32 << type_count.min(31)) - 1,
        }
    }

    fn allocate_memory(
        &mut self,
        info: &vk::MemoryAllocateInfo<'_>,
    ) -> VkResult<vk::DeviceMemory> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkAllocateMemory");
        s.fail("vkAllocateMemory")?;
        let type_count = s.device_adapter().map_or(0, |a| a.memory_types.len());
        if info.memory_type_index as usize >= type_count {
            s.journal.report(format!(
                "Memory type {} out of range ({type_count} types)",
                info.memory_type_index
            ));
        }
        let raw = s.next();
        s.memory_types.insert(raw, info.memory_type_index);
        s.journal.created(ObjectKind::Memory, raw);
        Ok(vk::DeviceMemory::from_raw(raw))
    }

    fn bind_image_memory(&mut self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkBindImageMemory");
        s.fail("vkBindImageMemory")?;
        s.expect_live("vkBindImageMemory", ObjectKind::Image, image.as_raw());
        s.expect_live("vkBindImageMemory", ObjectKind::Memory, memory.as_raw());
        s.journal.memory_bound(image.as_raw(), memory.as_raw());
        let memory_type = s.memory_types.get(&memory.as_raw()).copied().unwrap_or(u32::MAX);
        s.journal.record(Event::MemoryBound {
            image: image.as_raw(),
            memory: memory.as_raw(),
            memory_type,
        });
        Ok(())
    }

    fn create_image_view(
        &mut self,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateImageView");
        s.fail("vkCreateImageView")?;
        let image = info.image.as_raw();
        if !s.journal.is_live(image) && !s.is_chain_image(image) {
            s.journal
                .report(format!("Image view of dead or foreign image {image:#x}"));
        }
        let raw = s.next();
        s.journal.view_created(raw, image);
        s.journal.record(Event::ViewCreated {
            view: raw,
            image,
            format: info.format,
            aspect: info.subresource_range.aspect_mask,
            view_type: info.view_type,
        });
        Ok(vk::ImageView::from_raw(raw))
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroyImageView");
        s.journal.check_destroy_view(view.as_raw());
        s.journal.destroyed(ObjectKind::ImageView, view.as_raw());
    }

    fn destroy_image(&mut self, image: vk::Image) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroyImage");
        s.journal.check_destroy_image(image.as_raw());
        s.journal.destroyed(ObjectKind::Image, image.as_raw());
    }

    fn free_memory(&mut self, memory: vk::DeviceMemory) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkFreeMemory");
        s.journal.check_free_memory(memory.as_raw());
        s.journal.destroyed(ObjectKind::Memory, memory.as_raw());
    }

    fn create_command_pool(
        &mut self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateCommandPool");
        s.fail("vkCreateCommandPool")?;
        if !s.device_families.contains(&info.queue_family_index) {
            s.journal.report(format!(
                "Command pool for queue family {} the device did not request",
                info.queue_family_index
            ));
        }
        let raw = s.next();
        s.journal.created(ObjectKind::CommandPool, raw);
        Ok(vk::CommandPool::from_raw(raw))
    }

    fn destroy_command_pool(&mut self, pool: vk::CommandPool) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroyCommandPool");
        s.journal.check_destroy_pool(pool.as_raw());
        s.journal.destroyed(ObjectKind::CommandPool, pool.as_raw());
    }

    fn allocate_command_buffer(&mut self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkAllocateCommandBuffers");
        s.fail("vkAllocateCommandBuffers")?;
        s.expect_live("vkAllocateCommandBuffers", ObjectKind::CommandPool, pool.as_raw());
        let raw = s.next();
        s.journal.buffer_allocated(raw, pool.as_raw());
        Ok(vk::CommandBuffer::from_raw(raw))
    }

    fn free_command_buffer(&mut self, _pool: vk::CommandPool, command_buffer: vk::CommandBuffer) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkFreeCommandBuffers");
        s.journal.check_free_buffer(command_buffer.as_raw());
        s.journal
            .destroyed(ObjectKind::CommandBuffer, command_buffer.as_raw());
    }

    fn begin_command_buffer(
        &mut self,
        command_buffer: vk::CommandBuffer,
        _flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkBeginCommandBuffer");
        s.fail("vkBeginCommandBuffer")?;
        s.expect_live("vkBeginCommandBuffer", ObjectKind::CommandBuffer, command_buffer.as_raw());
        Ok(())
    }

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkEndCommandBuffer");
        s.fail("vkEndCommandBuffer")?;
        s.expect_live("vkEndCommandBuffer", ObjectKind::CommandBuffer, command_buffer.as_raw());
        Ok(())
    }

    fn cmd_image_barrier(
        &mut self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    ) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCmdPipelineBarrier");
        s.expect_live("vkCmdPipelineBarrier", ObjectKind::CommandBuffer, command_buffer.as_raw());
        s.journal.record(Event::BarrierRecorded {
            command_buffer: command_buffer.as_raw(),
            image: barrier.image.as_raw(),
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
            aspect: barrier.subresource_range.aspect_mask,
            src_stage,
            dst_stage,
        });
    }

    fn queue_submit(&mut self, queue: vk::Queue, batch: &SubmitBatch<'_>) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkQueueSubmit");
        s.fail("vkQueueSubmit")?;
        if batch.wait_semaphores.len() != batch.wait_stages.len() {
            s.journal.report("Submit with mismatched wait semaphores and stages");
        }
        let command_buffers: Vec<u64> = batch
            .command_buffers
            .iter()
            .map(|cb| cb.as_raw())
            .collect();
        for &cb in &command_buffers {
            s.expect_live("vkQueueSubmit", ObjectKind::CommandBuffer, cb);
        }
        s.journal.submitted(queue.as_raw(), &command_buffers);
        s.journal.record(Event::Submitted {
            queue: queue.as_raw(),
            command_buffers,
            wait_semaphores: batch.wait_semaphores.iter().map(|h| h.as_raw()).collect(),
            wait_stages: batch.wait_stages.to_vec(),
            signal_semaphores: batch.signal_semaphores.iter().map(|h| h.as_raw()).collect(),
        });
        Ok(())
    }

    fn queue_wait_idle(&mut self, queue: vk::Queue) -> VkResult<()> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkQueueWaitIdle");
        s.fail("vkQueueWaitIdle")?;
        s.journal.queue_idle(queue.as_raw());
        Ok(())
    }

    fn create_semaphore(&mut self) -> VkResult<vk::Semaphore> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateSemaphore");
        s.fail("vkCreateSemaphore")?;
        let raw = s.next();
        s.journal.created(ObjectKind::Semaphore, raw);
        Ok(vk::Semaphore::from_raw(raw))
    }

    fn destroy_semaphore(&mut self, semaphore: vk::Semaphore) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroySemaphore");
        s.journal.destroyed(ObjectKind::Semaphore, semaphore.as_raw());
    }

    fn create_render_pass(
        &mut self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateRenderPass");
        s.fail("vkCreateRenderPass")?;

        let attachments = if info.p_attachments.is_null() {
            Vec::new()
        } else {
            // SAFETY: the caller's create-info points at attachment_count
            // descriptions for the duration of the call.
            unsafe {
                std::slice::from_raw_parts(info.p_attachments, info.attachment_count as usize)
            }
            .to_vec()
        };

        let raw = s.next();
        s.journal.created(ObjectKind::RenderPass, raw);
        s.journal.record(Event::RenderPassCreated {
            render_pass: raw,
            attachments,
            subpasses: info.subpass_count,
            dependencies: info.dependency_count,
        });
        Ok(vk::RenderPass::from_raw(raw))
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroyRenderPass");
        s.journal.check_destroy_render_pass(render_pass.as_raw());
        s.journal.destroyed(ObjectKind::RenderPass, render_pass.as_raw());
    }

    fn create_framebuffer(
        &mut self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        let mut s = self.shared.lock();
        s.journal.require_device("vkCreateFramebuffer");
        s.fail("vkCreateFramebuffer")?;
        s.expect_live("vkCreateFramebuffer", ObjectKind::RenderPass, info.render_pass.as_raw());

        let attachments: Vec<u64> = if info.p_attachments.is_null() {
            Vec::new()
        } else {
            // SAFETY: the caller's create-info points at attachment_count
            // views for the duration of the call.
            unsafe {
                std::slice::from_raw_parts(info.p_attachments, info.attachment_count as usize)
            }
            .iter()
            .map(|view| view.as_raw())
            .collect()
        };

        let raw = s.next();
        s.journal
            .framebuffer_created(raw, info.render_pass.as_raw(), attachments.clone());
        s.journal.record(Event::FramebufferCreated {
            framebuffer: raw,
            render_pass: info.render_pass.as_raw(),
            attachments,
            extent: vk::Extent2D {
                width: info.width,
                height: info.height,
            },
            layers: info.layers,
        });
        Ok(vk::Framebuffer::from_raw(raw))
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        let mut s = self.shared.lock();
        s.journal.require_device("vkDestroyFramebuffer");
        s.journal.check_destroy_framebuffer(framebuffer.as_raw());
        s.journal.destroyed(ObjectKind::Framebuffer, framebuffer.as_raw());
    }
}
