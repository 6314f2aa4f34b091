//! GPU context management.

use std::sync::Arc;

use ash::vk;

use crate::ash_driver::{AshDriver, InstanceConfig, WindowTarget};
use crate::capabilities::{AdapterInfo, QueueFamilies};
use crate::command::{execute_one_shot, CommandPool, CommandPools, OneShotCommand, SubmitBatch};
use crate::config::ContextConfig;
use crate::depth::DepthAttachment;
use crate::driver::Driver;
use crate::error::{GpuError, Result, VkResultExt};
use crate::render_target::{RenderTargetLayout, RenderTargets};
use crate::selector::{create_logical_device, select_adapter, LogicalDevice, SelectedAdapter};
use crate::surface::query_surface_capabilities;
use crate::swapchain::{AcquireOutcome, ChainParameters, PresentationChain};
use crate::sync::{create_semaphore, FrameSync};
use crate::teardown::{Resource, Teardown};

/// Everything created between the instance and the first frame.
struct ContextState {
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: vk::SurfaceKHR,
    adapter: SelectedAdapter,
    device: LogicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    chain: PresentationChain,
    pools: CommandPools,
    depth: DepthAttachment,
    sync: FrameSync,
    layout: RenderTargetLayout,
    targets: RenderTargets,
}

impl ContextState {
    fn create<D: Driver>(
        driver: &mut D,
        teardown: &mut Teardown,
        config: &ContextConfig,
    ) -> Result<Self> {
        let debug_messenger = if config.validation {
            let messenger = driver
                .create_debug_messenger()
                .call("vkCreateDebugUtilsMessengerEXT")?;
            teardown.push(Resource::DebugMessenger(messenger));
            Some(messenger)
        } else {
            None
        };

        let surface = driver.create_surface().map_err(|result| {
            GpuError::SurfaceCreation(format!("{result} ({})", result.as_raw()))
        })?;
        teardown.push(Resource::Surface(surface));

        let adapter = select_adapter(driver, surface, &config.required_extensions)?;

        let device = create_logical_device(
            driver,
            adapter.info.handle,
            adapter.families,
            &config.required_extensions,
        )?;
        teardown.push(Resource::Device);

        let params = ChainParameters::negotiate(
            &adapter.surface,
            config.color_format,
            config.present_mode,
            config.extent,
            config.image_count,
        )?;
        let chain = PresentationChain::create(driver, teardown, surface, &params)?;

        let pools = create_pools(driver, teardown, adapter.families)?;

        let memory_properties = driver.memory_properties(adapter.info.handle);
        let depth = DepthAttachment::create(
            driver,
            teardown,
            &memory_properties,
            &pools.graphics,
            device.graphics_queue,
            config.depth_format,
            chain.extent,
        )?;

        let sync = create_frame_sync(driver, teardown)?;

        let layout = RenderTargetLayout::new(chain.format, depth.format, chain.extent);
        let targets =
            RenderTargets::create(driver, teardown, &layout, &chain.image_views, depth.view)?;

        Ok(Self {
            debug_messenger,
            surface,
            adapter,
            device,
            memory_properties,
            chain,
            pools,
            depth,
            sync,
            layout,
            targets,
        })
    }
}

fn create_pools<D: Driver + ?Sized>(
    driver: &mut D,
    teardown: &mut Teardown,
    families: QueueFamilies,
) -> Result<CommandPools> {
    let graphics = CommandPool::new(driver, families.graphics)?;
    teardown.push(Resource::CommandPool(graphics.handle()));

    let compute = CommandPool::new(driver, families.compute)?;
    teardown.push(Resource::CommandPool(compute.handle()));

    Ok(CommandPools { graphics, compute })
}

fn create_frame_sync<D: Driver + ?Sized>(
    driver: &mut D,
    teardown: &mut Teardown,
) -> Result<FrameSync> {
    let image_available = create_semaphore(driver)?;
    teardown.push(Resource::Semaphore(image_available));

    let render_finished = create_semaphore(driver)?;
    teardown.push(Resource::Semaphore(render_finished));

    Ok(FrameSync {
        image_available,
        render_finished,
    })
}

/// A ready-to-render GPU context.
///
/// Owns every object it created and destroys them all on drop, after the
/// device has gone idle.
pub struct GpuContext<D: Driver = AshDriver> {
    driver: D,
    teardown: Teardown,
    config: ContextConfig,
    state: ContextState,
    /// Set while the chain-bound objects are retired and not yet replaced.
    chain_lost: bool,
}

impl<D: Driver> GpuContext<D> {
    /// Get the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get the driver mutably, for recording commands.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Get the configuration the context was built with.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Get the objects the context currently owns.
    pub fn teardown(&self) -> &Teardown {
        &self.teardown
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.state.adapter.info.handle
    }

    /// Get the selected adapter.
    pub fn adapter(&self) -> &AdapterInfo {
        &self.state.adapter.info
    }

    /// Get the device memory properties of the selected adapter.
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.state.memory_properties
    }

    /// Get the queue family indices.
    pub fn queue_families(&self) -> QueueFamilies {
        self.state.device.families
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.state.device.graphics_queue
    }

    /// Get the compute queue.
    pub fn compute_queue(&self) -> vk::Queue {
        self.state.device.compute_queue
    }

    /// Get the present queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.state.device.present_queue
    }

    /// Get the graphics command pool.
    pub fn graphics_command_pool(&self) -> &CommandPool {
        &self.state.pools.graphics
    }

    /// Get the compute command pool.
    pub fn compute_command_pool(&self) -> &CommandPool {
        &self.state.pools.compute
    }

    /// Get the surface.
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.state.surface
    }

    /// Get the debug messenger, if validation is on.
    pub fn debug_messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.state.debug_messenger
    }

    /// Whether the chain, depth attachment and framebuffers are usable.
    ///
    /// False after a recreation failed part way; only another
    /// [`recreate_presentation`](Self::recreate_presentation) clears it.
    pub fn is_presentable(&self) -> bool {
        !self.chain_lost
    }

    fn ensure_presentable(&self) -> Result<()> {
        if self.chain_lost {
            return Err(GpuError::InvalidState(
                "presentation chain was lost in a failed recreation".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the presentation chain.
    ///
    /// Its handles are stale while [`is_presentable`](Self::is_presentable)
    /// is false.
    pub fn chain(&self) -> &PresentationChain {
        &self.state.chain
    }

    /// Get the depth attachment.
    pub fn depth(&self) -> &DepthAttachment {
        &self.state.depth
    }

    /// Get the frame semaphores.
    pub fn sync(&self) -> &FrameSync {
        &self.state.sync
    }

    /// Get the render-target layout.
    pub fn layout(&self) -> &RenderTargetLayout {
        &self.state.layout
    }

    /// Get the render pass and framebuffers.
    pub fn render_targets(&self) -> &RenderTargets {
        &self.state.targets
    }

    /// Acquire the next chain image, signalling `image_available`.
    pub fn acquire_next_image(&mut self) -> Result<AcquireOutcome> {
        self.ensure_presentable()?;
        self.state
            .chain
            .acquire(&mut self.driver, self.state.sync.image_available)
    }

    /// Submit one frame's command buffer on the graphics queue.
    ///
    /// Colour output waits on `image_available`; completion signals
    /// `render_finished`.
    pub fn submit_frame(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        self.ensure_presentable()?;
        let command_buffers = [command_buffer];
        let wait_semaphores = [self.state.sync.image_available];
        let wait_stages = [FrameSync::WAIT_STAGE];
        let signal_semaphores = [self.state.sync.render_finished];

        let batch = SubmitBatch {
            command_buffers: &command_buffers,
            wait_semaphores: &wait_semaphores,
            wait_stages: &wait_stages,
            signal_semaphores: &signal_semaphores,
        };

        self.driver
            .queue_submit(self.state.device.graphics_queue, &batch)
            .call("vkQueueSubmit")
    }

    /// Present `image_index` once `render_finished` is signalled.
    ///
    /// Returns `true` when the chain should be recreated.
    pub fn present(&mut self, image_index: u32) -> Result<bool> {
        self.ensure_presentable()?;
        self.state.chain.present(
            &mut self.driver,
            self.state.device.present_queue,
            image_index,
            self.state.sync.render_finished,
        )
    }

    /// Record and run a one-shot command on the graphics queue.
    pub fn one_shot<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut OneShotCommand<'_, D>),
    {
        execute_one_shot(
            &mut self.driver,
            &self.state.pools.graphics,
            self.state.device.graphics_queue,
            f,
        )
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        self.driver.device_wait_idle().call("vkDeviceWaitIdle")
    }

    /// Rebuild the presentation chain, depth attachment and framebuffers at
    /// `extent`.
    ///
    /// The render pass, pools, semaphores and device survive. A request the
    /// surface cannot honour fails before anything is destroyed. A failure
    /// after that leaves the context unpresentable until a later call
    /// succeeds.
    pub fn recreate_presentation(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.wait_idle()?;

        let capabilities = query_surface_capabilities(
            &self.driver,
            self.state.adapter.info.handle,
            self.state.surface,
        )?;
        let params = ChainParameters::negotiate(
            &capabilities,
            self.config.color_format,
            self.config.present_mode,
            extent,
            self.config.image_count,
        )?;

        let retired = self
            .teardown
            .retire(&mut self.driver, Resource::is_chain_bound);
        self.chain_lost = true;
        tracing::debug!("Retired {retired} chain resources");

        let chain = PresentationChain::create(
            &mut self.driver,
            &mut self.teardown,
            self.state.surface,
            &params,
        )?;
        let depth = DepthAttachment::create(
            &mut self.driver,
            &mut self.teardown,
            &self.state.memory_properties,
            &self.state.pools.graphics,
            self.state.device.graphics_queue,
            self.config.depth_format,
            chain.extent,
        )?;

        let layout = RenderTargetLayout::new(chain.format, depth.format, chain.extent);
        let framebuffers = RenderTargets::create_framebuffers(
            &mut self.driver,
            &mut self.teardown,
            &layout,
            self.state.targets.render_pass,
            &chain.image_views,
            depth.view,
        )?;

        self.state.adapter.surface = capabilities;
        self.state.chain = chain;
        self.state.depth = depth;
        self.state.layout = layout;
        self.state.targets.framebuffers = framebuffers;
        self.config.extent = extent;
        self.chain_lost = false;

        tracing::info!("Presentation recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }
}

impl<D: Driver> Drop for GpuContext<D> {
    fn drop(&mut self) {
        if self.teardown.contains(&Resource::Device) {
            if let Err(e) = self.driver.device_wait_idle() {
                tracing::error!("Device wait before teardown failed: {e}");
            }
        }
        self.teardown.unwind(&mut self.driver);
        tracing::info!("GPU context destroyed");
    }
}

/// Builder for creating a GPU context.
#[derive(Debug, Clone, Default)]
pub struct GpuContextBuilder {
    config: ContextConfig,
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.config.validation = enable;
        self
    }

    /// Load Vulkan, bind `window` and build a context on it.
    pub fn build_with_window(self, window: Arc<dyn WindowTarget>) -> Result<GpuContext<AshDriver>> {
        let driver = AshDriver::new(&InstanceConfig::from(&self.config), window)?;
        self.build(driver)
    }

    /// Build the GPU context on an existing driver.
    ///
    /// The driver's instance and window binding are owned from here on. If any
    /// step fails, everything created so far is destroyed before returning.
    pub fn build<D: Driver>(self, mut driver: D) -> Result<GpuContext<D>> {
        // The driver holds the instance and window binding from construction on.
        let mut teardown = Teardown::new();
        teardown.push(Resource::Instance);
        teardown.push(Resource::Window);

        match ContextState::create(&mut driver, &mut teardown, &self.config) {
            Ok(state) => Ok(GpuContext {
                driver,
                teardown,
                config: self.config,
                state,
                chain_lost: false,
            }),
            Err(e) => {
                tracing::error!(
                    "Context creation failed, releasing {} objects: {e}",
                    teardown.len()
                );
                if teardown.contains(&Resource::Device) {
                    if let Err(e) = driver.device_wait_idle() {
                        tracing::error!("Device wait before unwinding failed: {e}");
                    }
                }
                teardown.unwind(&mut driver);
                Err(e)
            }
        }
    }
}
