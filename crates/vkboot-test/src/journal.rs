//! Recorded driver activity and lifetime validation.

use std::collections::{HashMap, HashSet};
use std::fmt;

use ash::vk;

/// Kinds of handle-backed driver objects the mock tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    DebugMessenger,
    Surface,
    Swapchain,
    Image,
    ImageView,
    Memory,
    CommandPool,
    CommandBuffer,
    Semaphore,
    RenderPass,
    Framebuffer,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Swapchain creation parameters as the driver saw them.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainInfo {
    pub swapchain: u64,
    pub surface: u64,
    pub min_image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
}

/// One driver call of interest, in call order.
#[derive(Debug, Clone)]
pub enum Event {
    Created(ObjectKind, u64),
    Destroyed(ObjectKind, u64),
    DeviceCreated {
        adapter: u64,
        queue_families: Vec<u32>,
        extensions: Vec<String>,
    },
    DeviceDestroyed,
    WindowReleased,
    InstanceDestroyed,
    SwapchainCreated(SwapchainInfo),
    ViewCreated {
        view: u64,
        image: u64,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
        view_type: vk::ImageViewType,
    },
    MemoryBound {
        image: u64,
        memory: u64,
        memory_type: u32,
    },
    RenderPassCreated {
        render_pass: u64,
        attachments: Vec<vk::AttachmentDescription>,
        subpasses: u32,
        dependencies: u32,
    },
    FramebufferCreated {
        framebuffer: u64,
        render_pass: u64,
        attachments: Vec<u64>,
        extent: vk::Extent2D,
        layers: u32,
    },
    BarrierRecorded {
        command_buffer: u64,
        image: u64,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        aspect: vk::ImageAspectFlags,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
    },
    Submitted {
        queue: u64,
        command_buffers: Vec<u64>,
        wait_semaphores: Vec<u64>,
        wait_stages: Vec<vk::PipelineStageFlags>,
        signal_semaphores: Vec<u64>,
    },
    QueueIdle {
        queue: u64,
    },
    DeviceIdle,
    Acquired {
        swapchain: u64,
        semaphore: u64,
        index: u32,
    },
    Presented {
        queue: u64,
        swapchain: u64,
        index: u32,
        wait: u64,
    },
}

/// Live object bookkeeping plus the event log.
///
/// Every breach of a parent/child lifetime rule is recorded as a message,
/// the way a validation layer would report it.
#[derive(Debug, Default)]
pub struct Journal {
    events: Vec<Event>,
    messages: Vec<String>,
    live: HashMap<u64, ObjectKind>,
    /// Swapchain -> its images.
    chain_images: HashMap<u64, Vec<u64>>,
    /// View -> viewed image.
    view_images: HashMap<u64, u64>,
    /// Image -> bound memory.
    image_memory: HashMap<u64, u64>,
    /// Framebuffer -> (render pass, attachments).
    framebuffers: HashMap<u64, (u64, Vec<u64>)>,
    /// Command buffer -> owning pool.
    buffer_pools: HashMap<u64, u64>,
    /// Swapchain -> surface.
    chain_surfaces: HashMap<u64, u64>,
    /// Queue -> command buffers submitted since the queue last idled.
    pending: HashMap<u64, HashSet<u64>>,
    pub(crate) device_alive: bool,
    pub(crate) window_bound: bool,
    pub(crate) instance_alive: bool,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self {
            window_bound: true,
            instance_alive: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Validation messages in report order.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Live objects by raw handle.
    pub fn live(&self) -> &HashMap<u64, ObjectKind> {
        &self.live
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|&&k| k == kind).count()
    }

    pub fn is_live(&self, raw: u64) -> bool {
        self.live.contains_key(&raw)
    }

    pub fn device_alive(&self) -> bool {
        self.device_alive
    }

    pub fn window_bound(&self) -> bool {
        self.window_bound
    }

    pub fn instance_alive(&self) -> bool {
        self.instance_alive
    }

    /// Number of objects of `kind` ever created.
    pub fn created_count(&self, kind: ObjectKind) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Created(k, _) if *k == kind))
            .count()
    }

    /// Index of the first event matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(predicate)
    }

    pub(crate) fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(target: "vkboot_test::validation", "{message}");
        self.messages.push(message);
    }

    pub(crate) fn require_instance(&mut self, call: &str) {
        if !self.instance_alive {
            self.report(format!("{call} called after vkDestroyInstance"));
        }
    }

    pub(crate) fn require_device(&mut self, call: &str) -> bool {
        self.require_instance(call);
        if !self.device_alive {
            self.report(format!("{call} called without a logical device"));
        }
        self.device_alive
    }

    pub(crate) fn created(&mut self, kind: ObjectKind, raw: u64) {
        self.live.insert(raw, kind);
        self.record(Event::Created(kind, raw));
    }

    /// Remove `raw` from the live set, reporting double or foreign destroys.
    pub(crate) fn destroyed(&mut self, kind: ObjectKind, raw: u64) -> bool {
        match self.live.get(&raw) {
            Some(&live_kind) if live_kind == kind => {
                self.live.remove(&raw);
                self.record(Event::Destroyed(kind, raw));
                true
            }
            Some(&live_kind) => {
                self.report(format!(
                    "Destroying {raw:#x} as {kind} but it is a {live_kind}"
                ));
                false
            }
            None => {
                self.report(format!(
                    "Destroying unknown or already destroyed {kind} {raw:#x}"
                ));
                false
            }
        }
    }

    fn live_where(&self, kind: ObjectKind, predicate: impl Fn(u64) -> bool) -> usize {
        self.live
            .iter()
            .filter(|&(&raw, &k)| k == kind && predicate(raw))
            .count()
    }

    pub(crate) fn chain_created(&mut self, info: SwapchainInfo, images: Vec<u64>) {
        self.created(ObjectKind::Swapchain, info.swapchain);
        self.chain_surfaces.insert(info.swapchain, info.surface);
        self.chain_images.insert(info.swapchain, images);
        self.record(Event::SwapchainCreated(info));
    }

    pub(crate) fn chain_images(&self, swapchain: u64) -> Option<&[u64]> {
        self.chain_images.get(&swapchain).map(Vec::as_slice)
    }

    pub(crate) fn view_created(&mut self, view: u64, image: u64) {
        self.view_images.insert(view, image);
        self.created(ObjectKind::ImageView, view);
    }

    pub(crate) fn memory_bound(&mut self, image: u64, memory: u64) {
        if let Some(previous) = self.image_memory.insert(image, memory) {
            self.report(format!(
                "Image {image:#x} already bound to memory {previous:#x}"
            ));
        }
    }

    pub(crate) fn framebuffer_created(
        &mut self,
        framebuffer: u64,
        render_pass: u64,
        attachments: Vec<u64>,
    ) {
        for &view in &attachments {
            if !self.is_live(view) {
                self.report(format!(
                    "Framebuffer {framebuffer:#x} references dead view {view:#x}"
                ));
            }
        }
        self.framebuffers
            .insert(framebuffer, (render_pass, attachments));
        self.created(ObjectKind::Framebuffer, framebuffer);
    }

    pub(crate) fn buffer_allocated(&mut self, buffer: u64, pool: u64) {
        self.buffer_pools.insert(buffer, pool);
        self.created(ObjectKind::CommandBuffer, buffer);
    }

    pub(crate) fn submitted(&mut self, queue: u64, buffers: &[u64]) {
        self.pending
            .entry(queue)
            .or_default()
            .extend(buffers.iter().copied());
    }

    pub(crate) fn queue_idle(&mut self, queue: u64) {
        self.pending.remove(&queue);
        self.record(Event::QueueIdle { queue });
    }

    pub(crate) fn device_idle(&mut self) {
        self.pending.clear();
        self.record(Event::DeviceIdle);
    }

    fn is_pending(&self, buffer: u64) -> bool {
        self.pending.values().any(|buffers| buffers.contains(&buffer))
    }

    // Lifetime rules. Each is checked before the object is removed.

    pub(crate) fn check_free_buffer(&mut self, buffer: u64) {
        if self.is_pending(buffer) {
            self.report(format!(
                "Command buffer {buffer:#x} freed while pending execution"
            ));
        }
        self.buffer_pools.remove(&buffer);
    }

    pub(crate) fn check_destroy_pool(&mut self, pool: u64) {
        let buffers: Vec<u64> = self
            .buffer_pools
            .iter()
            .filter(|&(_, &p)| p == pool)
            .map(|(&b, _)| b)
            .collect();
        if buffers.iter().any(|&b| self.is_pending(b)) {
            self.report(format!(
                "Command pool {pool:#x} destroyed while a buffer is pending"
            ));
        }
        // Buffers die with their pool.
        for buffer in buffers {
            self.buffer_pools.remove(&buffer);
            if self.live.remove(&buffer).is_some() {
                self.record(Event::Destroyed(ObjectKind::CommandBuffer, buffer));
            }
        }
    }

    pub(crate) fn check_destroy_view(&mut self, view: u64) {
        let users = self
            .framebuffers
            .iter()
            .filter(|(fb, (_, attachments))| {
                self.live.contains_key(*fb) && attachments.contains(&view)
            })
            .count();
        if users > 0 {
            self.report(format!(
                "Image view {view:#x} destroyed while {users} framebuffers use it"
            ));
        }
        self.view_images.remove(&view);
    }

    pub(crate) fn check_destroy_render_pass(&mut self, render_pass: u64) {
        let users = self
            .framebuffers
            .iter()
            .filter(|(fb, (pass, _))| self.live.contains_key(*fb) && *pass == render_pass)
            .count();
        if users > 0 {
            self.report(format!(
                "Render pass {render_pass:#x} destroyed while {users} framebuffers use it"
            ));
        }
    }

    pub(crate) fn check_destroy_framebuffer(&mut self, framebuffer: u64) {
        self.framebuffers.remove(&framebuffer);
    }

    fn live_views_of(&self, images: &[u64]) -> usize {
        self.view_images
            .iter()
            .filter(|(view, image)| self.live.contains_key(*view) && images.contains(*image))
            .count()
    }

    pub(crate) fn check_destroy_image(&mut self, image: u64) {
        let views = self.live_views_of(&[image]);
        if views > 0 {
            self.report(format!(
                "Image {image:#x} destroyed while {views} views of it are alive"
            ));
        }
    }

    pub(crate) fn check_free_memory(&mut self, memory: u64) {
        let bound: Vec<u64> = self
            .image_memory
            .iter()
            .filter(|&(_, &m)| m == memory)
            .map(|(&image, _)| image)
            .collect();
        for image in bound {
            if self.is_live(image) {
                self.report(format!(
                    "Memory {memory:#x} freed while image {image:#x} is bound to it"
                ));
            }
            self.image_memory.remove(&image);
        }
    }

    pub(crate) fn check_destroy_swapchain(&mut self, swapchain: u64) {
        let images = self.chain_images.remove(&swapchain).unwrap_or_default();
        let views = self.live_views_of(&images);
        if views > 0 {
            self.report(format!(
                "Swapchain {swapchain:#x} destroyed while {views} views of its images are alive"
            ));
        }
        self.chain_surfaces.remove(&swapchain);
    }

    pub(crate) fn check_destroy_surface(&mut self, surface: u64) {
        let chains = self
            .chain_surfaces
            .iter()
            .filter(|(chain, s)| self.live.contains_key(*chain) && **s == surface)
            .count();
        if chains > 0 {
            self.report(format!(
                "Surface {surface:#x} destroyed while {chains} swapchains use it"
            ));
        }
    }

    pub(crate) fn check_destroy_device(&mut self) {
        let children: Vec<String> = [
            ObjectKind::Swapchain,
            ObjectKind::Image,
            ObjectKind::ImageView,
            ObjectKind::Memory,
            ObjectKind::CommandPool,
            ObjectKind::CommandBuffer,
            ObjectKind::Semaphore,
            ObjectKind::RenderPass,
            ObjectKind::Framebuffer,
        ]
        .into_iter()
        .filter_map(|kind| {
            let count = self.live_where(kind, |_| true);
            (count > 0).then(|| format!("{count} {kind}"))
        })
        .collect();

        if !children.is_empty() {
            self.report(format!(
                "Device destroyed with live children: {}",
                children.join(", ")
            ));
        }
    }

    pub(crate) fn check_release_window(&mut self) {
        let surfaces = self.live_count(ObjectKind::Surface);
        if surfaces > 0 {
            self.report(format!(
                "Window released while {surfaces} surfaces are alive"
            ));
        }
    }

    pub(crate) fn check_destroy_instance(&mut self) {
        let mut children = Vec::new();
        if self.device_alive {
            children.push("device".to_string());
        }
        for kind in [ObjectKind::Surface, ObjectKind::DebugMessenger] {
            let count = self.live_count(kind);
            if count > 0 {
                children.push(format!("{count} {kind}"));
            }
        }
        if !children.is_empty() {
            self.report(format!(
                "Instance destroyed with live children: {}",
                children.join(", ")
            ));
        }
    }

    /// Objects never destroyed, for leak assertions.
    pub fn leaks(&self) -> Vec<(ObjectKind, u64)> {
        let mut leaks: Vec<_> = self.live.iter().map(|(&raw, &kind)| (kind, raw)).collect();
        leaks.sort_by_key(|&(_, raw)| raw);
        leaks
    }
}
