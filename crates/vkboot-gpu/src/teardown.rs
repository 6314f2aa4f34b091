//! Ordered destruction of everything a context creates.
//!
//! Creation order and destruction order differ: command pools are needed to
//! transition the depth image, so they exist before it, yet they must go
//! before any view is destroyed. Each [`Resource`] therefore carries a
//! [`Stage`], and [`Teardown::unwind`] destroys stage by stage, newest first
//! inside a stage.

use std::cmp::Reverse;

use ash::vk;

use crate::driver::Driver;

/// Destruction stage. Variants are declared in destruction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Framebuffer,
    RenderPass,
    Semaphore,
    CommandPool,
    ColorView,
    DepthView,
    DepthImage,
    DepthMemory,
    Swapchain,
    Device,
    Surface,
    Window,
    DebugMessenger,
    Instance,
}

/// One owned driver object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Framebuffer(vk::Framebuffer),
    RenderPass(vk::RenderPass),
    Semaphore(vk::Semaphore),
    CommandPool(vk::CommandPool),
    ColorView(vk::ImageView),
    DepthView(vk::ImageView),
    DepthImage(vk::Image),
    DepthMemory(vk::DeviceMemory),
    Swapchain(vk::SwapchainKHR),
    Device,
    Surface(vk::SurfaceKHR),
    Window,
    DebugMessenger(vk::DebugUtilsMessengerEXT),
    Instance,
}

impl Resource {
    /// The stage this resource is destroyed in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Framebuffer(_) => Stage::Framebuffer,
            Self::RenderPass(_) => Stage::RenderPass,
            Self::Semaphore(_) => Stage::Semaphore,
            Self::CommandPool(_) => Stage::CommandPool,
            Self::ColorView(_) => Stage::ColorView,
            Self::DepthView(_) => Stage::DepthView,
            Self::DepthImage(_) => Stage::DepthImage,
            Self::DepthMemory(_) => Stage::DepthMemory,
            Self::Swapchain(_) => Stage::Swapchain,
            Self::Device => Stage::Device,
            Self::Surface(_) => Stage::Surface,
            Self::Window => Stage::Window,
            Self::DebugMessenger(_) => Stage::DebugMessenger,
            Self::Instance => Stage::Instance,
        }
    }

    /// Whether the object belongs to the presentation chain and is rebuilt
    /// when the chain is recreated.
    pub fn is_chain_bound(&self) -> bool {
        matches!(
            self,
            Self::Framebuffer(_)
                | Self::ColorView(_)
                | Self::DepthView(_)
                | Self::DepthImage(_)
                | Self::DepthMemory(_)
                | Self::Swapchain(_)
        )
    }

    fn destroy<D: Driver + ?Sized>(self, driver: &mut D) {
        tracing::trace!("Destroying {self:?}");
        match self {
            Self::Framebuffer(framebuffer) => driver.destroy_framebuffer(framebuffer),
            Self::RenderPass(render_pass) => driver.destroy_render_pass(render_pass),
            Self::Semaphore(semaphore) => driver.destroy_semaphore(semaphore),
            Self::CommandPool(pool) => driver.destroy_command_pool(pool),
            Self::ColorView(view) | Self::DepthView(view) => driver.destroy_image_view(view),
            Self::DepthImage(image) => driver.destroy_image(image),
            Self::DepthMemory(memory) => driver.free_memory(memory),
            Self::Swapchain(swapchain) => driver.destroy_swapchain(swapchain),
            Self::Device => driver.destroy_device(),
            Self::Surface(surface) => driver.destroy_surface(surface),
            Self::Window => driver.release_window(),
            Self::DebugMessenger(messenger) => driver.destroy_debug_messenger(messenger),
            Self::Instance => driver.destroy_instance(),
        }
    }
}

/// Ownership list of created resources.
///
/// A resource is pushed only once its create call has succeeded, so an
/// unwind never touches something that does not exist.
#[derive(Debug, Default)]
pub struct Teardown {
    resources: Vec<Resource>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly created resource.
    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.resources.contains(resource)
    }

    /// Owned resources in creation order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// The order [`Self::unwind`] would destroy the current resources in.
    pub fn destruction_order(&self) -> Vec<Resource> {
        ordered(self.resources.iter().copied().enumerate())
    }

    /// Destroy every owned resource.
    pub fn unwind<D: Driver + ?Sized>(&mut self, driver: &mut D) {
        let count = self.resources.len();
        for resource in ordered(self.resources.drain(..).enumerate()) {
            resource.destroy(driver);
        }
        if count > 0 {
            tracing::debug!("Destroyed {count} resources");
        }
    }

    /// Destroy the resources matching `filter`, keeping the rest.
    ///
    /// Returns how many were destroyed.
    pub fn retire<D, F>(&mut self, driver: &mut D, filter: F) -> usize
    where
        D: Driver + ?Sized,
        F: Fn(&Resource) -> bool,
    {
        let (retired, kept): (Vec<_>, Vec<_>) = self
            .resources
            .drain(..)
            .enumerate()
            .partition(|(_, resource)| filter(resource));
        self.resources = kept.into_iter().map(|(_, resource)| resource).collect();

        let count = retired.len();
        for resource in ordered(retired) {
            resource.destroy(driver);
        }
        count
    }
}

fn ordered(resources: impl IntoIterator<Item = (usize, Resource)>) -> Vec<Resource> {
    let mut resources: Vec<_> = resources.into_iter().collect();
    resources.sort_by_key(|&(index, resource)| (resource.stage(), Reverse(index)));
    resources.into_iter().map(|(_, resource)| resource).collect()
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn view(raw: u64) -> vk::ImageView {
        vk::ImageView::from_raw(raw)
    }

    fn full_context() -> Teardown {
        let mut teardown = Teardown::new();
        // Creation order of a built context.
        teardown.push(Resource::Instance);
        teardown.push(Resource::DebugMessenger(vk::DebugUtilsMessengerEXT::from_raw(1)));
        teardown.push(Resource::Window);
        teardown.push(Resource::Surface(vk::SurfaceKHR::from_raw(2)));
        teardown.push(Resource::Device);
        teardown.push(Resource::Swapchain(vk::SwapchainKHR::from_raw(3)));
        teardown.push(Resource::ColorView(view(4)));
        teardown.push(Resource::ColorView(view(5)));
        teardown.push(Resource::CommandPool(vk::CommandPool::from_raw(6)));
        teardown.push(Resource::CommandPool(vk::CommandPool::from_raw(7)));
        teardown.push(Resource::DepthImage(vk::Image::from_raw(8)));
        teardown.push(Resource::DepthMemory(vk::DeviceMemory::from_raw(9)));
        teardown.push(Resource::DepthView(view(10)));
        teardown.push(Resource::Semaphore(vk::Semaphore::from_raw(11)));
        teardown.push(Resource::Semaphore(vk::Semaphore::from_raw(12)));
        teardown.push(Resource::RenderPass(vk::RenderPass::from_raw(13)));
        teardown.push(Resource::Framebuffer(vk::Framebuffer::from_raw(14)));
        teardown.push(Resource::Framebuffer(vk::Framebuffer::from_raw(15)));
        teardown
    }

    #[test]
    fn stages_follow_declared_order() {
        assert!(Stage::Framebuffer < Stage::RenderPass);
        assert!(Stage::CommandPool < Stage::ColorView);
        assert!(Stage::DepthMemory < Stage::Swapchain);
        assert!(Stage::Device < Stage::Surface);
        assert!(Stage::DebugMessenger < Stage::Instance);
    }

    #[test]
    fn destruction_order_is_staged() {
        let order: Vec<Stage> = full_context()
            .destruction_order()
            .iter()
            .map(Resource::stage)
            .collect();

        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert_eq!(order.first(), Some(&Stage::Framebuffer));
        assert_eq!(order.last(), Some(&Stage::Instance));
    }

    #[test]
    fn newest_first_within_a_stage() {
        let order = full_context().destruction_order();
        let views: Vec<_> = order
            .iter()
            .filter_map(|resource| match resource {
                Resource::ColorView(view) => Some(view.as_raw()),
                _ => None,
            })
            .collect();
        assert_eq!(views, vec![5, 4]);

        let framebuffers: Vec<_> = order
            .iter()
            .filter_map(|resource| match resource {
                Resource::Framebuffer(framebuffer) => Some(framebuffer.as_raw()),
                _ => None,
            })
            .collect();
        assert_eq!(framebuffers, vec![15, 14]);
    }

    #[test]
    fn pools_go_before_views_despite_creation_order() {
        let order = full_context().destruction_order();
        let position = |stage| order.iter().position(|r| r.stage() == stage).unwrap();
        assert!(position(Stage::CommandPool) < position(Stage::ColorView));
        assert!(position(Stage::DepthView) < position(Stage::DepthImage));
        assert!(position(Stage::DepthImage) < position(Stage::DepthMemory));
    }

    #[test]
    fn partial_list_only_names_what_exists() {
        let mut teardown = Teardown::new();
        teardown.push(Resource::Instance);
        teardown.push(Resource::Window);
        teardown.push(Resource::Surface(vk::SurfaceKHR::from_raw(1)));

        assert_eq!(
            teardown.destruction_order(),
            vec![
                Resource::Surface(vk::SurfaceKHR::from_raw(1)),
                Resource::Window,
                Resource::Instance,
            ]
        );
    }

    #[test]
    fn chain_bound_resources() {
        assert!(Resource::Swapchain(vk::SwapchainKHR::null()).is_chain_bound());
        assert!(Resource::DepthMemory(vk::DeviceMemory::null()).is_chain_bound());
        assert!(!Resource::RenderPass(vk::RenderPass::null()).is_chain_bound());
        assert!(!Resource::Semaphore(vk::Semaphore::null()).is_chain_bound());
        assert!(!Resource::Device.is_chain_bound());
    }
}
