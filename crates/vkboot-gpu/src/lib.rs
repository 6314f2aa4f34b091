//! Vulkan context and presentation lifecycle for the vkboot renderer.
//!
//! This crate provides:
//! - Adapter capability queries and first-fit adapter selection
//! - Logical device and queue creation
//! - Swapchain negotiation, per-frame acquire/present and recreation
//! - Command pools, one-shot commands and frame semaphores
//! - Depth attachment and render pass / framebuffer setup
//! - Ordered teardown of everything above
//!
//! All driver calls go through the [`Driver`] trait. [`AshDriver`] implements
//! it over the system Vulkan loader.

pub mod ash_driver;
pub mod capabilities;
pub mod command;
pub mod config;
pub mod context;
pub mod depth;
pub mod driver;
pub mod error;
pub mod render_target;
pub mod selector;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod teardown;

pub use ash_driver::{AshDriver, InstanceConfig, WindowTarget};
pub use capabilities::{AdapterInfo, GpuVendor, QueueFamilies, QueueFamilySelection, QueueRole};
pub use command::{execute_one_shot, CommandPool, CommandPools, OneShotCommand, SubmitBatch};
pub use config::ContextConfig;
pub use context::{GpuContext, GpuContextBuilder};
pub use depth::{find_memory_type, DepthAttachment};
pub use driver::{AdapterProperties, Driver};
pub use error::{GpuError, Result, VkResultExt};
pub use render_target::{AttachmentSpec, RenderTargetLayout, RenderTargets};
pub use selector::{select_adapter, LogicalDevice, Rejection, SelectedAdapter};
pub use surface::{Range, SurfaceCapabilities};
pub use swapchain::{AcquireOutcome, ChainParameters, PresentationChain};
pub use sync::{create_semaphore, FrameSync};
pub use teardown::{Resource, Stage, Teardown};
