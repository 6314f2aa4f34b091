//! Test harness for vkboot.
//!
//! [`MockDriver`] stands in for the Vulkan loader. It hands out fake handles,
//! journals every call and reports lifetime violations the way the
//! validation layer would, so context builds and teardowns can be checked
//! without a GPU.

pub mod adapter;
pub mod journal;
pub mod mock;

pub use adapter::{MockAdapter, MockQueueFamily};
pub use journal::{Event, Journal, ObjectKind, SwapchainInfo};
pub use mock::{MockDriver, MockHandle};

use vkboot_gpu::{ContextConfig, GpuContext, GpuContextBuilder};

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Build a context over the given adapters.
///
/// The handle stays usable after the context (and its driver) is dropped.
pub fn build_context(
    adapters: Vec<MockAdapter>,
    config: ContextConfig,
) -> (vkboot_gpu::Result<GpuContext<MockDriver>>, MockHandle) {
    init_logging();
    let driver = MockDriver::new(adapters);
    let handle = driver.handle();
    let result = GpuContextBuilder::new().config(config).build(driver);
    (result, handle)
}
