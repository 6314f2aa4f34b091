//! vkboot viewer
//!
//! Opens a fixed-size window, builds a GPU context on it and clears the
//! presentation chain every frame through the context's render pass.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p vkboot-viewer -- [--config <FILE>]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use ash::vk;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vkboot_gpu::{AcquireOutcome, Driver, GpuContext, GpuContextBuilder, VkResultExt};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::ViewerConfig;

const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.15, 1.0];

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let config = match config_path(&args)? {
        Some(path) => ViewerConfig::load(&path)?,
        None => ViewerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.debug.log_filter)),
        )
        .init();

    info!("{} starting...", config.window.title);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer {
        config,
        state: None,
        failed: false,
    };
    event_loop
        .run_app(&mut viewer)
        .context("Event loop error")?;

    if viewer.failed {
        bail!("Viewer stopped after a fatal error");
    }
    Ok(())
}

fn config_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().context("--config needs a file argument")?;
                return Ok(Some(PathBuf::from(path)));
            }
            other => bail!("Unknown argument {other}"),
        }
    }
    Ok(None)
}

fn print_help() {
    eprintln!(
        "vkboot viewer

USAGE:
    cargo run -p vkboot-viewer -- [OPTIONS]

OPTIONS:
    -c, --config <FILE>     TOML configuration ([window], [presentation], [debug])
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}

struct Viewer {
    config: ViewerConfig,
    state: Option<ViewerState>,
    failed: bool,
}

/// Field order is drop order: the context must go before the window.
struct ViewerState {
    gpu: GpuContext,
    /// One primary buffer per chain image, re-recorded every frame.
    command_buffers: Vec<vk::CommandBuffer>,
    frame_count: u64,
    window: Arc<Window>,
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match ViewerState::new(event_loop, &self.config) {
            Ok(state) => {
                info!("Viewer ready");
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, &e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(state) = self.state.take() {
                    info!("Rendered {} frames", state.frame_count);
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = &mut self.state else {
                    return;
                };
                if let Err(e) = state.render_frame() {
                    self.fail(event_loop, &e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl Viewer {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: &anyhow::Error) {
        error!("Fatal: {e:#}");
        self.state = None;
        self.failed = true;
        event_loop.exit();
    }
}

impl ViewerState {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig) -> anyhow::Result<Self> {
        let window = vkboot_platform::create_window(event_loop, &config.platform_config())?;

        let mut gpu = GpuContextBuilder::new()
            .config(config.context_config())
            .build_with_window(window.clone())?;
        info!("GPU: {}", gpu.adapter().summary());

        let command_buffers = allocate_frame_buffers(&mut gpu)?;

        Ok(Self {
            gpu,
            command_buffers,
            frame_count: 0,
            window,
        })
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let image_index = match self.gpu.acquire_next_image()? {
            AcquireOutcome::Image { index, suboptimal } => {
                if suboptimal {
                    warn!("Chain is suboptimal for the surface");
                }
                index
            }
            AcquireOutcome::OutOfDate => {
                self.recreate()?;
                return Ok(());
            }
        };

        let command_buffer = self.command_buffers[image_index as usize];
        self.record_clear(command_buffer, image_index)?;
        self.gpu.submit_frame(command_buffer)?;

        if self.gpu.present(image_index)? {
            self.recreate()?;
        }

        // One set of frame semaphores: the next frame may not start until
        // this one has finished.
        self.gpu.wait_idle()?;
        self.frame_count += 1;
        Ok(())
    }

    fn record_clear(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> anyhow::Result<()> {
        let framebuffer = self
            .gpu
            .render_targets()
            .framebuffer(image_index)
            .with_context(|| format!("No framebuffer for image {image_index}"))?;
        let render_pass = self.gpu.render_targets().render_pass;
        let extent = self.gpu.chain().extent;

        let device = self
            .gpu
            .driver()
            .device()
            .context("Logical device is gone")?
            .clone();

        // SAFETY: the device is idle after every frame, so the buffer is not
        // pending; its pool allows individual resets.
        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .call("vkResetCommandBuffer")?;
        }
        self.gpu
            .driver_mut()
            .begin_command_buffer(command_buffer, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .call("vkBeginCommandBuffer")?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            })
            .clear_values(&clear_values);

        // SAFETY: the buffer is recording and every handle belongs to this
        // device.
        unsafe {
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_end_render_pass(command_buffer);
        }

        self.gpu
            .driver_mut()
            .end_command_buffer(command_buffer)
            .call("vkEndCommandBuffer")?;
        Ok(())
    }

    fn recreate(&mut self) -> anyhow::Result<()> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        self.gpu.recreate_presentation(vk::Extent2D {
            width: size.width,
            height: size.height,
        })?;

        let pool = self.gpu.graphics_command_pool().handle();
        for command_buffer in self.command_buffers.drain(..) {
            self.gpu.driver_mut().free_command_buffer(pool, command_buffer);
        }
        self.command_buffers = allocate_frame_buffers(&mut self.gpu)?;

        info!("Recreated chain at {}x{}", size.width, size.height);
        Ok(())
    }
}

fn allocate_frame_buffers(gpu: &mut GpuContext) -> anyhow::Result<Vec<vk::CommandBuffer>> {
    let pool = gpu.graphics_command_pool().handle();
    let count = gpu.chain().len();
    (0..count)
        .map(|_| {
            gpu.driver_mut()
                .allocate_command_buffer(pool)
                .call("vkAllocateCommandBuffers")
                .map_err(Into::into)
        })
        .collect()
}
