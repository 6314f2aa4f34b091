//! Command pools, queue submission and one-shot commands.

use ash::vk;

use crate::driver::Driver;
use crate::error::{Result, VkResultExt};

/// Command pool bound to one queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually, so per-frame
    /// re-recording never needs a pool-level reset.
    pub fn new<D: Driver + ?Sized>(driver: &mut D, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = driver
            .create_command_pool(&create_info)
            .call("vkCreateCommandPool")?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }
}

/// The graphics and compute pools owned by a context.
#[derive(Debug, Clone, Copy)]
pub struct CommandPools {
    pub graphics: CommandPool,
    pub compute: CommandPool,
}

/// One queue submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubmitBatch<'a> {
    pub command_buffers: &'a [vk::CommandBuffer],
    pub wait_semaphores: &'a [vk::Semaphore],
    /// One stage mask per wait semaphore.
    pub wait_stages: &'a [vk::PipelineStageFlags],
    pub signal_semaphores: &'a [vk::Semaphore],
}

impl<'a> SubmitBatch<'a> {
    /// A batch that only executes `command_buffers`.
    pub fn commands(command_buffers: &'a [vk::CommandBuffer]) -> Self {
        Self {
            command_buffers,
            ..Default::default()
        }
    }

    /// Build the raw submit info. The result borrows from this batch.
    pub fn to_vk(&self) -> vk::SubmitInfo<'a> {
        vk::SubmitInfo::default()
            .command_buffers(self.command_buffers)
            .wait_semaphores(self.wait_semaphores)
            .wait_dst_stage_mask(self.wait_stages)
            .signal_semaphores(self.signal_semaphores)
    }
}

/// A primary command buffer recorded, submitted and waited on once.
///
/// Dropping the scope always frees the buffer. If the buffer reached the
/// queue but the idle wait did not complete, drop waits first so the buffer
/// is never freed while pending.
pub struct OneShotCommand<'d, D: Driver + ?Sized> {
    driver: &'d mut D,
    pool: vk::CommandPool,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
    submitted: bool,
    idle: bool,
}

impl<'d, D: Driver + ?Sized> OneShotCommand<'d, D> {
    /// Allocate a primary buffer from `pool` and begin recording.
    pub fn begin(driver: &'d mut D, pool: &CommandPool, queue: vk::Queue) -> Result<Self> {
        let command_buffer = driver
            .allocate_command_buffer(pool.handle())
            .call("vkAllocateCommandBuffers")?;

        let mut scope = Self {
            driver,
            pool: pool.handle(),
            queue,
            command_buffer,
            submitted: false,
            idle: false,
        };

        scope
            .driver
            .begin_command_buffer(command_buffer, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .call("vkBeginCommandBuffer")?;

        Ok(scope)
    }

    /// The buffer being recorded.
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// The driver, for recording arbitrary commands into [`Self::command_buffer`].
    pub fn driver(&mut self) -> &mut D {
        &mut *self.driver
    }

    /// Record a single image memory barrier.
    pub fn image_barrier(
        &mut self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    ) {
        self.driver
            .cmd_image_barrier(self.command_buffer, src_stage, dst_stage, barrier);
    }

    /// End recording, submit, and block until the queue is idle.
    pub fn submit(mut self) -> Result<()> {
        self.driver
            .end_command_buffer(self.command_buffer)
            .call("vkEndCommandBuffer")?;

        let command_buffers = [self.command_buffer];
        self.driver
            .queue_submit(self.queue, &SubmitBatch::commands(&command_buffers))
            .call("vkQueueSubmit")?;
        self.submitted = true;

        self.driver
            .queue_wait_idle(self.queue)
            .call("vkQueueWaitIdle")?;
        self.idle = true;

        Ok(())
    }
}

impl<D: Driver + ?Sized> Drop for OneShotCommand<'_, D> {
    fn drop(&mut self) {
        if self.submitted && !self.idle {
            if let Err(e) = self.driver.queue_wait_idle(self.queue) {
                tracing::error!("Queue wait before freeing one-shot command failed: {e}");
            }
        }
        self.driver
            .free_command_buffer(self.pool, self.command_buffer);
    }
}

/// Execute a single-time command buffer.
///
/// `f` records into the buffer through the scope; the call returns once the
/// queue has gone idle.
pub fn execute_one_shot<D, F>(
    driver: &mut D,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<()>
where
    D: Driver + ?Sized,
    F: FnOnce(&mut OneShotCommand<'_, D>),
{
    let mut command = OneShotCommand::begin(driver, pool, queue)?;
    f(&mut command);
    command.submit()
}
