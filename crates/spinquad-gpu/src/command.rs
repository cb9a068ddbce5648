//! Command pools and command buffer helpers.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use ash::vk;
use std::sync::Arc;

/// Command pool for allocating command buffers.
///
/// Buffers allocated from the pool are freed with it.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
    gpu: Arc<GpuContext>,
}

impl CommandPool {
    pub fn new(
        gpu: &Arc<GpuContext>,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = unsafe { gpu.device().create_command_pool(&create_info, None)? };

        Ok(Self {
            pool,
            queue_family,
            gpu: Arc::clone(gpu),
        })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    /// Allocate `count` primary command buffers.
    pub fn allocate_command_buffers(&self, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { self.gpu.device().allocate_command_buffers(&alloc_info)? };
        Ok(buffers)
    }

    /// Return buffers to the pool.
    ///
    /// # Safety
    /// The buffers must come from this pool and not be pending execution.
    pub unsafe fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        unsafe {
            self.gpu.device().free_command_buffers(self.pool, buffers);
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.gpu.device().destroy_command_pool(self.pool, None);
        }
    }
}

/// Begin recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn begin_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    unsafe { device.begin_command_buffer(cmd, &begin_info)? };
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    unsafe { device.end_command_buffer(cmd)? };
    Ok(())
}

/// Submit one command buffer to a queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffer(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let command_buffers = [cmd];
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(&command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    unsafe { device.queue_submit(queue, &[submit_info], fence)? };
    Ok(())
}

/// Record commands into a one-shot buffer, submit on `queue` and block
/// until the queue is idle.
///
/// The buffer is freed whether or not recording succeeds.
pub fn execute_single_time_commands<F>(pool: &CommandPool, queue: vk::Queue, f: F) -> Result<()>
where
    F: FnOnce(&ash::Device, vk::CommandBuffer) -> Result<()>,
{
    let device = pool.gpu.device();
    let cmd = pool
        .allocate_command_buffers(1)?
        .first()
        .copied()
        .ok_or_else(|| GpuError::InvalidState("no command buffer allocated".into()))?;

    let result = unsafe { record_and_wait(device, queue, cmd, f) };

    unsafe { pool.free_command_buffers(&[cmd]) };

    result
}

unsafe fn record_and_wait<F>(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    f: F,
) -> Result<()>
where
    F: FnOnce(&ash::Device, vk::CommandBuffer) -> Result<()>,
{
    unsafe {
        begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        f(device, cmd)?;
        end_command_buffer(device, cmd)?;
        submit_command_buffer(device, queue, cmd, &[], &[], &[], vk::Fence::null())?;
        device.queue_wait_idle(queue)?;
    }
    Ok(())
}
