//! Staging transfers between host memory and device-local buffers.
//!
//! Every transfer is synchronous: the copy is submitted on the given queue
//! and the queue is drained before the staging buffer is released. That is
//! fine for load-time uploads and tests, not for per-frame data.

use crate::command::{execute_single_time_commands, CommandPool};
use crate::error::{GpuError, Result};
use crate::memory::Buffer;
use ash::vk;

const STAGING_PROPERTIES: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Create a host-visible staging buffer filled with `data`.
pub fn staging_buffer(pool: &CommandPool, data: &[u8]) -> Result<Buffer> {
    if data.is_empty() {
        return Err(GpuError::InvalidState("empty upload".into()));
    }
    let staging = Buffer::new(
        pool.gpu(),
        data.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        STAGING_PROPERTIES,
    )?;
    staging.write_bytes(data)?;
    Ok(staging)
}

/// Copy `size` bytes from the start of `src` to the start of `dst`.
pub fn copy_buffer(
    pool: &CommandPool,
    queue: vk::Queue,
    src: &Buffer,
    dst: &Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    execute_single_time_commands(pool, queue, |device, cmd| {
        let region = vk::BufferCopy::default().size(size);
        unsafe { device.cmd_copy_buffer(cmd, src.handle(), dst.handle(), &[region]) };
        Ok(())
    })
}

/// Upload `data` into a new device-local buffer with `usage`
/// (`TRANSFER_DST` is added).
pub fn upload_to_device_local(
    pool: &CommandPool,
    queue: vk::Queue,
    data: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<Buffer> {
    let staging = staging_buffer(pool, data)?;
    let buffer = Buffer::new(
        pool.gpu(),
        staging.size(),
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    copy_buffer(pool, queue, &staging, &buffer, staging.size())?;
    tracing::debug!("Uploaded {} bytes via staging ({:?})", data.len(), usage);

    Ok(buffer)
}

/// Copy a device-local buffer back into host memory through a second
/// staging buffer. `src` needs `TRANSFER_SRC` usage.
pub fn read_back(pool: &CommandPool, queue: vk::Queue, src: &Buffer) -> Result<Vec<u8>> {
    let staging = Buffer::new(
        pool.gpu(),
        src.size(),
        vk::BufferUsageFlags::TRANSFER_DST,
        STAGING_PROPERTIES,
    )?;
    copy_buffer(pool, queue, src, &staging, src.size())?;
    staging.read_bytes()
}
