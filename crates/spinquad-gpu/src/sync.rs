//! Synchronization primitives.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use ash::vk;
use std::sync::Arc;
use std::time::Duration;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = unsafe { device.create_semaphore(&create_info, None)? };
    Ok(semaphore)
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = unsafe { device.create_fence(&create_info, None)? };
    Ok(fence)
}

/// Sync objects for one frame slot.
///
/// The fence starts signaled so the first wait on a fresh slot returns
/// immediately.
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is ready for rendering
    pub image_available: vk::Semaphore,
    /// Signaled when the slot's commands finish; presentation waits on it
    pub render_finished: vk::Semaphore,
    /// Signaled when the slot's submission completes on the device
    pub in_flight: vk::Fence,
    gpu: Arc<GpuContext>,
}

impl FrameSync {
    pub fn new(gpu: &Arc<GpuContext>) -> Result<Self> {
        let mut sync = Self {
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight: vk::Fence::null(),
            gpu: Arc::clone(gpu),
        };

        unsafe {
            sync.image_available = create_semaphore(gpu.device())?;
            sync.render_finished = create_semaphore(gpu.device())?;
            sync.in_flight = create_fence(gpu.device(), true)?;
        }

        Ok(sync)
    }

    /// Block until the slot's fence signals, or fail after `timeout`.
    pub fn wait(&self, timeout: Duration) -> Result<()> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        match unsafe { self.gpu.device().wait_for_fences(&[self.in_flight], true, timeout_ns) } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(GpuError::FenceTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Reset the fence to unsignaled ahead of a submission.
    pub fn reset(&self) -> Result<()> {
        unsafe { self.gpu.device().reset_fences(&[self.in_flight])? };
        Ok(())
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            let device = self.gpu.device();
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight, None);
        }
    }
}
