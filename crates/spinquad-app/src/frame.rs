//! Per-slot frame resources.

use std::mem::size_of;
use std::sync::Arc;

use ash::vk;
use spinquad_core::UniformBufferObject;
use spinquad_gpu::{
    write_combined_image_sampler, write_uniform_buffer, FrameSync, GpuContext, Result, Texture,
    UniformBuffer,
};

/// Everything one frame in flight owns exclusively.
///
/// The command buffer and descriptor set are freed with their pools.
pub(crate) struct FrameSlot {
    pub(crate) uniforms: UniformBuffer<UniformBufferObject>,
    pub(crate) sync: FrameSync,
    pub(crate) command_buffer: vk::CommandBuffer,
    pub(crate) descriptor_set: vk::DescriptorSet,
}

impl FrameSlot {
    /// Create the slot's sync objects and uniform buffer, then point
    /// `descriptor_set` at the uniform buffer (binding 0) and `texture`
    /// (binding 1).
    pub(crate) fn new(
        gpu: &Arc<GpuContext>,
        command_buffer: vk::CommandBuffer,
        descriptor_set: vk::DescriptorSet,
        texture: &Texture,
    ) -> Result<Self> {
        let sync = FrameSync::new(gpu)?;
        let uniforms = UniformBuffer::<UniformBufferObject>::new(gpu)?;

        unsafe {
            write_uniform_buffer(
                gpu.device(),
                descriptor_set,
                0,
                uniforms.buffer().handle(),
                0,
                size_of::<UniformBufferObject>() as vk::DeviceSize,
            );
            write_combined_image_sampler(
                gpu.device(),
                descriptor_set,
                1,
                texture.view(),
                texture.sampler(),
            );
        }

        Ok(Self {
            uniforms,
            sync,
            command_buffer,
            descriptor_set,
        })
    }
}
