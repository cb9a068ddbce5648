//! Sampled textures and image layout transitions.

use crate::command::{execute_single_time_commands, CommandPool};
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::memory::{color_subresource_range, Image};
use crate::upload::staging_buffer;
use ash::vk;
use std::sync::Arc;

/// Access masks and stages for one image layout change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier recipe for moving an image from `old` to `new`.
///
/// Only the transitions a texture upload needs are defined; anything else
/// is rejected rather than guessed.
pub fn layout_transition(old: vk::ImageLayout, new: vk::ImageLayout) -> Result<LayoutTransition> {
    match (old, new) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(LayoutTransition {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(LayoutTransition {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        (old, new) => Err(GpuError::UnsupportedLayoutTransition { old, new }),
    }
}

impl Image {
    /// Record a barrier from the tracked layout to `new_layout` and update
    /// the tracked layout.
    ///
    /// # Safety
    /// `cmd` must be recording and belong to this image's device.
    pub unsafe fn record_layout_transition(
        &mut self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        new_layout: vk::ImageLayout,
    ) -> Result<()> {
        let transition = layout_transition(self.layout, new_layout)?;

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(self.layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.handle())
            .subresource_range(color_subresource_range())
            .src_access_mask(transition.src_access)
            .dst_access_mask(transition.dst_access);

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                transition.src_stage,
                transition.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }

        self.layout = new_layout;
        Ok(())
    }
}

/// Device-local RGBA8 image with a view and sampler, ready for sampling.
pub struct Texture {
    sampler: vk::Sampler,
    view: vk::ImageView,
    image: Image,
    gpu: Arc<GpuContext>,
}

impl Texture {
    /// Upload tightly packed sRGB RGBA8 pixels.
    ///
    /// Transitions and the copy are recorded on `queue`, which must support
    /// graphics since the final barrier targets the fragment stage.
    pub fn from_rgba8(
        pool: &CommandPool,
        queue: vk::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(GpuError::InvalidState(format!(
                "texture {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }

        let gpu = pool.gpu();
        let staging = staging_buffer(pool, pixels)?;
        let extent = vk::Extent2D { width, height };
        let mut image = Image::new(
            gpu,
            extent,
            vk::Format::R8G8B8A8_SRGB,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        execute_single_time_commands(pool, queue, |device, cmd| unsafe {
            image.record_layout_transition(device, cmd, vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(0)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .image_offset(vk::Offset3D::default())
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                });
            device.cmd_copy_buffer_to_image(
                cmd,
                staging.handle(),
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            image.record_layout_transition(device, cmd, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        })?;

        let mut texture = Self {
            sampler: vk::Sampler::null(),
            view: vk::ImageView::null(),
            image,
            gpu: Arc::clone(gpu),
        };
        texture.view = texture.image.create_view()?;
        texture.sampler = create_sampler(gpu)?;

        tracing::info!("Texture uploaded: {width}x{height}");
        Ok(texture)
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    pub fn image(&self) -> &Image {
        &self.image
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.gpu.device().destroy_sampler(self.sampler, None);
            self.gpu.device().destroy_image_view(self.view, None);
        }
    }
}

/// Linear, repeating sampler; anisotropic when the device enabled it.
fn create_sampler(gpu: &GpuContext) -> Result<vk::Sampler> {
    let anisotropy = gpu.sampler_anisotropy();
    let sampler_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(anisotropy.is_some())
        .max_anisotropy(anisotropy.unwrap_or(1.0))
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(0.0);

    let sampler = unsafe { gpu.device().create_sampler(&sampler_info, None)? };
    Ok(sampler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_transition_waits_for_nothing_and_gates_transfer() {
        let t = layout_transition(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(t.src_access, vk::AccessFlags::empty());
        assert_eq!(t.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(t.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn sampling_transition_orders_write_before_fragment_read() {
        let t = layout_transition(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(t.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(t.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(t.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn other_pairs_are_rejected() {
        for (old, new) in [
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            (vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
        ] {
            let err = layout_transition(old, new).unwrap_err();
            assert!(
                matches!(err, GpuError::UnsupportedLayoutTransition { old: o, new: n } if o == old && n == new)
            );
        }
    }
}
