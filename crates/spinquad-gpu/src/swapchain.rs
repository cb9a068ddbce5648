//! Swapchain management.
//!
//! A [`Swapchain`] owns its image views and framebuffers, which share its
//! lifecycle. Staleness is reported as [`AcquireOutcome::OutOfDate`] or a
//! non-`Presented` [`PresentOutcome`] and handled by rebuilding.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::memory::create_color_view;
use crate::surface::Surface;
use ash::vk;
use std::sync::Arc;

/// Result of acquiring the next presentable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32, suboptimal: bool },
    /// No image was acquired and the image-available semaphore is untouched.
    OutOfDate,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentOutcome {
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Presented)
    }
}

/// Swapchain wrapper.
pub struct Swapchain {
    raw: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    surface: Arc<Surface>,
    gpu: Arc<GpuContext>,
}

impl Swapchain {
    /// Create a swapchain and one view per image.
    ///
    /// `framebuffer_size` is the window's drawable size in pixels, used
    /// when the surface leaves the extent up to the application.
    pub fn new(
        gpu: &Arc<GpuContext>,
        surface: &Arc<Surface>,
        framebuffer_size: (u32, u32),
        vsync: bool,
    ) -> Result<Self> {
        let loader = gpu.swapchain_loader()?;
        let support = unsafe { surface.swapchain_support(gpu.physical_device())? };

        let format = choose_surface_format(&support.formats)
            .ok_or_else(|| GpuError::SwapchainCreation("surface reports no formats".into()))?;
        let present_mode = choose_present_mode(&support.present_modes, vsync);
        let extent = choose_extent(&support.capabilities, framebuffer_size.0, framebuffer_size.1);
        let image_count = choose_image_count(&support.capabilities);

        let families = gpu.unique_queue_families();
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(gpu.sharing_mode())
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());
        if gpu.sharing_mode() == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(families);
        }

        let raw = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let mut swapchain = Self {
            raw,
            images: Vec::new(),
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            format,
            present_mode,
            extent,
            surface: Arc::clone(surface),
            gpu: Arc::clone(gpu),
        };

        swapchain.images = unsafe { loader.get_swapchain_images(raw)? };
        for &image in &swapchain.images {
            let view = create_color_view(gpu.device(), image, format.format)?;
            swapchain.image_views.push(view);
        }

        tracing::info!(
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            swapchain.images.len(),
            format.format,
            present_mode
        );

        Ok(swapchain)
    }

    /// Create one framebuffer per image view for `render_pass`.
    pub fn create_framebuffers(&mut self, render_pass: vk::RenderPass) -> Result<()> {
        self.destroy_framebuffers();
        for &view in &self.image_views {
            let attachments = [view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);
            let framebuffer =
                unsafe { self.gpu.device().create_framebuffer(&framebuffer_info, None)? };
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn destroy_framebuffers(&mut self) {
        for framebuffer in self.framebuffers.drain(..) {
            unsafe { self.gpu.device().destroy_framebuffer(framebuffer, None) };
        }
    }

    /// Destroy framebuffers, then views, then the swapchain itself.
    ///
    /// Safe to call more than once. The device must be idle.
    pub fn release(&mut self) {
        self.destroy_framebuffers();
        unsafe {
            for view in self.image_views.drain(..) {
                self.gpu.device().destroy_image_view(view, None);
            }
            if self.raw != vk::SwapchainKHR::null() {
                if let Ok(loader) = self.gpu.swapchain_loader() {
                    loader.destroy_swapchain(self.raw, None);
                }
                self.raw = vk::SwapchainKHR::null();
            }
        }
        self.images.clear();
    }

    /// Acquire the next image, signalling `semaphore` when it is ready.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<AcquireOutcome> {
        let loader = self.gpu.swapchain_loader()?;
        let result = unsafe {
            loader.acquire_next_image(self.raw, u64::MAX, semaphore, vk::Fence::null())
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Queue `image_index` for presentation after `wait_semaphores`.
    pub fn present(&self, image_index: u32, wait_semaphores: &[vk::Semaphore]) -> Result<PresentOutcome> {
        let loader = self.gpu.swapchain_loader()?;
        let swapchains = [self.raw];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { loader.queue_present(self.gpu.present_queue(), &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.raw
    }

    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.release();
    }
}

/// Prefer BGRA8 sRGB with the sRGB non-linear color space, else the first
/// format offered.
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_SRGB
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
}

/// MAILBOX when offered and vsync is off, otherwise FIFO (always supported).
pub fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if !vsync && available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent, or the drawable size clamped to the
/// surface bounds when the current extent is the `u32::MAX` sentinel.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One more than the minimum, capped by the maximum when there is one.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undefined_extent_caps() -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn extent_follows_window_inside_bounds() {
        let caps = undefined_extent_caps();
        assert_eq!(
            choose_extent(&caps, 1920, 1080),
            vk::Extent2D {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn extent_clamps_to_surface_maximum() {
        let caps = undefined_extent_caps();
        assert_eq!(
            choose_extent(&caps, 8000, 8000),
            vk::Extent2D {
                width: 4096,
                height: 4096
            }
        );
    }

    #[test]
    fn definite_current_extent_is_used_verbatim() {
        let mut caps = undefined_extent_caps();
        caps.current_extent = vk::Extent2D {
            width: 640,
            height: 480,
        };
        assert_eq!(choose_extent(&caps, 1920, 1080), caps.current_extent);
    }

    #[test]
    fn present_mode_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO], false),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO], false),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn vsync_forces_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn surface_format_prefers_bgra8_srgb_pair() {
        let preferred = format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            preferred,
        ];
        assert_eq!(choose_surface_format(&formats), Some(preferred));
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn image_count_adds_one_and_respects_maximum() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps), 3);

        caps.max_image_count = 2;
        assert_eq!(choose_image_count(&caps), 2);

        caps.min_image_count = 1;
        caps.max_image_count = 8;
        assert_eq!(choose_image_count(&caps), 2);
    }

    #[test]
    fn only_clean_present_skips_rebuild() {
        assert!(!PresentOutcome::Presented.needs_rebuild());
        assert!(PresentOutcome::Suboptimal.needs_rebuild());
        assert!(PresentOutcome::OutOfDate.needs_rebuild());
    }
}
