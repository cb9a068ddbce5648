//! Window surfaces.
//!
//! Wraps the `VkSurfaceKHR` created for a window and the queries device
//! selection and swapchain setup make against it.

use crate::error::{GpuError, Result};
use crate::instance::Instance;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Presentation surface for one window.
///
/// Must be dropped before the window it was created from.
pub struct Surface {
    raw: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
    instance: Arc<Instance>,
}

impl Surface {
    /// Create a surface for a window.
    pub fn from_window<W>(instance: &Arc<Instance>, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let raw = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.raw(),
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let loader = ash::khr::surface::Instance::new(instance.entry(), instance.raw());

        Ok(Self {
            raw,
            loader,
            instance: Arc::clone(instance),
        })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.raw
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Whether queue family `family` of `physical_device` can present here.
    ///
    /// # Safety
    /// The physical device must come from this surface's instance.
    pub unsafe fn supports_queue_family(
        &self,
        physical_device: vk::PhysicalDevice,
        family: u32,
    ) -> Result<bool> {
        let supported = unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, family, self.raw)?
        };
        Ok(supported)
    }

    /// Query capabilities, formats and present modes.
    ///
    /// # Safety
    /// The physical device must come from this surface's instance.
    pub unsafe fn swapchain_support(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<SwapchainSupport> {
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(physical_device, self.raw)?;
            let formats = self
                .loader
                .get_physical_device_surface_formats(physical_device, self.raw)?;
            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(physical_device, self.raw)?;

            Ok(SwapchainSupport {
                capabilities,
                formats,
                present_modes,
            })
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.raw, None);
        }
    }
}

/// Surface query result.
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// A swapchain can be built only if both lists are non-empty.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}
