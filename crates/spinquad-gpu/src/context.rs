//! Logical device management.

use crate::capabilities::{select_best_candidate, DeviceCandidate, DeviceRequirements};
use crate::config::GpuConfig;
use crate::error::{GpuError, Result};
use crate::instance::Instance;
use crate::memory::find_memory_type;
use crate::surface::Surface;
use ash::vk;
use std::os::raw::c_char;
use std::sync::Arc;

/// The selected physical device, its logical device and queues.
///
/// Every GPU resource holds an `Arc<GpuContext>`, so the logical device is
/// destroyed only after all of them.
pub struct GpuContext {
    device: ash::Device,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
    candidate: DeviceCandidate,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    max_sampler_anisotropy: f32,
    anisotropy_enabled: bool,

    // Queue families and queues
    graphics_queue_family: u32,
    present_queue_family: u32,
    transfer_queue_family: u32,
    unique_families: Vec<u32>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    transfer_queue: vk::Queue,

    instance: Arc<Instance>,
}

impl GpuContext {
    /// Select the best physical device and open it.
    ///
    /// Pass the window surface to require presentation support; `None`
    /// selects among all devices for offscreen work.
    pub fn new(instance: &Arc<Instance>, surface: Option<&Surface>, config: &GpuConfig) -> Result<Self> {
        let physical_devices = unsafe { instance.raw().enumerate_physical_devices()? };
        if physical_devices.is_empty() {
            return Err(GpuError::NoPhysicalDevice);
        }

        let candidates = physical_devices
            .iter()
            .map(|&pd| unsafe {
                DeviceCandidate::probe(instance.raw(), pd, surface, config.required_device_extensions())
            })
            .collect::<Result<Vec<_>>>()?;

        let selected = select_best_candidate(&candidates, DeviceRequirements::from(config))?;
        let candidate = candidates[selected].clone();
        tracing::info!("Selected GPU: {}", candidate.summary());

        let families = candidate.queue_families;
        let (Some(graphics), Some(present), Some(transfer)) =
            (families.graphics, families.present, families.transfer)
        else {
            return Err(GpuError::InvalidState(
                "selected device has unresolved queue families".into(),
            ));
        };
        let unique_families = families.unique_families();

        let anisotropy_enabled = candidate.supports_anisotropy;
        let device = unsafe {
            create_device(
                instance.raw(),
                candidate.physical_device,
                &unique_families,
                config,
                anisotropy_enabled,
            )?
        };

        let (graphics_queue, present_queue, transfer_queue) = unsafe {
            (
                device.get_device_queue(graphics, 0),
                device.get_device_queue(present, 0),
                device.get_device_queue(transfer, 0),
            )
        };
        tracing::debug!(
            "Queue families: graphics={graphics} present={present} transfer={transfer}"
        );

        let presenting = config
            .required_device_extensions()
            .iter()
            .any(|ext| ext.as_c_str() == ash::khr::swapchain::NAME);
        let swapchain_loader =
            presenting.then(|| ash::khr::swapchain::Device::new(instance.raw(), &device));

        let (memory_properties, properties) = unsafe {
            (
                instance
                    .raw()
                    .get_physical_device_memory_properties(candidate.physical_device),
                instance
                    .raw()
                    .get_physical_device_properties(candidate.physical_device),
            )
        };

        Ok(Self {
            device,
            swapchain_loader,
            candidate,
            memory_properties,
            max_sampler_anisotropy: properties.limits.max_sampler_anisotropy,
            anisotropy_enabled,
            graphics_queue_family: graphics,
            present_queue_family: present,
            transfer_queue_family: transfer,
            unique_families,
            graphics_queue,
            present_queue,
            transfer_queue,
            instance: Arc::clone(instance),
        })
    }

    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.candidate.physical_device
    }

    /// Description of the selected device.
    pub fn candidate(&self) -> &DeviceCandidate {
        &self.candidate
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Swapchain function table; absent on offscreen contexts.
    pub fn swapchain_loader(&self) -> Result<&ash::khr::swapchain::Device> {
        self.swapchain_loader.as_ref().ok_or_else(|| {
            GpuError::ExtensionNotSupported(
                ash::khr::swapchain::NAME.to_string_lossy().into_owned(),
            )
        })
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn transfer_queue(&self) -> vk::Queue {
        self.transfer_queue
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    pub fn present_queue_family(&self) -> u32 {
        self.present_queue_family
    }

    pub fn transfer_queue_family(&self) -> u32 {
        self.transfer_queue_family
    }

    /// Distinct queue families in use, sorted.
    pub fn unique_queue_families(&self) -> &[u32] {
        &self.unique_families
    }

    /// Sharing mode for images and buffers touched by several families.
    pub fn sharing_mode(&self) -> vk::SharingMode {
        sharing_mode(&self.unique_families)
    }

    /// Anisotropy level for samplers, or `None` when the feature is off.
    pub fn sampler_anisotropy(&self) -> Option<f32> {
        self.anisotropy_enabled.then_some(self.max_sampler_anisotropy)
    }

    /// Index of the first memory type matching `type_filter` and `properties`.
    pub fn memory_type_index(
        &self,
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<u32> {
        find_memory_type(&self.memory_properties, type_filter, properties)
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// CONCURRENT across several families; EXCLUSIVE when only one is in use.
pub fn sharing_mode(families: &[u32]) -> vk::SharingMode {
    if families.len() > 1 {
        vk::SharingMode::CONCURRENT
    } else {
        vk::SharingMode::EXCLUSIVE
    }
}

/// Create the logical device with one queue per distinct family.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    unique_families: &[u32],
    config: &GpuConfig,
    enable_anisotropy: bool,
) -> Result<ash::Device> {
    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const c_char> = config
        .required_device_extensions()
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(enable_anisotropy);

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_family_is_exclusive() {
        assert_eq!(sharing_mode(&[0]), vk::SharingMode::EXCLUSIVE);
        assert_eq!(sharing_mode(&[0, 2]), vk::SharingMode::CONCURRENT);
    }
}
