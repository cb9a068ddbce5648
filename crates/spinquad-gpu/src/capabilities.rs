//! Physical device probing, scoring and selection.
//!
//! Probing talks to Vulkan; scoring and selection work on plain
//! [`DeviceCandidate`] values so they can be exercised without a GPU.

use crate::config::GpuConfig;
use crate::error::{GpuError, Result};
use crate::surface::{Surface, SwapchainSupport};
use ash::vk;
use std::collections::HashSet;
use std::ffi::{CStr, CString};

/// Bonus for sampler anisotropy when the config asks for it.
pub const ANISOTROPY_BONUS: u32 = 100;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Resolved queue family slots.
///
/// Graphics, present and transfer may all name the same family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
    pub transfer: Option<u32>,
}

impl QueueFamilyIndices {
    /// Resolve slots from a device's family list.
    ///
    /// `present_support[i]` says whether family `i` can present to the
    /// target surface. With `None` (headless) presentation is routed to the
    /// graphics family.
    pub fn resolve(families: &[vk::QueueFamilyProperties], present_support: Option<&[bool]>) -> Self {
        let graphics = families
            .iter()
            .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32);

        // Dedicated transfer family if the hardware has one
        let transfer = families
            .iter()
            .position(|f| {
                f.queue_flags.contains(vk::QueueFlags::TRANSFER)
                    && !f.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            })
            .map(|i| i as u32)
            .or(graphics);

        let present = match present_support {
            None => graphics,
            Some(support) => {
                let supports = |i: u32| support.get(i as usize).copied().unwrap_or(false);
                graphics
                    .filter(|&g| supports(g))
                    .or_else(|| (0..families.len() as u32).find(|&i| supports(i)))
            }
        };

        Self {
            graphics,
            present,
            transfer,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some() && self.transfer.is_some()
    }

    /// Sorted, de-duplicated resolved families.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families: Vec<u32> = [self.graphics, self.present, self.transfer]
            .into_iter()
            .flatten()
            .collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}

/// Everything selection needs to know about one physical device.
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub vendor: GpuVendor,
    pub api_version: u32,
    pub device_type: vk::PhysicalDeviceType,
    pub max_image_dimension_2d: u32,
    pub queue_families: QueueFamilyIndices,
    /// Required device extensions the driver does not expose.
    pub missing_extensions: Vec<String>,
    /// `None` when probing without a surface.
    pub swapchain_support: Option<SwapchainSupport>,
    pub supports_anisotropy: bool,
}

impl DeviceCandidate {
    /// Human-readable one-liner for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{}",
            self.name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }

    fn swapchain_adequate(&self) -> bool {
        self.swapchain_support
            .as_ref()
            .map_or(true, SwapchainSupport::is_adequate)
    }

    /// Query a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn probe(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: Option<&Surface>,
        required_extensions: &[CString],
    ) -> Result<Self> {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let features = unsafe { instance.get_physical_device_features(physical_device) };
        let families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let available: HashSet<String> =
            unsafe { instance.enumerate_device_extension_properties(physical_device)? }
                .iter()
                .map(|ext| {
                    unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
        let missing_extensions = required_extensions
            .iter()
            .map(|ext| ext.to_string_lossy().into_owned())
            .filter(|ext| !available.contains(ext))
            .collect();

        let (queue_families, swapchain_support) = match surface {
            Some(surface) => {
                let support = (0..families.len() as u32)
                    .map(|i| unsafe { surface.supports_queue_family(physical_device, i) })
                    .collect::<Result<Vec<bool>>>()?;
                let indices = QueueFamilyIndices::resolve(&families, Some(support.as_slice()));
                let swapchain = unsafe { surface.swapchain_support(physical_device)? };
                (indices, Some(swapchain))
            }
            None => (QueueFamilyIndices::resolve(&families, None), None),
        };

        Ok(Self {
            physical_device,
            name: unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
                .to_string_lossy()
                .into_owned(),
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            api_version: properties.api_version,
            device_type: properties.device_type,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            queue_families,
            missing_extensions,
            swapchain_support,
            supports_anisotropy: features.sampler_anisotropy == vk::TRUE,
        })
    }
}

/// What a candidate must offer to score above zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceRequirements {
    pub anisotropy: bool,
}

impl From<&GpuConfig> for DeviceRequirements {
    fn from(config: &GpuConfig) -> Self {
        Self {
            anisotropy: config.require_anisotropy,
        }
    }
}

/// Score a candidate; zero means disqualified.
pub fn rate_device_suitability(candidate: &DeviceCandidate, requirements: DeviceRequirements) -> u32 {
    if !candidate.queue_families.is_complete()
        || !candidate.missing_extensions.is_empty()
        || !candidate.swapchain_adequate()
        || (requirements.anisotropy && !candidate.supports_anisotropy)
    {
        return 0;
    }

    let mut score: u32 = match candidate.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 500,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 200,
        vk::PhysicalDeviceType::CPU => 100,
        _ => 0,
    };

    score = score.saturating_add(candidate.max_image_dimension_2d);

    if requirements.anisotropy && candidate.supports_anisotropy {
        score = score.saturating_add(ANISOTROPY_BONUS);
    }

    score
}

/// Index of the highest non-zero score; the first one discovered wins ties.
pub fn select_best_candidate(
    candidates: &[DeviceCandidate],
    requirements: DeviceRequirements,
) -> Result<usize> {
    if candidates.is_empty() {
        return Err(GpuError::NoPhysicalDevice);
    }

    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = rate_device_suitability(candidate, requirements);
        tracing::debug!("Device candidate {}: score {}", candidate.summary(), score);
        if score > 0 && best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index).ok_or(GpuError::NoSuitableDevice)
}
