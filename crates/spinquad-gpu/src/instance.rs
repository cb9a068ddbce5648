//! Vulkan instance creation and the validation debug messenger.

use crate::config::GpuConfig;
use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::borrow::Cow;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use tracing::Level;

/// Owned Vulkan instance, plus the debug messenger when validation is on.
///
/// Everything created from the instance holds an `Arc<Instance>`, so the
/// instance is destroyed last.
pub struct Instance {
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    raw: ash::Instance,
    entry: ash::Entry,
}

impl Instance {
    /// Load the Vulkan library and create an instance.
    ///
    /// `display` selects the surface extensions the windowing system needs;
    /// pass `None` for headless use.
    pub fn new(config: &GpuConfig, display: Option<RawDisplayHandle>) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;

        let layers = config.enabled_layers();
        if !layers.is_empty() {
            let available = unsafe { entry.enumerate_instance_layer_properties()? };
            let available: Vec<String> = available
                .iter()
                .map(|props| {
                    unsafe { CStr::from_ptr(props.layer_name.as_ptr()) }
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            let missing = missing_layers(&available, layers);
            if !missing.is_empty() {
                return Err(GpuError::MissingValidationLayers(missing));
            }
        }

        let app_name = CString::new(config.name())
            .map_err(|_| GpuError::InvalidState("application name contains a NUL byte".into()))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"spinquad")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extension_names = instance_extensions(display, config.validation_enabled())?;
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        // Chained so that instance creation and destruction are reported too.
        let mut debug_info = debug_messenger_info();
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);
        if config.validation_enabled() {
            create_info = create_info.push_next(&mut debug_info);
        }

        let raw = unsafe { entry.create_instance(&create_info, None)? };

        if tracing::enabled!(Level::DEBUG) {
            let available = unsafe { entry.enumerate_instance_extension_properties(None) }
                .unwrap_or_default();
            tracing::debug!("{} instance extensions available:", available.len());
            for ext in &available {
                let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                tracing::debug!("\t{}", name.to_string_lossy());
            }
        }

        let mut instance = Self {
            debug: None,
            raw,
            entry,
        };

        if config.validation_enabled() {
            let loader = ash::ext::debug_utils::Instance::new(&instance.entry, &instance.raw);
            let messenger =
                unsafe { loader.create_debug_utils_messenger(&debug_messenger_info(), None)? };
            instance.debug = Some((loader, messenger));
            tracing::info!("Validation layers enabled");
        }

        Ok(instance)
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn raw(&self) -> &ash::Instance {
        &self.raw
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.raw.destroy_instance(None);
        }
    }
}

/// Names of `requested` layers absent from `available`.
pub fn missing_layers(available: &[String], requested: &[CString]) -> Vec<String> {
    requested
        .iter()
        .map(|layer| layer.to_string_lossy().into_owned())
        .filter(|name| !available.iter().any(|a| a == name))
        .collect()
}

/// Instance extensions: whatever the display needs for surface creation,
/// plus debug utils when validating.
fn instance_extensions(
    display: Option<RawDisplayHandle>,
    enable_validation: bool,
) -> Result<Vec<*const c_char>> {
    let mut extensions = match display {
        Some(display) => ash_window::enumerate_required_extensions(display)
            .map_err(|e| GpuError::ExtensionNotSupported(format!("surface extensions: {e}")))?
            .to_vec(),
        None => Vec::new(),
    };

    if enable_validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    #[cfg(target_os = "macos")]
    {
        extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());
        extensions.push(ash::khr::get_physical_device_properties2::NAME.as_ptr());
    }

    Ok(extensions)
}

fn debug_messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

/// Map a validation message severity onto a tracing level.
pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Level::ERROR
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Level::WARN
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Level::DEBUG
    } else {
        Level::TRACE
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || unsafe { (*callback_data).p_message.is_null() } {
        Cow::Borrowed("<empty>")
    } else {
        unsafe { CStr::from_ptr((*callback_data).p_message) }.to_string_lossy()
    };

    match severity_level(severity) {
        Level::ERROR => tracing::error!(target: "vulkan", ?message_type, "{message}"),
        Level::WARN => tracing::warn!(target: "vulkan", ?message_type, "{message}"),
        Level::DEBUG => tracing::debug!(target: "vulkan", ?message_type, "{message}"),
        _ => tracing::trace!(target: "vulkan", ?message_type, "{message}"),
    }

    vk::FALSE
}
