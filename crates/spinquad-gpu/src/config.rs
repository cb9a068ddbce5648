//! GPU setup configuration.

use std::ffi::{CStr, CString};

/// Standard Khronos validation layer.
pub const KHRONOS_VALIDATION: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Immutable settings consumed by instance creation, device selection and
/// swapchain setup.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    pub(crate) app_name: String,
    pub(crate) enable_validation: bool,
    pub(crate) validation_layers: Vec<CString>,
    pub(crate) device_extensions: Vec<CString>,
    pub(crate) require_anisotropy: bool,
    pub(crate) vsync: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            app_name: "spinquad".to_string(),
            enable_validation: cfg!(debug_assertions),
            validation_layers: vec![KHRONOS_VALIDATION.to_owned()],
            device_extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            require_anisotropy: false,
            vsync: false,
        }
    }
}

impl GpuConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings for offscreen use: no swapchain extension, validation off.
    pub fn headless() -> Self {
        Self {
            enable_validation: false,
            device_extensions: Vec::new(),
            ..Self::default()
        }
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Replace the set of layers enabled when validation is on.
    pub fn validation_layers(mut self, layers: impl IntoIterator<Item = CString>) -> Self {
        self.validation_layers = layers.into_iter().collect();
        self
    }

    /// Replace the device extensions a candidate must support.
    pub fn device_extensions(mut self, extensions: impl IntoIterator<Item = CString>) -> Self {
        self.device_extensions = extensions.into_iter().collect();
        self
    }

    /// Reject devices without sampler anisotropy.
    pub fn require_anisotropy(mut self, require: bool) -> Self {
        self.require_anisotropy = require;
        self
    }

    /// Force FIFO presentation.
    pub fn vsync(mut self, enable: bool) -> Self {
        self.vsync = enable;
        self
    }

    pub fn name(&self) -> &str {
        &self.app_name
    }

    pub fn validation_enabled(&self) -> bool {
        self.enable_validation
    }

    pub fn vsync_enabled(&self) -> bool {
        self.vsync
    }

    /// Layers to request at instance creation; empty when validation is off.
    pub fn enabled_layers(&self) -> &[CString] {
        if self.enable_validation {
            &self.validation_layers
        } else {
            &[]
        }
    }

    pub fn required_device_extensions(&self) -> &[CString] {
        &self.device_extensions
    }
}
