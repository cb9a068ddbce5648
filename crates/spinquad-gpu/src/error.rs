//! GPU error types.

use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

/// GPU-related errors.
///
/// Swapchain staleness is not an error: acquire and present report it
/// through [`AcquireOutcome`](crate::AcquireOutcome) and
/// [`PresentOutcome`](crate::PresentOutcome).
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or initialised.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// Validation was requested but a layer is not installed.
    #[error("Validation layers requested, but not available: {}", .0.join(", "))]
    MissingValidationLayers(Vec<String>),

    /// Required extension not supported.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// The instance reports no physical devices at all.
    #[error("Failed to find GPUs with Vulkan support")]
    NoPhysicalDevice,

    /// No enumerated device scored above zero.
    #[error("Failed to find a suitable GPU")]
    NoSuitableDevice,

    /// No memory type matches the resource's type bits and property flags.
    #[error("No memory type matches filter {type_filter:#b} with properties {properties:?}")]
    NoSuitableMemoryType {
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Shader bytes are not a valid SPIR-V module.
    #[error("Invalid shader module: {0}")]
    ShaderModule(String),

    /// An asset file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Texture bytes could not be decoded to RGBA8.
    #[error("Failed to decode image {}: {message}", path.display())]
    ImageDecode { path: PathBuf, message: String },

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Image layout pair without a barrier recipe.
    #[error("Unsupported layout transition: {old:?} -> {new:?}")]
    UnsupportedLayoutTransition {
        old: vk::ImageLayout,
        new: vk::ImageLayout,
    },

    /// A frame fence did not signal within the configured timeout.
    #[error("Timed out after {timeout_ms} ms waiting for frame fence")]
    FenceTimeout { timeout_ms: u64 },

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_item() {
        let err = GpuError::MissingValidationLayers(vec!["VK_LAYER_KHRONOS_validation".into()]);
        assert!(err.to_string().contains("VK_LAYER_KHRONOS_validation"));

        let err = GpuError::FileRead {
            path: PathBuf::from("shaders/vert.spv"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("shaders/vert.spv"));

        let err: GpuError = vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST)));
    }
}
