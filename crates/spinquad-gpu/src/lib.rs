//! Vulkan abstraction layer for the spinquad renderer.
//!
//! This crate provides:
//! - Vulkan instance creation with optional validation and a tracing-backed
//!   debug messenger
//! - Physical device scoring and queue family resolution
//! - Surface, swapchain, render pass and graphics pipeline handling
//! - Buffers, images and textures over explicitly chosen memory types
//! - Staging uploads, one-shot command buffers and per-frame sync objects
//!
//! Every Vulkan object is owned by a wrapper that destroys it on drop and
//! keeps its parent alive through an [`Arc`](std::sync::Arc), so a partially
//! initialised renderer cleans up in reverse creation order.

pub mod capabilities;
pub mod command;
pub mod config;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod upload;

pub use capabilities::{
    rate_device_suitability, select_best_candidate, DeviceCandidate, DeviceRequirements,
    GpuVendor, QueueFamilyIndices,
};
pub use command::{execute_single_time_commands, CommandPool};
pub use config::GpuConfig;
pub use context::GpuContext;
pub use descriptors::{
    write_combined_image_sampler, write_uniform_buffer, DescriptorPool, DescriptorSetLayout,
    DescriptorSetLayoutBuilder,
};
pub use error::{GpuError, Result};
pub use instance::Instance;
pub use memory::{find_memory_type, Buffer, Image, UniformBuffer};
pub use pipeline::{load_shader, spirv_words, GraphicsPipeline, GraphicsPipelineConfig, RenderPass};
pub use surface::{Surface, SwapchainSupport};
pub use swapchain::{AcquireOutcome, PresentOutcome, Swapchain};
pub use sync::FrameSync;
pub use texture::{layout_transition, LayoutTransition, Texture};
pub use upload::{copy_buffer, read_back, upload_to_device_local};
